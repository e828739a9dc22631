//! Shared storage for the distributed nonce

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use futures::future::{self, BoxFuture};

use crate::error::LockError;

/// Lease-based lock plus a stored nonce value
///
/// Implementations must make `try_lease` atomic: at most one owner holds an
/// unexpired lease on a resource at any time.
pub trait LeaseStore: Send + Sync {
    /// Take the lease if it is free or expired; `false` if someone else holds it
    fn try_lease<'a>(
        &'a self,
        resource: &'a str,
        owner: &'a str,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<bool, LockError>>;

    /// Drop the lease if `owner` still holds it; `false` if it had expired
    fn release_lease<'a>(&'a self, resource: &'a str, owner: &'a str) -> BoxFuture<'a, Result<bool, LockError>>;

    fn load_nonce<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<u64>, LockError>>;

    fn store_nonce<'a>(&'a self, key: &'a str, value: u64) -> BoxFuture<'a, Result<(), LockError>>;
}

#[derive(Default)]
struct MemoryState {
    leases: HashMap<String, (String, Instant)>,
    values: HashMap<String, u64>,
}

/// In-memory lease store
///
/// Shared through an `Arc`, it lets several coordinators in one process
/// behave like independent clients of a common store.
#[derive(Default)]
pub struct MemoryLeaseStore {
    state: Mutex<MemoryState>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the stored nonce
    pub fn with_nonce(key: &str, value: u64) -> Self {
        let store = Self::new();
        store.lock().values.insert(key.to_string(), value);
        store
    }

    /// Current stored nonce, for inspection
    pub fn nonce(&self, key: &str) -> Option<u64> {
        self.lock().values.get(key).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LeaseStore for MemoryLeaseStore {
    fn try_lease<'a>(
        &'a self,
        resource: &'a str,
        owner: &'a str,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<bool, LockError>> {
        let now = Instant::now();
        let mut state = self.lock();
        let taken = matches!(state.leases.get(resource), Some((_, expires)) if *expires > now);
        if !taken {
            state
                .leases
                .insert(resource.to_string(), (owner.to_string(), now + ttl));
        }
        Box::pin(future::ready(Ok(!taken)))
    }

    fn release_lease<'a>(&'a self, resource: &'a str, owner: &'a str) -> BoxFuture<'a, Result<bool, LockError>> {
        let now = Instant::now();
        let mut state = self.lock();
        let held = state
            .leases
            .get(resource)
            .map(|(holder, expires)| (holder == owner, *expires > now));
        let released = match held {
            Some((true, live)) => {
                state.leases.remove(resource);
                live
            }
            _ => false,
        };
        Box::pin(future::ready(Ok(released)))
    }

    fn load_nonce<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<u64>, LockError>> {
        Box::pin(future::ready(Ok(self.nonce(key))))
    }

    fn store_nonce<'a>(&'a self, key: &'a str, value: u64) -> BoxFuture<'a, Result<(), LockError>> {
        self.lock().values.insert(key.to_string(), value);
        Box::pin(future::ready(Ok(())))
    }
}
