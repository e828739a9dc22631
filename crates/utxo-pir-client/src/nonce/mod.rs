//! Nonce coordination for authenticated requests
//!
//! Every authenticated request under one API id must carry a nonce strictly
//! greater than any nonce used before, including by other processes sharing
//! the credential. A call goes through exactly one cycle:
//!
//! ```text
//! acquire() -> token.nonce() -> sign -> send -> release(token)
//! ```
//!
//! Two variants share that contract:
//! - [`LocalNonce`]: in-process mutex around a counter seeded from the clock
//! - [`DistributedNonce`]: leased lock in a shared [`LeaseStore`]; inside the
//!   lease the stored nonce is advanced to `max(now_ms, stored + 1)`
//!
//! The distributed variant is only safe while the critical section finishes
//! within the lease TTL. If the lease expires first, a second client can read
//! the same stored value. Release reports this as [`LockError::LeaseLost`],
//! but the overlap itself is not prevented.

mod distributed;
mod local;
mod store;

#[cfg(feature = "redis")]
mod redis_store;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use utxo_pir_core::NonceBackend;

use crate::error::LockError;

pub use distributed::{DistributedNonce, LeaseSettings};
pub use local::LocalNonce;
pub use store::{LeaseStore, MemoryLeaseStore};

#[cfg(feature = "redis")]
pub use redis_store::RedisLeaseStore;

/// Source of wall-clock milliseconds
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Milliseconds since the Unix epoch
pub fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub fn system_clock() -> Clock {
    Arc::new(system_millis)
}

/// Proof of holding the nonce critical section
///
/// Consumed by [`NonceCoordinator::release`], so it can be released at most
/// once. Dropping a local token also ends the critical section; dropping a
/// distributed token leaves the lease to expire on its TTL.
#[must_use = "a lock token must be released"]
pub struct LockToken {
    nonce: u64,
    inner: TokenInner,
}

enum TokenInner {
    Local(local::LocalGuard),
    Distributed(distributed::Lease),
}

impl LockToken {
    /// Nonce to sign with; only meaningful while the token is held
    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

impl std::fmt::Debug for LockToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            TokenInner::Local(_) => "local",
            TokenInner::Distributed(_) => "distributed",
        };
        f.debug_struct("LockToken")
            .field("nonce", &self.nonce)
            .field("kind", &kind)
            .finish()
    }
}

/// Issues strictly increasing nonces
#[derive(Clone)]
pub enum NonceCoordinator {
    Local(LocalNonce),
    Distributed(DistributedNonce),
}

impl NonceCoordinator {
    /// In-process coordinator seeded from the system clock
    pub fn local() -> Self {
        NonceCoordinator::Local(LocalNonce::new())
    }

    /// Coordinator backed by a shared lease store
    pub fn distributed(store: Arc<dyn LeaseStore>, key: impl Into<String>, settings: LeaseSettings) -> Self {
        NonceCoordinator::Distributed(DistributedNonce::new(store, key, settings))
    }

    /// Build the coordinator selected by configuration
    pub async fn from_backend(backend: &NonceBackend) -> Result<Self, LockError> {
        match backend {
            NonceBackend::Local => Ok(Self::local()),
            #[cfg(feature = "redis")]
            NonceBackend::Redis {
                url,
                key,
                lease_ttl_ms,
                retry_delay_ms,
                max_attempts,
            } => {
                let store = RedisLeaseStore::connect(url).await?;
                let settings = LeaseSettings {
                    ttl: std::time::Duration::from_millis(*lease_ttl_ms),
                    retry_delay: std::time::Duration::from_millis(*retry_delay_ms),
                    max_attempts: *max_attempts,
                };
                Ok(Self::distributed(Arc::new(store), key.clone(), settings))
            }
            #[cfg(not(feature = "redis"))]
            NonceBackend::Redis { .. } => Err(LockError::Backend(
                "built without the `redis` feature".to_string(),
            )),
        }
    }

    /// Wait for exclusive access to the nonce and advance it
    pub async fn acquire(&self) -> Result<LockToken, LockError> {
        match self {
            NonceCoordinator::Local(local) => local.acquire().await,
            NonceCoordinator::Distributed(distributed) => distributed.acquire().await,
        }
    }

    /// Nonce for the held token
    pub fn get_nonce(&self, token: &LockToken) -> u64 {
        token.nonce()
    }

    /// End the critical section
    pub async fn release(&self, token: LockToken) -> Result<(), LockError> {
        match (self, token.inner) {
            (NonceCoordinator::Local(_), TokenInner::Local(guard)) => {
                drop(guard);
                Ok(())
            }
            (NonceCoordinator::Distributed(distributed), TokenInner::Distributed(lease)) => {
                distributed.release(lease).await
            }
            _ => Err(LockError::Backend(
                "lock token released on a different coordinator".to_string(),
            )),
        }
    }
}

impl Default for NonceCoordinator {
    fn default() -> Self {
        Self::local()
    }
}

impl std::fmt::Debug for NonceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonceCoordinator::Local(_) => f.write_str("NonceCoordinator::Local"),
            NonceCoordinator::Distributed(d) => {
                write!(f, "NonceCoordinator::Distributed({})", d.key())
            }
        }
    }
}
