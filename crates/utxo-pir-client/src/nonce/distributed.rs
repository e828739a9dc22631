//! Nonce shared by several processes through a lease store

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use super::store::LeaseStore;
use super::{system_clock, Clock, LockToken, TokenInner};
use crate::error::LockError;

static OWNER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lease timing for the distributed lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseSettings {
    /// Lease lifetime; the critical section must finish within it
    pub ttl: Duration,
    /// Pause between attempts while the lease is held elsewhere
    pub retry_delay: Duration,
    pub max_attempts: u32,
}

impl Default for LeaseSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            retry_delay: Duration::from_millis(100),
            max_attempts: 600,
        }
    }
}

/// A held lease, carried inside a [`LockToken`]
pub(super) struct Lease {
    resource: String,
    owner: String,
    acquired_at: Instant,
}

/// Nonce coordinated through a [`LeaseStore`]
///
/// Inside the lease the stored value becomes `max(now_ms, stored + 1)`, so
/// the sequence keeps increasing even if one client's clock lags.
#[derive(Clone)]
pub struct DistributedNonce {
    store: Arc<dyn LeaseStore>,
    key: String,
    settings: LeaseSettings,
    clock: Clock,
}

impl DistributedNonce {
    pub fn new(store: Arc<dyn LeaseStore>, key: impl Into<String>, settings: LeaseSettings) -> Self {
        Self {
            store,
            key: key.into(),
            settings,
            clock: system_clock(),
        }
    }

    /// Replace the wall clock used as the nonce floor
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Store key holding the nonce value
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn settings(&self) -> &LeaseSettings {
        &self.settings
    }

    fn lock_resource(&self) -> String {
        format!("{}.lock", self.key)
    }

    fn owner_id() -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        format!(
            "{}-{}-{}",
            std::process::id(),
            OWNER_SEQ.fetch_add(1, Ordering::Relaxed),
            nanos
        )
    }

    pub(super) async fn acquire(&self) -> Result<LockToken, LockError> {
        let resource = self.lock_resource();
        let owner = Self::owner_id();

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if self.store.try_lease(&resource, &owner, self.settings.ttl).await? {
                break;
            }
            if attempts >= self.settings.max_attempts {
                tracing::warn!(key = %self.key, attempts, "nonce lease still held elsewhere");
                return Err(LockError::Contended { attempts });
            }
            tokio::time::sleep(self.settings.retry_delay).await;
        }

        let lease = Lease {
            resource,
            owner,
            acquired_at: Instant::now(),
        };

        match self.advance().await {
            Ok(nonce) => {
                tracing::trace!(key = %self.key, nonce, attempts, "nonce lease acquired");
                Ok(LockToken {
                    nonce,
                    inner: TokenInner::Distributed(lease),
                })
            }
            Err(e) => {
                if let Err(release_err) = self.store.release_lease(&lease.resource, &lease.owner).await {
                    tracing::warn!(key = %self.key, error = %release_err, "failed to release nonce lease");
                }
                Err(e)
            }
        }
    }

    async fn advance(&self) -> Result<u64, LockError> {
        let now = (self.clock)();
        let nonce = match self.store.load_nonce(&self.key).await? {
            Some(stored) => now.max(stored.saturating_add(1)),
            None => now,
        };
        self.store.store_nonce(&self.key, nonce).await?;
        Ok(nonce)
    }

    pub(super) async fn release(&self, lease: Lease) -> Result<(), LockError> {
        let held_for = lease.acquired_at.elapsed();
        if held_for > self.settings.ttl {
            tracing::warn!(
                key = %self.key,
                held_ms = held_for.as_millis() as u64,
                ttl_ms = self.settings.ttl.as_millis() as u64,
                "nonce critical section outlived its lease"
            );
        }
        if self.store.release_lease(&lease.resource, &lease.owner).await? {
            Ok(())
        } else {
            Err(LockError::LeaseLost)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nonce::{MemoryLeaseStore, NonceCoordinator};

    fn fixed_clock(ms: u64) -> Clock {
        Arc::new(move || ms)
    }

    fn fast_settings() -> LeaseSettings {
        LeaseSettings {
            ttl: Duration::from_secs(10),
            retry_delay: Duration::from_millis(5),
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn test_first_nonce_is_wall_clock() {
        let store = Arc::new(MemoryLeaseStore::new());
        let nonce = DistributedNonce::new(store.clone(), "n", fast_settings()).with_clock(fixed_clock(1_000));
        let coordinator = NonceCoordinator::Distributed(nonce);

        let token = coordinator.acquire().await.unwrap();
        assert_eq!(token.nonce(), 1_000);
        coordinator.release(token).await.unwrap();
        assert_eq!(store.nonce("n"), Some(1_000));
    }

    #[tokio::test]
    async fn test_stored_value_beats_lagging_clock() {
        let store = Arc::new(MemoryLeaseStore::with_nonce("n", 5_000));
        let nonce = DistributedNonce::new(store.clone(), "n", fast_settings()).with_clock(fixed_clock(1_000));
        let coordinator = NonceCoordinator::Distributed(nonce);

        for expected in 5_001..5_004 {
            let token = coordinator.acquire().await.unwrap();
            assert_eq!(token.nonce(), expected);
            coordinator.release(token).await.unwrap();
        }
        assert_eq!(store.nonce("n"), Some(5_003));
    }

    #[tokio::test]
    async fn test_contention_exhausts_attempts() {
        let store = Arc::new(MemoryLeaseStore::new());
        let settings = fast_settings();
        assert!(store.try_lease("n.lock", "someone-else", settings.ttl).await.unwrap());

        let coordinator = NonceCoordinator::distributed(store, "n", settings);
        let err = coordinator.acquire().await.unwrap_err();
        assert_eq!(err, LockError::Contended { attempts: 3 });
    }

    #[tokio::test]
    async fn test_expired_lease_reports_lost() {
        let store = Arc::new(MemoryLeaseStore::new());
        let settings = LeaseSettings {
            ttl: Duration::from_millis(10),
            ..fast_settings()
        };
        let coordinator = NonceCoordinator::distributed(store.clone(), "n", settings);

        let token = coordinator.acquire().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        // another client takes over the expired lease
        assert!(store.try_lease("n.lock", "other", Duration::from_secs(10)).await.unwrap());
        assert_eq!(coordinator.release(token).await, Err(LockError::LeaseLost));
    }

    #[test]
    fn test_owner_ids_are_unique() {
        let a = DistributedNonce::owner_id();
        let b = DistributedNonce::owner_id();
        assert_ne!(a, b);
    }
}
