//! In-process nonce counter

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{system_millis, LockToken, TokenInner};
use crate::error::LockError;

pub(super) type LocalGuard = OwnedMutexGuard<u64>;

/// Mutex-guarded counter, seeded from wall-clock milliseconds
///
/// Clones share the counter. Monotonic within one process only.
#[derive(Clone)]
pub struct LocalNonce {
    counter: Arc<Mutex<u64>>,
}

impl LocalNonce {
    pub fn new() -> Self {
        Self::starting_at(system_millis())
    }

    /// Counter whose first issued nonce is `seed + 1`
    pub fn starting_at(seed: u64) -> Self {
        Self {
            counter: Arc::new(Mutex::new(seed)),
        }
    }

    pub(super) async fn acquire(&self) -> Result<LockToken, LockError> {
        let mut guard = self.counter.clone().lock_owned().await;
        *guard += 1;
        Ok(LockToken {
            nonce: *guard,
            inner: TokenInner::Local(guard),
        })
    }
}

impl Default for LocalNonce {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nonce::NonceCoordinator;
    use std::time::Duration;

    #[tokio::test]
    async fn test_seeded_counter() {
        let coordinator = NonceCoordinator::Local(LocalNonce::starting_at(41));
        let token = coordinator.acquire().await.unwrap();
        assert_eq!(token.nonce(), 42);
        coordinator.release(token).await.unwrap();
        let token = coordinator.acquire().await.unwrap();
        assert_eq!(token.nonce(), 43);
        coordinator.release(token).await.unwrap();
    }

    #[tokio::test]
    async fn test_seed_tracks_wall_clock() {
        let before = system_millis();
        let coordinator = NonceCoordinator::local();
        let token = coordinator.acquire().await.unwrap();
        assert!(token.nonce() > before);
        coordinator.release(token).await.unwrap();
    }

    #[tokio::test]
    async fn test_acquire_blocks_until_release() {
        let coordinator = NonceCoordinator::Local(LocalNonce::starting_at(0));
        let held = coordinator.acquire().await.unwrap();

        let contender = coordinator.clone();
        let waiter = tokio::spawn(async move {
            let token = contender.acquire().await.unwrap();
            let nonce = token.nonce();
            contender.release(token).await.unwrap();
            nonce
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        coordinator.release(held).await.unwrap();
        assert_eq!(waiter.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dropped_token_ends_critical_section() {
        let coordinator = NonceCoordinator::Local(LocalNonce::starting_at(0));
        {
            let _abandoned = coordinator.acquire().await.unwrap();
        }
        let token = tokio::time::timeout(Duration::from_secs(1), coordinator.acquire())
            .await
            .expect("lock should be free after drop")
            .unwrap();
        assert_eq!(token.nonce(), 2);
        coordinator.release(token).await.unwrap();
    }
}
