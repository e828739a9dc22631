//! Redis-backed lease store

use std::time::Duration;

use futures::future::BoxFuture;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::store::LeaseStore;
use crate::error::LockError;

/// Compare-and-delete: only the holder may drop the lease
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Lease store on a shared Redis instance
///
/// Leases are `SET NX PX` keys holding the owner id. The nonce itself is a
/// plain integer key.
#[derive(Clone)]
pub struct RedisLeaseStore {
    conn: ConnectionManager,
    release: redis::Script,
}

impl RedisLeaseStore {
    pub async fn connect(url: &str) -> Result<Self, LockError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(url = %url, "Connected to nonce store");
        Ok(Self {
            conn,
            release: redis::Script::new(RELEASE_SCRIPT),
        })
    }
}

impl LeaseStore for RedisLeaseStore {
    fn try_lease<'a>(
        &'a self,
        resource: &'a str,
        owner: &'a str,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<bool, LockError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let reply: Option<String> = redis::cmd("SET")
                .arg(resource)
                .arg(owner)
                .arg("NX")
                .arg("PX")
                .arg(ttl.as_millis() as u64)
                .query_async(&mut conn)
                .await?;
            Ok(reply.is_some())
        })
    }

    fn release_lease<'a>(&'a self, resource: &'a str, owner: &'a str) -> BoxFuture<'a, Result<bool, LockError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let removed: i64 = self
                .release
                .key(resource)
                .arg(owner)
                .invoke_async(&mut conn)
                .await?;
            Ok(removed == 1)
        })
    }

    fn load_nonce<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<u64>, LockError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let value: Option<u64> = conn.get(key).await?;
            Ok(value)
        })
    }

    fn store_nonce<'a>(&'a self, key: &'a str, value: u64) -> BoxFuture<'a, Result<(), LockError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let _: () = conn.set(key, value).await?;
            Ok(())
        })
    }
}
