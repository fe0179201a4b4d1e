//! Redis-backed lock coordinator.
//!
//! Acquisition is `SET key token NX PX lease`: the key is taken only if
//! vacant, and Redis expires it after the lease so a crashed holder
//! cannot starve the key. Release is a compare-and-delete script keyed
//! on the fencing token.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use uuid::Uuid;

use crate::coordinator::{LockCoordinator, LockHandle};
use crate::error::LockError;

const RELEASE_SCRIPT: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
"#;

/// Cross-process lock coordinator backed by Redis.
#[derive(Clone)]
pub struct RedisLockCoordinator {
    conn: MultiplexedConnection,
    poll_interval: Duration,
}

impl RedisLockCoordinator {
    /// Connects to the Redis instance at `url`.
    pub async fn connect(url: &str) -> Result<Self, LockError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            poll_interval: Duration::from_millis(50),
        })
    }

    /// Overrides how often a waiting acquirer retries the SET.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[async_trait]
impl LockCoordinator for RedisLockCoordinator {
    async fn acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<LockHandle, LockError> {
        let token = Uuid::new_v4().to_string();
        let lease_ms = lease.as_millis().max(1) as u64;
        let deadline = tokio::time::Instant::now() + wait;

        loop {
            let mut conn = self.conn.clone();
            let set: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(lease_ms)
                .query_async(&mut conn)
                .await?;

            if set.is_some() {
                return Ok(LockHandle::new(key, token));
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(LockError::Timeout {
                    key: key.to_string(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        let script = redis::Script::new(RELEASE_SCRIPT);
        let mut conn = self.conn.clone();
        let deleted: i64 = script
            .key(handle.key())
            .arg(handle.token())
            .invoke_async(&mut conn)
            .await?;

        if deleted == 0 {
            // Lease expired or already released; the handle is stale.
            tracing::debug!(key = handle.key(), "release found no matching lock");
        }
        Ok(())
    }
}
