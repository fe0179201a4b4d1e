//! In-memory lock coordinator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use uuid::Uuid;

use crate::coordinator::{LockCoordinator, LockHandle};
use crate::error::LockError;

/// How often a waiting acquirer re-checks the key.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug)]
struct Holder {
    token: String,
    expires_at: Instant,
}

/// Single-process lock coordinator.
///
/// Provides the same lease and fencing semantics as the Redis backend,
/// scoped to one process. Used by tests and the default binary.
#[derive(Clone, Default)]
pub struct InMemoryLockCoordinator {
    state: Arc<Mutex<HashMap<String, Holder>>>,
}

impl InMemoryLockCoordinator {
    /// Creates a new coordinator with no held locks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the key is currently held under an unexpired lease.
    pub fn is_held(&self, key: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .get(key)
            .is_some_and(|holder| holder.expires_at > Instant::now())
    }
}

#[async_trait]
impl LockCoordinator for InMemoryLockCoordinator {
    async fn acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<LockHandle, LockError> {
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + wait;

        loop {
            {
                let mut state = self.state.lock().unwrap();
                let now = Instant::now();
                let vacant = state
                    .get(key)
                    .is_none_or(|holder| holder.expires_at <= now);

                if vacant {
                    state.insert(
                        key.to_string(),
                        Holder {
                            token: token.clone(),
                            expires_at: now + lease,
                        },
                    );
                    return Ok(LockHandle::new(key, token));
                }
            }

            if Instant::now() >= deadline {
                return Err(LockError::Timeout {
                    key: key.to_string(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        let mut state = self.state.lock().unwrap();
        // Token-fenced: a stale handle never evicts a later holder.
        if state
            .get(handle.key())
            .is_some_and(|holder| holder.token == handle.token())
        {
            state.remove(handle.key());
        }
        Ok(())
    }
}
