//! Lock coordinator trait and multi-key acquisition.

use std::time::Duration;

use async_trait::async_trait;
use common::ItemId;

use crate::error::LockError;

/// Handle to a held lock.
///
/// Carries the fencing token generated at acquisition time. Release is
/// a compare-and-delete on the token, so a handle whose lease already
/// expired cannot evict a later holder of the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    key: String,
    token: String,
}

impl LockHandle {
    /// Creates a handle for an acquired lock.
    pub fn new(key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
        }
    }

    /// Returns the lock key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the fencing token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Trait for distributed lock coordination.
#[async_trait]
pub trait LockCoordinator: Send + Sync {
    /// Acquires the named lock, waiting at most `wait` for it to become
    /// available. The lock is held for at most `lease` before it is
    /// considered abandoned and eligible for takeover.
    async fn acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<LockHandle, LockError>;

    /// Releases a held lock. Idempotent: releasing twice, or releasing
    /// after lease expiry, is a no-op.
    async fn release(&self, handle: &LockHandle) -> Result<(), LockError>;
}

/// Returns the lock key for an inventory item.
pub fn inventory_key(item_id: ItemId) -> String {
    format!("inventory:{item_id}")
}

/// Acquires every key in a fixed, deterministic order.
///
/// Keys are sorted and deduplicated before acquisition so that two
/// concurrent callers with overlapping key sets cannot deadlock each
/// other. If any acquisition fails, everything already held is released
/// (in reverse order) before the error is surfaced.
pub async fn acquire_in_order<L>(
    coordinator: &L,
    mut keys: Vec<String>,
    wait: Duration,
    lease: Duration,
) -> Result<Vec<LockHandle>, LockError>
where
    L: LockCoordinator + ?Sized,
{
    keys.sort();
    keys.dedup();

    let mut held = Vec::with_capacity(keys.len());
    for key in &keys {
        match coordinator.acquire(key, wait, lease).await {
            Ok(handle) => held.push(handle),
            Err(error) => {
                for handle in held.iter().rev() {
                    if let Err(release_error) = coordinator.release(handle).await {
                        tracing::warn!(
                            key = handle.key(),
                            error = %release_error,
                            "failed to release lock while unwinding acquisition"
                        );
                    }
                }
                return Err(error);
            }
        }
    }
    Ok(held)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLockCoordinator;

    const WAIT: Duration = Duration::from_millis(50);
    const LEASE: Duration = Duration::from_secs(10);

    #[test]
    fn inventory_key_is_stable() {
        let item_id = ItemId::new();
        assert_eq!(inventory_key(item_id), format!("inventory:{item_id}"));
        assert_eq!(inventory_key(item_id), inventory_key(item_id));
    }

    #[tokio::test]
    async fn acquires_all_distinct_keys() {
        let coordinator = InMemoryLockCoordinator::new();
        let keys = vec!["inventory:b".into(), "inventory:a".into()];

        let held = acquire_in_order(&coordinator, keys, WAIT, LEASE)
            .await
            .unwrap();

        assert_eq!(held.len(), 2);
        // Sorted order regardless of request order.
        assert_eq!(held[0].key(), "inventory:a");
        assert_eq!(held[1].key(), "inventory:b");
    }

    #[tokio::test]
    async fn duplicate_keys_acquired_once() {
        let coordinator = InMemoryLockCoordinator::new();
        let keys = vec!["inventory:a".into(), "inventory:a".into()];

        let held = acquire_in_order(&coordinator, keys, WAIT, LEASE)
            .await
            .unwrap();

        assert_eq!(held.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn releases_held_locks_when_one_acquisition_fails() {
        let coordinator = InMemoryLockCoordinator::new();

        // Another holder already owns the second key in sort order.
        let blocker = coordinator
            .acquire("inventory:b", WAIT, LEASE)
            .await
            .unwrap();

        let keys = vec!["inventory:b".into(), "inventory:a".into()];
        let result = acquire_in_order(&coordinator, keys, WAIT, LEASE).await;

        assert!(matches!(result, Err(LockError::Timeout { .. })));
        // The first key must have been released during unwinding.
        assert!(!coordinator.is_held("inventory:a"));
        assert!(coordinator.is_held("inventory:b"));

        coordinator.release(&blocker).await.unwrap();
    }
}
