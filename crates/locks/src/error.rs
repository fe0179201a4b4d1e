//! Lock coordination errors.

use thiserror::Error;

/// Errors that can occur while acquiring or releasing locks.
#[derive(Debug, Error)]
pub enum LockError {
    /// The wait timeout elapsed before the lock became available.
    /// Resource contention; the caller may retry with backoff.
    #[error("timed out waiting for lock '{key}'")]
    Timeout { key: String },

    /// The lock backend failed.
    #[error("lock backend error: {0}")]
    Backend(#[from] redis::RedisError),
}
