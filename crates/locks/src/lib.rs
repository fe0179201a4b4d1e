//! Distributed lock coordination.
//!
//! Inventory quantities are guarded by one named lock per item. The
//! coordinator hands out leased, token-fenced locks with a bounded
//! acquisition wait; a crashed holder's lease expires instead of
//! starving the key forever.
//!
//! Two backends are provided: an in-memory coordinator for tests and
//! single-process deployments, and a Redis-backed coordinator for
//! cross-process exclusion.

pub mod coordinator;
pub mod error;
pub mod memory;
pub mod redis;

pub use coordinator::{LockCoordinator, LockHandle, acquire_in_order, inventory_key};
pub use error::LockError;
pub use memory::InMemoryLockCoordinator;
pub use self::redis::RedisLockCoordinator;
