//! Durable storage for the fulfillment engine.
//!
//! Three repositories back the engine: inventory rows (row-lockable
//! quantities), order rows (unique order numbers), and the payment
//! ledger (unique authorization and idempotency keys, compare-and-set
//! settlement). Each has an in-memory implementation for tests and a
//! PostgreSQL implementation for production.

pub mod error;
pub mod inventory;
pub mod memory;
pub mod orders;
pub mod payments;
pub mod postgres;

pub use error::StoreError;
pub use inventory::{InventoryItem, InventoryStore};
pub use memory::{InMemoryInventoryStore, InMemoryOrderRepository, InMemoryPaymentLedger};
pub use orders::OrderRepository;
pub use payments::{PaymentLedger, Settlement};
pub use postgres::{PostgresInventoryStore, PostgresOrderRepository, PostgresPaymentLedger};

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
