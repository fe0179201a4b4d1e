//! Store error types.

use common::{ItemId, OrderId};
use thiserror::Error;

/// Errors that can occur in the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced inventory item does not exist.
    #[error("inventory item not found: {0}")]
    ItemNotFound(ItemId),

    /// The referenced order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// No payment matches the given authorization id.
    #[error("payment not found for authorization '{0}'")]
    PaymentNotFound(String),

    /// Not enough stock to satisfy a reservation.
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// A unique constraint was violated.
    #[error("duplicate value for unique constraint '{constraint}'")]
    Duplicate { constraint: String },

    /// A stored value could not be interpreted.
    #[error("invalid value in column '{0}'")]
    InvalidColumn(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
