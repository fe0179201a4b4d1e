//! Domain errors.

use thiserror::Error;

/// Errors raised while assembling domain objects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// An order must contain at least one item.
    #[error("order must contain at least one item")]
    EmptyOrder,

    /// Item quantities must be positive.
    #[error("quantity must be positive")]
    ZeroQuantity,
}
