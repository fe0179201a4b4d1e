//! Fulfillment error types.

use common::{ItemId, OrderId};
use domain::DomainError;
use locks::LockError;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by checkout and reconciliation.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The request was malformed before any work started.
    #[error("invalid request: {0}")]
    Validation(String),

    /// An item lock could not be acquired within the wait budget.
    #[error("timed out waiting for lock '{key}'")]
    LockTimeout { key: String },

    /// The lock backend failed.
    #[error("lock backend error: {0}")]
    LockBackend(String),

    /// The referenced inventory item does not exist.
    #[error("inventory item not found: {0}")]
    ItemNotFound(ItemId),

    /// Not enough stock to satisfy a reservation.
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// The referenced order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The payment gateway rejected or failed the authorization.
    #[error("payment gateway error: {0}")]
    Gateway(String),

    /// A callback referenced an authorization with no ledger entry.
    #[error("no payment recorded for authorization '{0}'")]
    UnknownAuthorization(String),

    /// The checkout task was torn down before it could finish.
    #[error("checkout was interrupted before completing")]
    Interrupted,

    /// The event broker rejected a publish.
    #[error("event publish failed: {0}")]
    Publish(String),

    /// Order assembly failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The durable store failed.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<LockError> for FulfillmentError {
    fn from(error: LockError) -> Self {
        match error {
            LockError::Timeout { key } => FulfillmentError::LockTimeout { key },
            other => FulfillmentError::LockBackend(other.to_string()),
        }
    }
}

impl From<StoreError> for FulfillmentError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ItemNotFound(item_id) => FulfillmentError::ItemNotFound(item_id),
            StoreError::OrderNotFound(order_id) => FulfillmentError::OrderNotFound(order_id),
            StoreError::PaymentNotFound(authorization_id) => {
                FulfillmentError::UnknownAuthorization(authorization_id)
            }
            StoreError::InsufficientStock {
                item_id,
                requested,
                available,
            } => FulfillmentError::InsufficientStock {
                item_id,
                requested,
                available,
            },
            other => FulfillmentError::Store(other),
        }
    }
}

impl FulfillmentError {
    /// Returns true if the same request could plausibly succeed if
    /// simply retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FulfillmentError::LockTimeout { .. }
                | FulfillmentError::LockBackend(_)
                | FulfillmentError::Interrupted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_timeout_maps_to_lock_timeout() {
        let error = FulfillmentError::from(LockError::Timeout {
            key: "inventory:abc".to_string(),
        });
        assert!(matches!(error, FulfillmentError::LockTimeout { ref key } if key == "inventory:abc"));
        assert!(error.is_retryable());
    }

    #[test]
    fn insufficient_stock_is_not_retryable() {
        let error = FulfillmentError::from(StoreError::InsufficientStock {
            item_id: ItemId::new(),
            requested: 3,
            available: 1,
        });
        assert!(matches!(error, FulfillmentError::InsufficientStock { .. }));
        assert!(!error.is_retryable());
    }

    #[test]
    fn unknown_authorization_mapping() {
        let error = FulfillmentError::from(StoreError::PaymentNotFound("auth_1".to_string()));
        assert!(matches!(error, FulfillmentError::UnknownAuthorization(_)));
    }
}
