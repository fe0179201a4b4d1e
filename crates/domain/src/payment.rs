//! Payment ledger entries.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, PaymentId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::OrderNumber;

/// The status of a payment authorization.
///
/// `Pending` and `Processing` are the active states; everything else is
/// terminal. Reconciliation uses this as the sole arbiter of event
/// replay idempotency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    /// Authorization created, outcome not yet known.
    #[default]
    Pending,

    /// The gateway reported the authorization as in flight.
    Processing,

    /// Authorization succeeded (terminal state).
    Succeeded,

    /// Authorization failed (terminal state).
    Failed,

    /// Payment was refunded after succeeding (terminal state).
    Refunded,
}

impl PaymentStatus {
    /// Returns true if the payment can still be settled by a callback.
    pub fn is_active(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Succeeded => "SUCCEEDED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    /// Parses a status from its string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(PaymentStatus::Pending),
            "PROCESSING" => Some(PaymentStatus::Processing),
            "SUCCEEDED" => Some(PaymentStatus::Succeeded),
            "FAILED" => Some(PaymentStatus::Failed),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token ensuring a retried authorization cannot create a duplicate
/// remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Generates a fresh key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IdempotencyKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Durable record of one authorization attempt.
///
/// At most one payment exists per order. The order number is carried
/// here so reconciliation can partition its events without loading the
/// order row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    /// Identifier assigned by the external gateway; unique.
    pub authorization_id: String,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub idempotency_key: IdempotencyKey,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates the pending ledger entry for a freshly authorized order.
    pub fn pending(
        order_id: OrderId,
        order_number: OrderNumber,
        authorization_id: impl Into<String>,
        amount: Money,
        currency: impl Into<String>,
        idempotency_key: IdempotencyKey,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            order_id,
            order_number,
            authorization_id: authorization_id.into(),
            amount,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            failure_reason: None,
            idempotency_key,
            created_at: now,
            updated_at: now,
        }
    }
}
