//! Payment ledger storage.

use async_trait::async_trait;
use domain::{Payment, PaymentStatus};

use crate::Result;

/// Outcome of a settlement attempt.
#[derive(Debug, Clone)]
pub struct Settlement {
    /// The payment row after the attempt.
    pub payment: Payment,
    /// Whether the transition applied. False means the payment was
    /// already terminal (a replayed callback).
    pub applied: bool,
}

/// Trait for the durable payment ledger.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Persists a new ledger entry. Fails with `Duplicate` if the
    /// order already has a payment, or if the authorization id or
    /// idempotency key has been seen before.
    async fn insert(&self, payment: &Payment) -> Result<()>;

    /// Looks up a payment by the gateway-side authorization id.
    async fn find_by_authorization(&self, authorization_id: &str) -> Result<Option<Payment>>;

    /// Compare-and-set settlement: transitions the payment to `status`
    /// only if it is still active (`Pending` or `Processing`). A
    /// payment already in a terminal state is left unchanged and
    /// reported via [`Settlement::applied`].
    ///
    /// Fails with `PaymentNotFound` if no row matches.
    async fn settle(
        &self,
        authorization_id: &str,
        status: PaymentStatus,
        failure_reason: Option<String>,
    ) -> Result<Settlement>;
}
