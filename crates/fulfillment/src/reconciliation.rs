//! Payment reconciliation.
//!
//! Gateway callbacks arrive at-least-once and in any order. The
//! payment row is the sole arbiter: a settlement applies only while
//! the payment is still active, so a replayed callback, or a late
//! contradictory one, is recognized and dropped without side effects.

use std::sync::Arc;

use domain::{DomainEvent, OrderStatus, Payment, PaymentStatus};
use store::{OrderRepository, PaymentLedger};

use crate::error::FulfillmentError;
use crate::events::GatewayEvent;
use crate::publisher::EventPublisher;

/// Outcome of processing one gateway callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// The callback settled the payment and updated the order.
    Applied,

    /// The payment was already terminal; nothing changed.
    AlreadySettled,

    /// The event type is not one this service reconciles.
    Ignored,
}

/// Applies gateway callbacks to the ledger and order rows.
pub struct ReconciliationService<P, O, E> {
    payments: Arc<P>,
    orders: Arc<O>,
    publisher: Arc<E>,
}

impl<P, O, E> ReconciliationService<P, O, E>
where
    P: PaymentLedger,
    O: OrderRepository,
    E: EventPublisher,
{
    /// Creates a reconciliation service over the given collaborators.
    pub fn new(payments: Arc<P>, orders: Arc<O>, publisher: Arc<E>) -> Self {
        Self {
            payments,
            orders,
            publisher,
        }
    }

    /// Processes one gateway callback.
    ///
    /// Fails with `UnknownAuthorization` if no ledger entry matches,
    /// so the caller can reject the delivery and let the gateway
    /// retry it after the checkout that created the entry lands.
    #[tracing::instrument(skip(self, event))]
    pub async fn apply(
        &self,
        event: GatewayEvent,
    ) -> Result<ReconciliationOutcome, FulfillmentError> {
        let (authorization_id, status, failure_reason) = match event {
            GatewayEvent::AuthorizationSucceeded { authorization_id } => {
                (authorization_id, PaymentStatus::Succeeded, None)
            }
            GatewayEvent::AuthorizationFailed {
                authorization_id,
                reason,
            } => (
                authorization_id,
                PaymentStatus::Failed,
                Some(reason.unwrap_or_else(|| "authorization failed".to_string())),
            ),
            GatewayEvent::Other { event_type } => {
                tracing::debug!(event_type, "ignoring unhandled gateway event");
                metrics::counter!("reconciliation_ignored_total").increment(1);
                return Ok(ReconciliationOutcome::Ignored);
            }
        };

        let settlement = self
            .payments
            .settle(&authorization_id, status, failure_reason)
            .await?;

        if !settlement.applied {
            tracing::info!(
                authorization_id,
                status = %settlement.payment.status,
                "replayed callback for settled payment dropped"
            );
            metrics::counter!("reconciliation_replays_total").increment(1);
            return Ok(ReconciliationOutcome::AlreadySettled);
        }

        self.transition_order(&settlement.payment).await?;
        self.publish_settlement(&settlement.payment).await;

        metrics::counter!(
            "reconciliation_applied_total",
            "status" => settlement.payment.status.as_str()
        )
        .increment(1);
        Ok(ReconciliationOutcome::Applied)
    }

    async fn transition_order(&self, payment: &Payment) -> Result<(), FulfillmentError> {
        let target = match payment.status {
            PaymentStatus::Succeeded => OrderStatus::Confirmed,
            _ => OrderStatus::Cancelled,
        };

        let applied = self.orders.transition(payment.order_id, target).await?;
        if !applied {
            // Settlement won the race but the order had already left
            // Pending; keep the order's terminal state.
            tracing::warn!(
                order_id = %payment.order_id,
                target = %target,
                "order already terminal, transition skipped"
            );
        }
        Ok(())
    }

    /// Publishes the settlement events, best effort. PaymentProcessed
    /// goes out for every applied settlement; OrderConfirmed only on
    /// success. Both carry the order number as partition key, so they
    /// stay ordered relative to the checkout's OrderCreated.
    async fn publish_settlement(&self, payment: &Payment) {
        if let Err(error) = self
            .publisher
            .publish(&DomainEvent::payment_processed(payment))
            .await
        {
            tracing::warn!(
                order_number = %payment.order_number,
                error = %error,
                "failed to publish payment-processed event"
            );
        }

        if payment.status == PaymentStatus::Succeeded {
            if let Err(error) = self
                .publisher
                .publish(&DomainEvent::order_confirmed(payment))
                .await
            {
                tracing::warn!(
                    order_number = %payment.order_number,
                    error = %error,
                    "failed to publish order-confirmed event"
                );
            }
        }
    }
}
