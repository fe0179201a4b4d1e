//! Checkout orchestration.
//!
//! Placing an order runs in two phases. The locked phase acquires the
//! per-item locks in sorted order, reserves stock line by line with
//! all-or-nothing compensation, and persists a provisional `Pending`
//! order. Every lock is released before the unlocked phase talks to
//! the payment gateway, so remote latency never extends lock hold
//! time. A gateway failure compensates by restoring the reservations
//! and deleting the provisional order row.

use std::sync::Arc;
use std::time::Duration;

use common::{ItemId, UserId};
use domain::{DomainEvent, IdempotencyKey, Order, OrderDraft, Payment, ShippingAddress};
use locks::{LockCoordinator, LockHandle, acquire_in_order, inventory_key};
use store::{InventoryStore, OrderRepository, PaymentLedger};

use crate::error::FulfillmentError;
use crate::gateway::{AuthorizationRequest, PaymentGateway};
use crate::publisher::EventPublisher;

/// One requested order line.
#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// A checkout request.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub shipping: ShippingAddress,
    pub lines: Vec<CheckoutLine>,
}

/// Tunable checkout parameters.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// How long to wait for each item lock.
    pub lock_wait: Duration,
    /// Lease after which an abandoned lock is eligible for takeover.
    pub lock_lease: Duration,
    /// Currency code sent to the payment gateway.
    pub currency: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_secs(5),
            lock_lease: Duration::from_secs(10),
            currency: "usd".to_string(),
        }
    }
}

/// Quantity reserved for one item, tracked for compensation.
#[derive(Debug, Clone)]
struct Reservation {
    item_id: ItemId,
    quantity: u32,
}

/// Drives checkout end to end.
pub struct CheckoutService<L, I, O, P, G, E> {
    locks: Arc<L>,
    inventory: Arc<I>,
    orders: Arc<O>,
    payments: Arc<P>,
    gateway: Arc<G>,
    publisher: Arc<E>,
    config: CheckoutConfig,
}

impl<L, I, O, P, G, E> Clone for CheckoutService<L, I, O, P, G, E> {
    fn clone(&self) -> Self {
        Self {
            locks: self.locks.clone(),
            inventory: self.inventory.clone(),
            orders: self.orders.clone(),
            payments: self.payments.clone(),
            gateway: self.gateway.clone(),
            publisher: self.publisher.clone(),
            config: self.config.clone(),
        }
    }
}

impl<L, I, O, P, G, E> CheckoutService<L, I, O, P, G, E>
where
    L: LockCoordinator + 'static,
    I: InventoryStore + 'static,
    O: OrderRepository + 'static,
    P: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    E: EventPublisher + 'static,
{
    /// Creates a checkout service over the given collaborators.
    pub fn new(
        locks: Arc<L>,
        inventory: Arc<I>,
        orders: Arc<O>,
        payments: Arc<P>,
        gateway: Arc<G>,
        publisher: Arc<E>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            locks,
            inventory,
            orders,
            payments,
            gateway,
            publisher,
            config,
        }
    }

    /// Places an order.
    ///
    /// The work runs on a detached task, so a caller that disconnects
    /// mid-checkout cannot abandon a half-applied reservation; the
    /// compensation paths always run to completion.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn place_order(&self, request: CheckoutRequest) -> Result<Order, FulfillmentError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let start = std::time::Instant::now();

        if request.lines.is_empty() {
            return Err(FulfillmentError::Validation(
                "order has no lines".to_string(),
            ));
        }
        if request.lines.iter().any(|line| line.quantity == 0) {
            return Err(FulfillmentError::Validation(
                "line quantity must be positive".to_string(),
            ));
        }

        let service = self.clone();
        let result = tokio::spawn(async move { service.run_checkout(request).await })
            .await
            .map_err(|_| FulfillmentError::Interrupted)?;

        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("checkout_success_total").increment(1);
                tracing::info!(
                    order_number = %order.order_number,
                    total_cents = order.total.cents(),
                    "order placed"
                );
            }
            Err(error) => {
                metrics::counter!("checkout_failures_total").increment(1);
                tracing::warn!(error = %error, "checkout failed");
            }
        }
        result
    }

    async fn run_checkout(&self, request: CheckoutRequest) -> Result<Order, FulfillmentError> {
        let keys: Vec<String> = request
            .lines
            .iter()
            .map(|line| inventory_key(line.item_id))
            .collect();

        let held = acquire_in_order(
            self.locks.as_ref(),
            keys,
            self.config.lock_wait,
            self.config.lock_lease,
        )
        .await?;

        let reserved = self.reserve_and_persist(&request).await;
        self.release_all(&held).await;

        let (order, reservations) = reserved?;
        self.authorize_and_record(order, &reservations).await
    }

    /// Locked phase: reserve every line, then persist the provisional
    /// order. Any failure rolls back every reservation made so far.
    async fn reserve_and_persist(
        &self,
        request: &CheckoutRequest,
    ) -> Result<(Order, Vec<Reservation>), FulfillmentError> {
        let mut draft = OrderDraft::new(request.user_id, request.shipping.clone());
        let mut reservations: Vec<Reservation> = Vec::with_capacity(request.lines.len());

        for line in &request.lines {
            let item = match self.inventory.reserve(line.item_id, line.quantity).await {
                Ok(item) => item,
                Err(error) => {
                    self.restore_all(&reservations).await;
                    return Err(error.into());
                }
            };
            reservations.push(Reservation {
                item_id: line.item_id,
                quantity: line.quantity,
            });

            if let Err(error) =
                draft.add_item(line.item_id, item.name, line.quantity, item.unit_price)
            {
                self.restore_all(&reservations).await;
                return Err(error.into());
            }
        }

        let order = match draft.build() {
            Ok(order) => order,
            Err(error) => {
                self.restore_all(&reservations).await;
                return Err(error.into());
            }
        };

        if let Err(error) = self.orders.insert(&order).await {
            self.restore_all(&reservations).await;
            return Err(error.into());
        }

        Ok((order, reservations))
    }

    /// Unlocked phase: authorize the payment and record the ledger
    /// entry. Failure undoes the reservations and the provisional
    /// order row, so a declined payment leaves no trace.
    async fn authorize_and_record(
        &self,
        order: Order,
        reservations: &[Reservation],
    ) -> Result<Order, FulfillmentError> {
        let idempotency_key = IdempotencyKey::generate();
        let request = AuthorizationRequest {
            amount_minor: order.total.minor_units(),
            currency: self.config.currency.clone(),
            order_id: order.id,
            order_number: order.order_number.clone(),
            idempotency_key: idempotency_key.as_str().to_string(),
        };

        let authorization_id = match self.gateway.authorize(request).await {
            Ok(id) => id,
            Err(error) => {
                self.undo_checkout(&order, reservations).await;
                return Err(error);
            }
        };

        let payment = Payment::pending(
            order.id,
            order.order_number.clone(),
            authorization_id,
            order.total,
            self.config.currency.clone(),
            idempotency_key,
        );

        if let Err(error) = self.payments.insert(&payment).await {
            self.undo_checkout(&order, reservations).await;
            return Err(error.into());
        }

        // At-least-once: the order stands even if the broker is down.
        if let Err(error) = self
            .publisher
            .publish(&DomainEvent::order_created(&order))
            .await
        {
            tracing::warn!(
                order_number = %order.order_number,
                error = %error,
                "failed to publish order-created event"
            );
        }

        Ok(order)
    }

    async fn undo_checkout(&self, order: &Order, reservations: &[Reservation]) {
        self.restore_all(reservations).await;
        if let Err(error) = self.orders.remove(order.id).await {
            tracing::error!(
                order_id = %order.id,
                error = %error,
                "failed to delete provisional order during compensation"
            );
        }
    }

    async fn restore_all(&self, reservations: &[Reservation]) {
        for reservation in reservations.iter().rev() {
            if let Err(error) = self
                .inventory
                .restore(reservation.item_id, reservation.quantity)
                .await
            {
                tracing::error!(
                    item_id = %reservation.item_id,
                    quantity = reservation.quantity,
                    error = %error,
                    "failed to restore reserved stock"
                );
            }
        }
    }

    async fn release_all(&self, held: &[LockHandle]) {
        for handle in held.iter().rev() {
            if let Err(error) = self.locks.release(handle).await {
                tracing::warn!(
                    key = handle.key(),
                    error = %error,
                    "failed to release lock after checkout phase"
                );
            }
        }
    }
}
