//! End-to-end order flow tests over the in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{ItemId, Money, UserId};
use domain::{OrderStatus, PaymentStatus, ShippingAddress};
use fulfillment::{
    AuthorizationRequest, CheckoutConfig, CheckoutLine, CheckoutRequest, CheckoutService,
    FulfillmentError, GatewayEvent, InMemoryEventPublisher, InMemoryPaymentGateway,
    PaymentGateway, ReconciliationOutcome, ReconciliationService,
};
use locks::{InMemoryLockCoordinator, inventory_key};
use store::{
    InMemoryInventoryStore, InMemoryOrderRepository, InMemoryPaymentLedger, InventoryItem,
    InventoryStore, OrderRepository, PaymentLedger,
};

type Checkout = CheckoutService<
    InMemoryLockCoordinator,
    InMemoryInventoryStore,
    InMemoryOrderRepository,
    InMemoryPaymentLedger,
    InMemoryPaymentGateway,
    InMemoryEventPublisher,
>;

type Reconciliation =
    ReconciliationService<InMemoryPaymentLedger, InMemoryOrderRepository, InMemoryEventPublisher>;

struct Harness {
    locks: Arc<InMemoryLockCoordinator>,
    inventory: Arc<InMemoryInventoryStore>,
    orders: Arc<InMemoryOrderRepository>,
    payments: Arc<InMemoryPaymentLedger>,
    gateway: Arc<InMemoryPaymentGateway>,
    publisher: Arc<InMemoryEventPublisher>,
}

impl Harness {
    fn new() -> Self {
        Self {
            locks: Arc::new(InMemoryLockCoordinator::new()),
            inventory: Arc::new(InMemoryInventoryStore::new()),
            orders: Arc::new(InMemoryOrderRepository::new()),
            payments: Arc::new(InMemoryPaymentLedger::new()),
            gateway: Arc::new(InMemoryPaymentGateway::new()),
            publisher: Arc::new(InMemoryEventPublisher::new()),
        }
    }

    fn checkout(&self) -> Checkout {
        CheckoutService::new(
            self.locks.clone(),
            self.inventory.clone(),
            self.orders.clone(),
            self.payments.clone(),
            self.gateway.clone(),
            self.publisher.clone(),
            CheckoutConfig {
                lock_wait: Duration::from_millis(250),
                lock_lease: Duration::from_secs(10),
                currency: "usd".to_string(),
            },
        )
    }

    fn reconciliation(&self) -> Reconciliation {
        ReconciliationService::new(
            self.payments.clone(),
            self.orders.clone(),
            self.publisher.clone(),
        )
    }

    async fn stock(&self, name: &str, price_cents: i64, available: u32) -> ItemId {
        let item = InventoryItem {
            id: ItemId::new(),
            name: name.to_string(),
            unit_price: Money::from_cents(price_cents),
            available,
        };
        let id = item.id;
        self.inventory.put(item).await.unwrap();
        id
    }
}

fn shipping() -> ShippingAddress {
    ShippingAddress {
        address: "1 Garden Way".into(),
        city: "Portland".into(),
        postal_code: "97201".into(),
        country: "US".into(),
    }
}

fn request(user_id: UserId, lines: Vec<CheckoutLine>) -> CheckoutRequest {
    CheckoutRequest {
        user_id,
        shipping: shipping(),
        lines,
    }
}

#[tokio::test]
async fn order_placed_then_confirmed() {
    let harness = Harness::new();
    let monstera = harness.stock("Monstera", 1000, 10).await;
    let pothos = harness.stock("Pothos", 500, 10).await;
    let checkout = harness.checkout();
    let reconciliation = harness.reconciliation();

    let order = checkout
        .place_order(request(
            UserId::new(),
            vec![
                CheckoutLine {
                    item_id: monstera,
                    quantity: 2,
                },
                CheckoutLine {
                    item_id: pothos,
                    quantity: 1,
                },
            ],
        ))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total.cents(), 2500);

    let payment = harness.payments.for_order(order.id).unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount.cents(), 2500);

    let outcome = reconciliation
        .apply(GatewayEvent::AuthorizationSucceeded {
            authorization_id: payment.authorization_id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, ReconciliationOutcome::Applied);

    let confirmed = harness.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);

    // All three events, in send order, share the order's partition key.
    let published = harness.publisher.published();
    let types: Vec<&str> = published.iter().map(|e| e.event_type()).collect();
    assert_eq!(types, ["OrderCreated", "PaymentProcessed", "OrderConfirmed"]);
    for event in &published {
        assert_eq!(event.partition_key(), order.order_number.as_str());
    }
}

#[tokio::test]
async fn failed_payment_cancels_order() {
    let harness = Harness::new();
    let item_id = harness.stock("Monstera", 1000, 5).await;
    let checkout = harness.checkout();
    let reconciliation = harness.reconciliation();

    let order = checkout
        .place_order(request(
            UserId::new(),
            vec![CheckoutLine { item_id, quantity: 1 }],
        ))
        .await
        .unwrap();
    let payment = harness.payments.for_order(order.id).unwrap();

    reconciliation
        .apply(GatewayEvent::AuthorizationFailed {
            authorization_id: payment.authorization_id.clone(),
            reason: Some("card declined".to_string()),
        })
        .await
        .unwrap();

    let cancelled = harness.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let settled = harness
        .payments
        .find_by_authorization(&payment.authorization_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status, PaymentStatus::Failed);
    assert_eq!(settled.failure_reason.as_deref(), Some("card declined"));

    // OrderCreated from checkout plus PaymentProcessed; no OrderConfirmed.
    let types: Vec<&str> = harness
        .publisher
        .published()
        .iter()
        .map(|e| e.event_type())
        .collect::<Vec<_>>();
    assert_eq!(types, ["OrderCreated", "PaymentProcessed"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_unit_goes_to_exactly_one_buyer() {
    let harness = Harness::new();
    let item_id = harness.stock("Monstera", 1000, 1).await;
    let checkout = harness.checkout();

    let a = {
        let checkout = checkout.clone();
        tokio::spawn(async move {
            checkout
                .place_order(request(
                    UserId::new(),
                    vec![CheckoutLine { item_id, quantity: 1 }],
                ))
                .await
        })
    };
    let b = {
        let checkout = checkout.clone();
        tokio::spawn(async move {
            checkout
                .place_order(request(
                    UserId::new(),
                    vec![CheckoutLine { item_id, quantity: 1 }],
                ))
                .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);

    let loser = results.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        loser,
        Err(FulfillmentError::InsufficientStock { .. }) | Err(FulfillmentError::LockTimeout { .. })
    ));

    assert_eq!(harness.inventory.available(item_id), Some(0));
    assert_eq!(harness.orders.order_count(), 1);
    assert_eq!(harness.payments.payment_count(), 1);

    // Only the winner emitted an event.
    assert_eq!(harness.publisher.published_count(), 1);
    assert!(!harness.locks.is_held(&inventory_key(item_id)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_multi_item_orders_never_deadlock() {
    let harness = Harness::new();
    let first = harness.stock("Monstera", 1000, 5).await;
    let second = harness.stock("Pothos", 500, 5).await;
    let checkout = harness.checkout();

    // Opposite request order for the same two items.
    let a = {
        let checkout = checkout.clone();
        tokio::spawn(async move {
            checkout
                .place_order(request(
                    UserId::new(),
                    vec![
                        CheckoutLine {
                            item_id: first,
                            quantity: 1,
                        },
                        CheckoutLine {
                            item_id: second,
                            quantity: 1,
                        },
                    ],
                ))
                .await
        })
    };
    let b = {
        let checkout = checkout.clone();
        tokio::spawn(async move {
            checkout
                .place_order(request(
                    UserId::new(),
                    vec![
                        CheckoutLine {
                            item_id: second,
                            quantity: 1,
                        },
                        CheckoutLine {
                            item_id: first,
                            quantity: 1,
                        },
                    ],
                ))
                .await
        })
    };

    // Sorted acquisition order means both complete without timing out
    // against each other indefinitely.
    let results = [a.await.unwrap(), b.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert!(winners >= 1);

    let reserved_first = 5 - harness.inventory.available(first).unwrap();
    let reserved_second = 5 - harness.inventory.available(second).unwrap();
    assert_eq!(reserved_first as usize, winners);
    assert_eq!(reserved_second as usize, winners);
}

#[tokio::test]
async fn gateway_failure_leaves_no_trace() {
    let harness = Harness::new();
    let item_id = harness.stock("Monstera", 1000, 5).await;
    harness.gateway.set_fail_on_authorize(true);
    let checkout = harness.checkout();

    let result = checkout
        .place_order(request(
            UserId::new(),
            vec![CheckoutLine { item_id, quantity: 2 }],
        ))
        .await;

    assert!(matches!(result, Err(FulfillmentError::Gateway(_))));
    assert_eq!(harness.inventory.available(item_id), Some(5));
    assert_eq!(harness.orders.order_count(), 0);
    assert_eq!(harness.payments.payment_count(), 0);
    assert_eq!(harness.publisher.published_count(), 0);
}

#[tokio::test]
async fn replayed_success_callback_applies_once() {
    let harness = Harness::new();
    let item_id = harness.stock("Monstera", 1000, 5).await;
    let checkout = harness.checkout();
    let reconciliation = harness.reconciliation();

    let order = checkout
        .place_order(request(
            UserId::new(),
            vec![CheckoutLine { item_id, quantity: 1 }],
        ))
        .await
        .unwrap();
    let payment = harness.payments.for_order(order.id).unwrap();

    let event = GatewayEvent::AuthorizationSucceeded {
        authorization_id: payment.authorization_id.clone(),
    };
    let first = reconciliation.apply(event.clone()).await.unwrap();
    let second = reconciliation.apply(event.clone()).await.unwrap();
    let third = reconciliation.apply(event).await.unwrap();

    assert_eq!(first, ReconciliationOutcome::Applied);
    assert_eq!(second, ReconciliationOutcome::AlreadySettled);
    assert_eq!(third, ReconciliationOutcome::AlreadySettled);

    // One OrderCreated, one PaymentProcessed, one OrderConfirmed.
    assert_eq!(harness.publisher.published_count(), 3);
}

#[tokio::test]
async fn callback_for_unknown_authorization_is_rejected() {
    let harness = Harness::new();
    let reconciliation = harness.reconciliation();

    let result = reconciliation
        .apply(GatewayEvent::AuthorizationSucceeded {
            authorization_id: "AUTH-9999".to_string(),
        })
        .await;

    assert!(matches!(
        result,
        Err(FulfillmentError::UnknownAuthorization(_))
    ));
}

/// Gateway that parks every authorization until the test opens the
/// gate, then declines it.
#[derive(Clone)]
struct GatedGateway {
    entered: Arc<tokio::sync::Semaphore>,
    release: Arc<tokio::sync::Semaphore>,
}

impl Default for GatedGateway {
    fn default() -> Self {
        Self {
            entered: Arc::new(tokio::sync::Semaphore::new(0)),
            release: Arc::new(tokio::sync::Semaphore::new(0)),
        }
    }
}

#[async_trait]
impl PaymentGateway for GatedGateway {
    async fn authorize(&self, _request: AuthorizationRequest) -> Result<String, FulfillmentError> {
        self.entered.add_permits(1);
        let _permit = self.release.acquire().await;
        Err(FulfillmentError::Gateway(
            "authorization declined".to_string(),
        ))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abandoned_caller_still_compensates_fully() {
    let locks = Arc::new(InMemoryLockCoordinator::new());
    let inventory = Arc::new(InMemoryInventoryStore::new());
    let orders = Arc::new(InMemoryOrderRepository::new());
    let payments = Arc::new(InMemoryPaymentLedger::new());
    let gateway = Arc::new(GatedGateway::default());
    let publisher = Arc::new(InMemoryEventPublisher::new());

    let item_id = ItemId::new();
    inventory
        .put(InventoryItem {
            id: item_id,
            name: "Monstera".to_string(),
            unit_price: Money::from_cents(1000),
            available: 5,
        })
        .await
        .unwrap();

    let checkout = CheckoutService::new(
        locks.clone(),
        inventory.clone(),
        orders.clone(),
        payments.clone(),
        gateway.clone(),
        publisher.clone(),
        CheckoutConfig::default(),
    );

    let caller = tokio::spawn(async move {
        checkout
            .place_order(request(
                UserId::new(),
                vec![CheckoutLine { item_id, quantity: 2 }],
            ))
            .await
    });

    // Wait until checkout is parked inside the gateway: stock is
    // reserved and the provisional order row is in place.
    let entered = gateway.entered.clone().acquire_owned().await.unwrap();
    entered.forget();
    assert_eq!(inventory.available(item_id), Some(3));
    assert_eq!(orders.order_count(), 1);

    // The caller vanishes mid-flight.
    caller.abort();
    assert!(caller.await.is_err());

    // The body keeps running; once the gateway answers, compensation
    // must complete without anyone awaiting it.
    gateway.release.add_permits(1);
    for _ in 0..200 {
        if inventory.available(item_id) == Some(5) && orders.order_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(inventory.available(item_id), Some(5));
    assert_eq!(orders.order_count(), 0);
    assert_eq!(payments.payment_count(), 0);
    assert_eq!(publisher.published_count(), 0);
    assert!(!locks.is_held(&inventory_key(item_id)));
}

#[tokio::test]
async fn sequential_orders_drain_stock_exactly() {
    let harness = Harness::new();
    let item_id = harness.stock("Monstera", 1000, 3).await;
    let checkout = harness.checkout();

    for _ in 0..3 {
        checkout
            .place_order(request(
                UserId::new(),
                vec![CheckoutLine { item_id, quantity: 1 }],
            ))
            .await
            .unwrap();
    }

    let result = checkout
        .place_order(request(
            UserId::new(),
            vec![CheckoutLine { item_id, quantity: 1 }],
        ))
        .await;

    assert!(matches!(
        result,
        Err(FulfillmentError::InsufficientStock {
            requested: 1,
            available: 0,
            ..
        })
    ));
    assert_eq!(harness.inventory.available(item_id), Some(0));
    assert_eq!(harness.orders.order_count(), 3);
}
