//! HTTP API for the order fulfillment engine.
//!
//! Exposes checkout, order lookup, inventory seeding, and the payment
//! gateway webhook, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fulfillment::{
    CheckoutConfig, CheckoutService, InMemoryEventPublisher, InMemoryPaymentGateway,
    ReconciliationService,
};
use locks::InMemoryLockCoordinator;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryInventoryStore, InMemoryOrderRepository, InMemoryPaymentLedger};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
///
/// The default binary runs the in-memory stack end to end; the Redis,
/// PostgreSQL, and Kafka backends plug in through the same trait seams
/// at construction time.
pub struct AppState {
    pub checkout: CheckoutService<
        InMemoryLockCoordinator,
        InMemoryInventoryStore,
        InMemoryOrderRepository,
        InMemoryPaymentLedger,
        InMemoryPaymentGateway,
        InMemoryEventPublisher,
    >,
    pub reconciliation: ReconciliationService<
        InMemoryPaymentLedger,
        InMemoryOrderRepository,
        InMemoryEventPublisher,
    >,
    pub inventory: Arc<InMemoryInventoryStore>,
    pub orders: Arc<InMemoryOrderRepository>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/orders", get(routes::orders::list))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/inventory", post(routes::inventory::seed))
        .route("/inventory/{id}", get(routes::inventory::get))
        .route("/webhooks/payment", post(routes::webhooks::payment))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over the in-memory backends.
pub fn create_default_state(config: &Config) -> Arc<AppState> {
    let locks = Arc::new(InMemoryLockCoordinator::new());
    let inventory = Arc::new(InMemoryInventoryStore::new());
    let orders = Arc::new(InMemoryOrderRepository::new());
    let payments = Arc::new(InMemoryPaymentLedger::new());
    let gateway = Arc::new(InMemoryPaymentGateway::new());
    let publisher = Arc::new(InMemoryEventPublisher::new());

    let checkout = CheckoutService::new(
        locks,
        inventory.clone(),
        orders.clone(),
        payments.clone(),
        gateway,
        publisher.clone(),
        CheckoutConfig {
            lock_wait: config.lock_wait,
            lock_lease: config.lock_lease,
            currency: config.currency.clone(),
        },
    );
    let reconciliation = ReconciliationService::new(payments, orders.clone(), publisher);

    Arc::new(AppState {
        checkout,
        reconciliation,
        inventory,
        orders,
    })
}
