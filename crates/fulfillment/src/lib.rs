//! Checkout orchestration and payment reconciliation.
//!
//! [`CheckoutService`] places orders: it reserves stock under per-item
//! distributed locks, persists a provisional order, and authorizes the
//! payment with every lock already released. Failures at any step
//! compensate fully, so an order either lands complete with a pending
//! payment or leaves no trace.
//!
//! [`ReconciliationService`] consumes gateway callbacks and drives the
//! payment and order rows to their terminal states, idempotently.

pub mod checkout;
pub mod error;
pub mod events;
pub mod gateway;
pub mod publisher;
pub mod reconciliation;

pub use checkout::{CheckoutConfig, CheckoutLine, CheckoutRequest, CheckoutService};
pub use error::FulfillmentError;
pub use events::GatewayEvent;
pub use gateway::{AuthorizationRequest, InMemoryPaymentGateway, PaymentGateway};
pub use publisher::{EventPublisher, InMemoryEventPublisher};
pub use reconciliation::{ReconciliationOutcome, ReconciliationService};

#[cfg(feature = "kafka")]
pub use publisher::KafkaEventPublisher;
