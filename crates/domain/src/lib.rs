//! Domain model for order fulfillment.
//!
//! Orders are assembled by [`OrderDraft`] with snapshot prices and
//! exact fixed-point totals; payments record one authorization attempt
//! per order. Both carry small state machines whose only legal
//! transitions are out of their non-terminal states.

pub mod error;
pub mod events;
pub mod order;
pub mod payment;

pub use error::DomainError;
pub use events::DomainEvent;
pub use order::{Order, OrderDraft, OrderItem, OrderNumber, OrderStatus, ShippingAddress};
pub use payment::{IdempotencyKey, Payment, PaymentStatus};
