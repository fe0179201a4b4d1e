//! Shared types used across the fulfillment engine.

pub mod ids;
pub mod money;

pub use ids::{ItemId, OrderId, PaymentId, UserId};
pub use money::Money;
