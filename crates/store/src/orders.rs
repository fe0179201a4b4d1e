//! Order storage.

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus};

use crate::Result;

/// Trait for durable order storage.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists a new order with its items. Fails with `Duplicate` if
    /// the order number is already taken.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Loads an order by id.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists a user's orders, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Compare-and-set status transition: applies only while the order
    /// is still `Pending`. Returns whether the transition applied; an
    /// order already in a terminal state is left unchanged.
    async fn transition(&self, order_id: OrderId, status: OrderStatus) -> Result<bool>;

    /// Deletes a provisional order during checkout compensation.
    /// Removing an order that no longer exists is a no-op.
    async fn remove(&self, order_id: OrderId) -> Result<()>;
}
