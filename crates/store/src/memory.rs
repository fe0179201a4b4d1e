//! In-memory store implementations for testing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::{ItemId, OrderId, UserId};
use domain::{Order, OrderStatus, Payment, PaymentStatus};

use crate::error::StoreError;
use crate::inventory::{InventoryItem, InventoryStore};
use crate::orders::OrderRepository;
use crate::payments::{PaymentLedger, Settlement};
use crate::Result;

/// In-memory inventory store.
///
/// The interior lock makes each reservation an atomic
/// check-and-decrement, matching the row-lock semantics of the
/// PostgreSQL implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryStore {
    items: Arc<RwLock<HashMap<ItemId, InventoryItem>>>,
}

impl InMemoryInventoryStore {
    /// Creates an empty inventory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the available quantity, if the item exists.
    pub fn available(&self, item_id: ItemId) -> Option<u32> {
        self.items
            .read()
            .unwrap()
            .get(&item_id)
            .map(|item| item.available)
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn put(&self, item: InventoryItem) -> Result<()> {
        self.items.write().unwrap().insert(item.id, item);
        Ok(())
    }

    async fn fetch(&self, item_id: ItemId) -> Result<Option<InventoryItem>> {
        Ok(self.items.read().unwrap().get(&item_id).cloned())
    }

    async fn reserve(&self, item_id: ItemId, quantity: u32) -> Result<InventoryItem> {
        let mut items = self.items.write().unwrap();
        let item = items
            .get_mut(&item_id)
            .ok_or(StoreError::ItemNotFound(item_id))?;

        if quantity > item.available {
            return Err(StoreError::InsufficientStock {
                item_id,
                requested: quantity,
                available: item.available,
            });
        }

        item.available -= quantity;
        Ok(item.clone())
    }

    async fn restore(&self, item_id: ItemId, quantity: u32) -> Result<()> {
        let mut items = self.items.write().unwrap();
        let item = items
            .get_mut(&item_id)
            .ok_or(StoreError::ItemNotFound(item_id))?;
        item.available += quantity;
        Ok(())
    }
}

/// In-memory order repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderRepository {
    /// Creates an empty order repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of persisted orders.
    pub fn order_count(&self) -> usize {
        self.orders.read().unwrap().len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().unwrap();

        let number_taken = orders
            .values()
            .any(|existing| existing.order_number == order.order_number);
        if number_taken {
            return Err(StoreError::Duplicate {
                constraint: "orders_order_number_key".to_string(),
            });
        }

        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().unwrap().get(&order_id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().unwrap();
        let mut result: Vec<Order> = orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn transition(&self, order_id: OrderId, status: OrderStatus) -> Result<bool> {
        let mut orders = self.orders.write().unwrap();
        let order = orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        if order.status != OrderStatus::Pending {
            return Ok(false);
        }
        order.status = status;
        Ok(true)
    }

    async fn remove(&self, order_id: OrderId) -> Result<()> {
        self.orders.write().unwrap().remove(&order_id);
        Ok(())
    }
}

/// In-memory payment ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentLedger {
    payments: Arc<RwLock<Vec<Payment>>>,
}

impl InMemoryPaymentLedger {
    /// Creates an empty payment ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of ledger entries.
    pub fn payment_count(&self) -> usize {
        self.payments.read().unwrap().len()
    }

    /// Returns the payment for an order, if one exists.
    pub fn for_order(&self, order_id: OrderId) -> Option<Payment> {
        self.payments
            .read()
            .unwrap()
            .iter()
            .find(|payment| payment.order_id == order_id)
            .cloned()
    }
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentLedger {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        let mut payments = self.payments.write().unwrap();

        for existing in payments.iter() {
            let constraint = if existing.order_id == payment.order_id {
                Some("payments_order_id_key")
            } else if existing.authorization_id == payment.authorization_id {
                Some("payments_authorization_id_key")
            } else if existing.idempotency_key == payment.idempotency_key {
                Some("payments_idempotency_key_key")
            } else {
                None
            };

            if let Some(constraint) = constraint {
                return Err(StoreError::Duplicate {
                    constraint: constraint.to_string(),
                });
            }
        }

        payments.push(payment.clone());
        Ok(())
    }

    async fn find_by_authorization(&self, authorization_id: &str) -> Result<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .unwrap()
            .iter()
            .find(|payment| payment.authorization_id == authorization_id)
            .cloned())
    }

    async fn settle(
        &self,
        authorization_id: &str,
        status: PaymentStatus,
        failure_reason: Option<String>,
    ) -> Result<Settlement> {
        let mut payments = self.payments.write().unwrap();
        let payment = payments
            .iter_mut()
            .find(|payment| payment.authorization_id == authorization_id)
            .ok_or_else(|| StoreError::PaymentNotFound(authorization_id.to_string()))?;

        if payment.status.is_terminal() {
            return Ok(Settlement {
                payment: payment.clone(),
                applied: false,
            });
        }

        payment.status = status;
        payment.failure_reason = failure_reason;
        payment.updated_at = Utc::now();

        Ok(Settlement {
            payment: payment.clone(),
            applied: true,
        })
    }
}
