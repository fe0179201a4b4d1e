//! Orders and the aggregate builder.

use chrono::{DateTime, Utc};
use common::{ItemId, Money, OrderId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed
///           └──► Cancelled
/// ```
/// Both non-pending states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order created, payment authorization outstanding.
    #[default]
    Pending,

    /// Payment succeeded (terminal state).
    Confirmed,

    /// Payment failed or the order was abandoned (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from its string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(OrderStatus::Pending),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Human-readable, collision-resistant order number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a fresh order number of the form `ORD-XXXXXXXX`.
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string();
        Self(format!("ORD-{}", raw[..8].to_uppercase()))
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Shipping destination captured at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// A line in an order.
///
/// The price is a snapshot taken at reservation time; later catalog
/// changes never affect an already-created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The inventory item ordered.
    pub item_id: ItemId,

    /// Item name at purchase time.
    pub name: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Unit price at purchase time.
    pub price_at_purchase: Money,

    /// `quantity × price_at_purchase`.
    pub subtotal: Money,
}

impl OrderItem {
    /// Creates a line with the subtotal computed from its parts.
    pub fn new(
        item_id: ItemId,
        name: impl Into<String>,
        quantity: u32,
        price_at_purchase: Money,
    ) -> Self {
        Self {
            item_id,
            name: name.into(),
            quantity,
            price_at_purchase,
            subtotal: price_at_purchase.multiply(quantity),
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub status: OrderStatus,
    pub shipping: ShippingAddress,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns the number of lines in the order.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// Assembles an order from snapshot-priced lines.
///
/// Lines are added as inventory is reserved; [`OrderDraft::build`]
/// sums subtotals into the total (exact minor-unit arithmetic) and
/// yields a `Pending` order with a fresh order number.
#[derive(Debug)]
pub struct OrderDraft {
    user_id: UserId,
    shipping: ShippingAddress,
    items: Vec<OrderItem>,
}

impl OrderDraft {
    /// Starts a draft for a user and destination.
    pub fn new(user_id: UserId, shipping: ShippingAddress) -> Self {
        Self {
            user_id,
            shipping,
            items: Vec::new(),
        }
    }

    /// Adds a line with the given price snapshot.
    pub fn add_item(
        &mut self,
        item_id: ItemId,
        name: impl Into<String>,
        quantity: u32,
        price_at_purchase: Money,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::ZeroQuantity);
        }
        self.items
            .push(OrderItem::new(item_id, name, quantity, price_at_purchase));
        Ok(())
    }

    /// Builds the pending order.
    pub fn build(self) -> Result<Order, DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let total: Money = self.items.iter().map(|item| item.subtotal).sum();

        Ok(Order {
            id: OrderId::new(),
            order_number: OrderNumber::generate(),
            user_id: self.user_id,
            items: self.items,
            total,
            status: OrderStatus::Pending,
            shipping: self.shipping,
            created_at: Utc::now(),
        })
    }
}
