//! Domain events published to the message broker.
//!
//! A closed, tagged set of variants with fixed fields per type. Events
//! are not persisted here; ownership transfers to the broker on
//! publish. All events for one order share the order number as their
//! partition key, so a single consumer observes them in send order.

use chrono::{DateTime, Utc};
use common::Money;
use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderNumber, OrderStatus};
use crate::payment::{Payment, PaymentStatus};

/// Events emitted by the fulfillment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    /// An order was placed and its payment authorization created.
    OrderCreated(OrderCreatedData),

    /// Reconciliation confirmed an order after a successful payment.
    OrderConfirmed(OrderConfirmedData),

    /// Reconciliation settled a payment, successfully or not.
    PaymentProcessed(PaymentProcessedData),
}

/// Data for OrderCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub total: Money,
    pub timestamp: DateTime<Utc>,
}

/// Data for OrderConfirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmedData {
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub total: Money,
    pub timestamp: DateTime<Utc>,
}

/// Data for PaymentProcessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProcessedData {
    pub order_number: OrderNumber,
    pub authorization_id: String,
    pub status: PaymentStatus,
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    /// Creates an OrderCreated event from a freshly placed order.
    pub fn order_created(order: &Order) -> Self {
        DomainEvent::OrderCreated(OrderCreatedData {
            order_number: order.order_number.clone(),
            status: order.status,
            total: order.total,
            timestamp: Utc::now(),
        })
    }

    /// Creates an OrderConfirmed event from a settled payment.
    pub fn order_confirmed(payment: &Payment) -> Self {
        DomainEvent::OrderConfirmed(OrderConfirmedData {
            order_number: payment.order_number.clone(),
            status: OrderStatus::Confirmed,
            total: payment.amount,
            timestamp: Utc::now(),
        })
    }

    /// Creates a PaymentProcessed event from a settled payment.
    pub fn payment_processed(payment: &Payment) -> Self {
        DomainEvent::PaymentProcessed(PaymentProcessedData {
            order_number: payment.order_number.clone(),
            authorization_id: payment.authorization_id.clone(),
            status: payment.status,
            amount: payment.amount,
            timestamp: Utc::now(),
        })
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated(_) => "OrderCreated",
            DomainEvent::OrderConfirmed(_) => "OrderConfirmed",
            DomainEvent::PaymentProcessed(_) => "PaymentProcessed",
        }
    }

    /// Returns the broker topic this event is published to.
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated(_) => "order-created",
            DomainEvent::OrderConfirmed(_) => "order-confirmed",
            DomainEvent::PaymentProcessed(_) => "payment-processed",
        }
    }

    /// Returns the partition key: the order number, for per-order ordering.
    pub fn partition_key(&self) -> &str {
        match self {
            DomainEvent::OrderCreated(data) => data.order_number.as_str(),
            DomainEvent::OrderConfirmed(data) => data.order_number.as_str(),
            DomainEvent::PaymentProcessed(data) => data.order_number.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderDraft, ShippingAddress};
    use crate::payment::IdempotencyKey;
    use common::{ItemId, OrderId, UserId};

    fn order() -> Order {
        let mut draft = OrderDraft::new(
            UserId::new(),
            ShippingAddress {
                address: "1 Garden Way".into(),
                city: "Portland".into(),
                postal_code: "97201".into(),
                country: "US".into(),
            },
        );
        draft
            .add_item(ItemId::new(), "Monstera", 2, Money::from_cents(1000))
            .unwrap();
        draft.build().unwrap()
    }

    fn payment() -> Payment {
        Payment::pending(
            OrderId::new(),
            OrderNumber::generate(),
            "auth_123",
            Money::from_cents(2500),
            "usd",
            IdempotencyKey::generate(),
        )
    }

    #[test]
    fn topics_and_types() {
        let order = order();
        let payment = payment();

        let created = DomainEvent::order_created(&order);
        assert_eq!(created.event_type(), "OrderCreated");
        assert_eq!(created.topic(), "order-created");

        let confirmed = DomainEvent::order_confirmed(&payment);
        assert_eq!(confirmed.event_type(), "OrderConfirmed");
        assert_eq!(confirmed.topic(), "order-confirmed");

        let processed = DomainEvent::payment_processed(&payment);
        assert_eq!(processed.event_type(), "PaymentProcessed");
        assert_eq!(processed.topic(), "payment-processed");
    }

    #[test]
    fn partition_key_is_order_number() {
        let order = order();
        let event = DomainEvent::order_created(&order);
        assert_eq!(event.partition_key(), order.order_number.as_str());

        let payment = payment();
        let event = DomainEvent::payment_processed(&payment);
        assert_eq!(event.partition_key(), payment.order_number.as_str());
    }

    #[test]
    fn order_created_carries_order_fields() {
        let order = order();
        if let DomainEvent::OrderCreated(data) = DomainEvent::order_created(&order) {
            assert_eq!(data.order_number, order.order_number);
            assert_eq!(data.status, OrderStatus::Pending);
            assert_eq!(data.total, order.total);
        } else {
            panic!("expected OrderCreated");
        }
    }

    #[test]
    fn serialization_roundtrip() {
        let payment = payment();
        let events = [
            DomainEvent::order_created(&order()),
            DomainEvent::order_confirmed(&payment),
            DomainEvent::payment_processed(&payment),
        ];

        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let deserialized: DomainEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(event, deserialized);
        }
    }
}
