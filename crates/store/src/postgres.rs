//! PostgreSQL-backed store implementations.
//!
//! Monetary values are stored as BIGINT minor units. Status columns
//! hold the canonical string forms; an unknown string surfaces as
//! [`StoreError::InvalidColumn`] rather than a panic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, Money, OrderId, PaymentId, UserId};
use domain::{
    IdempotencyKey, Order, OrderItem, OrderNumber, OrderStatus, Payment, PaymentStatus,
    ShippingAddress,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::Result;
use crate::error::StoreError;
use crate::inventory::{InventoryItem, InventoryStore};
use crate::orders::OrderRepository;
use crate::payments::{PaymentLedger, Settlement};

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

fn map_duplicate(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && let Some(constraint) = db_err.constraint()
    {
        return StoreError::Duplicate {
            constraint: constraint.to_string(),
        };
    }
    StoreError::Database(e)
}

/// PostgreSQL inventory store.
///
/// Reservations take a row-level write lock so the check and decrement
/// are atomic even against writers outside this process.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_item(row: PgRow) -> Result<InventoryItem> {
        let available: i64 = row.try_get("available")?;
        Ok(InventoryItem {
            id: ItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get::<i64, _>("unit_price_cents")?),
            available: u32::try_from(available)
                .map_err(|_| StoreError::InvalidColumn("available".to_string()))?,
        })
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn put(&self, item: InventoryItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (id, name, unit_price_cents, available)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                unit_price_cents = EXCLUDED.unit_price_cents,
                available = EXCLUDED.available
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(item.unit_price.cents())
        .bind(item.available as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch(&self, item_id: ItemId) -> Result<Option<InventoryItem>> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT id, name, unit_price_cents, available FROM inventory_items WHERE id = $1",
        )
        .bind(item_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_item).transpose()
    }

    async fn reserve(&self, item_id: ItemId, quantity: u32) -> Result<InventoryItem> {
        let mut tx = self.pool.begin().await?;

        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, name, unit_price_cents, available
            FROM inventory_items
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(item_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let item = match row {
            Some(row) => Self::row_to_item(row)?,
            None => return Err(StoreError::ItemNotFound(item_id)),
        };

        if quantity > item.available {
            return Err(StoreError::InsufficientStock {
                item_id,
                requested: quantity,
                available: item.available,
            });
        }

        sqlx::query("UPDATE inventory_items SET available = available - $2 WHERE id = $1")
            .bind(item_id.as_uuid())
            .bind(quantity as i64)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(InventoryItem {
            available: item.available - quantity,
            ..item
        })
    }

    async fn restore(&self, item_id: ItemId, quantity: u32) -> Result<()> {
        let result =
            sqlx::query("UPDATE inventory_items SET available = available + $2 WHERE id = $1")
                .bind(item_id.as_uuid())
                .bind(quantity as i64)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ItemNotFound(item_id));
        }
        Ok(())
    }
}

/// PostgreSQL order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_str)
            .ok_or_else(|| StoreError::InvalidColumn("status".to_string()))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: OrderNumber::from(row.try_get::<String, _>("order_number")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            items,
            total: Money::from_cents(row.try_get::<i64, _>("total_cents")?),
            status,
            shipping: ShippingAddress {
                address: row.try_get("ship_address")?,
                city: row.try_get("ship_city")?,
                postal_code: row.try_get("ship_postal_code")?,
                country: row.try_get("ship_country")?,
            },
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
        let quantity: i64 = row.try_get("quantity")?;
        Ok(OrderItem {
            item_id: ItemId::from_uuid(row.try_get::<Uuid, _>("item_id")?),
            name: row.try_get("name")?,
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::InvalidColumn("quantity".to_string()))?,
            price_at_purchase: Money::from_cents(row.try_get::<i64, _>("price_cents")?),
            subtotal: Money::from_cents(row.try_get::<i64, _>("subtotal_cents")?),
        })
    }

    async fn items_for_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, name, quantity, price_cents, subtotal_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order_item).collect()
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, user_id, total_cents, status,
                                ship_address, ship_city, ship_postal_code, ship_country,
                                created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(order.user_id.as_uuid())
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(&order.shipping.address)
        .bind(&order.shipping.city)
        .bind(&order.shipping.postal_code)
        .bind(&order.shipping.country)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_duplicate)?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, item_id, name, quantity,
                                         price_cents, subtotal_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(item.item_id.as_uuid())
            .bind(&item.name)
            .bind(item.quantity as i64)
            .bind(item.price_at_purchase.cents())
            .bind(item.subtotal.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, order_number, user_id, total_cents, status,
                   ship_address, ship_city, ship_postal_code, ship_country, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.items_for_order(order_id).await?;
                Ok(Some(Self::row_to_order(row, items)?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, user_id, total_cents, status,
                   ship_address, ship_city, ship_postal_code, ship_country, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let items = self.items_for_order(order_id).await?;
            orders.push(Self::row_to_order(row, items)?);
        }
        Ok(orders)
    }

    async fn transition(&self, order_id: OrderId, status: OrderStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status = $3")
            .bind(order_id.as_uuid())
            .bind(status.as_str())
            .bind(OrderStatus::Pending.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Distinguish "already terminal" from "no such order".
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Ok(false),
            None => Err(StoreError::OrderNotFound(order_id)),
        }
    }

    async fn remove(&self, order_id: OrderId) -> Result<()> {
        // order_items rows go with the order via ON DELETE CASCADE.
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// PostgreSQL payment ledger.
#[derive(Clone)]
pub struct PostgresPaymentLedger {
    pool: PgPool,
}

impl PostgresPaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        let status_str: String = row.try_get("status")?;
        let status = PaymentStatus::parse(&status_str)
            .ok_or_else(|| StoreError::InvalidColumn("status".to_string()))?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            order_number: OrderNumber::from(row.try_get::<String, _>("order_number")?),
            authorization_id: row.try_get("authorization_id")?,
            amount: Money::from_cents(row.try_get::<i64, _>("amount_cents")?),
            currency: row.try_get("currency")?,
            status,
            failure_reason: row.try_get("failure_reason")?,
            idempotency_key: IdempotencyKey::from(row.try_get::<String, _>("idempotency_key")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    async fn fetch_by_authorization(&self, authorization_id: &str) -> Result<Option<Payment>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, order_id, order_number, authorization_id, amount_cents, currency,
                   status, failure_reason, idempotency_key, created_at, updated_at
            FROM payments
            WHERE authorization_id = $1
            "#,
        )
        .bind(authorization_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_payment).transpose()
    }
}

#[async_trait]
impl PaymentLedger for PostgresPaymentLedger {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, order_number, authorization_id, amount_cents,
                                  currency, status, failure_reason, idempotency_key,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(payment.order_number.as_str())
        .bind(&payment.authorization_id)
        .bind(payment.amount.cents())
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.failure_reason)
        .bind(payment.idempotency_key.as_str())
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_duplicate)?;

        Ok(())
    }

    async fn find_by_authorization(&self, authorization_id: &str) -> Result<Option<Payment>> {
        self.fetch_by_authorization(authorization_id).await
    }

    async fn settle(
        &self,
        authorization_id: &str,
        status: PaymentStatus,
        failure_reason: Option<String>,
    ) -> Result<Settlement> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, failure_reason = $3, updated_at = NOW()
            WHERE authorization_id = $1 AND status IN ($4, $5)
            "#,
        )
        .bind(authorization_id)
        .bind(status.as_str())
        .bind(&failure_reason)
        .bind(PaymentStatus::Pending.as_str())
        .bind(PaymentStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() > 0;

        let payment = self
            .fetch_by_authorization(authorization_id)
            .await?
            .ok_or_else(|| StoreError::PaymentNotFound(authorization_id.to_string()))?;

        Ok(Settlement { payment, applied })
    }
}
