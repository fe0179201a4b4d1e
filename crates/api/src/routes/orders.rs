//! Checkout and order lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{ItemId, OrderId, UserId};
use domain::{Order, ShippingAddress};
use fulfillment::{CheckoutLine, CheckoutRequest};
use serde::{Deserialize, Serialize};
use store::OrderRepository;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub user_id: String,
    pub shipping: ShippingRequest,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Deserialize)]
pub struct ShippingRequest {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Deserialize)]
pub struct OrderLineRequest {
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub user_id: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub status: String,
    pub total_cents: i64,
    pub items: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub item_id: String,
    pub name: String,
    pub quantity: u32,
    pub price_cents: i64,
    pub subtotal_cents: i64,
}

fn order_response(order: &Order) -> OrderResponse {
    OrderResponse {
        id: order.id.to_string(),
        order_number: order.order_number.to_string(),
        user_id: order.user_id.to_string(),
        status: order.status.to_string(),
        total_cents: order.total.cents(),
        items: order
            .items
            .iter()
            .map(|item| OrderLineResponse {
                item_id: item.item_id.to_string(),
                name: item.name.clone(),
                quantity: item.quantity,
                price_cents: item.price_at_purchase.cents(),
                subtotal_cents: item.subtotal.cents(),
            })
            .collect(),
    }
}

// -- Handlers --

/// POST /orders — place an order.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let user_id = parse_id::<UserId>(&req.user_id, "user_id")?;

    let mut lines = Vec::with_capacity(req.items.len());
    for line in &req.items {
        lines.push(CheckoutLine {
            item_id: parse_id::<ItemId>(&line.item_id, "item_id")?,
            quantity: line.quantity,
        });
    }

    let order = state
        .checkout
        .place_order(CheckoutRequest {
            user_id,
            shipping: ShippingAddress {
                address: req.shipping.address,
                city: req.shipping.city,
                postal_code: req.shipping.postal_code,
                country: req.shipping.country,
            },
            lines,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(order_response(&order))))
}

/// GET /orders/:id — load an order by id.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id::<OrderId>(&id, "order id")?;
    let order = state
        .orders
        .get(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(order_response(&order)))
}

/// GET /orders?user_id=… — list a user's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let user_id = parse_id::<UserId>(&query.user_id, "user_id")?;
    let orders = state.orders.list_for_user(user_id).await?;

    Ok(Json(orders.iter().map(order_response).collect()))
}

fn parse_id<T: From<uuid::Uuid>>(id: &str, what: &str) -> Result<T, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what}: {e}")))?;
    Ok(T::from(uuid))
}
