//! Inventory seeding and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ItemId, Money};
use serde::{Deserialize, Serialize};
use store::{InventoryItem, InventoryStore};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct SeedItemRequest {
    /// Omitted for a fresh item; set to upsert a known id.
    pub id: Option<String>,
    pub name: String,
    pub unit_price_cents: i64,
    pub available: u32,
}

#[derive(Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub available: u32,
}

fn item_response(item: &InventoryItem) -> ItemResponse {
    ItemResponse {
        id: item.id.to_string(),
        name: item.name.clone(),
        unit_price_cents: item.unit_price.cents(),
        available: item.available,
    }
}

/// POST /inventory — insert or replace an item row.
#[tracing::instrument(skip(state, req))]
pub async fn seed(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SeedItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    if req.unit_price_cents < 0 {
        return Err(ApiError::BadRequest(
            "unit_price_cents must not be negative".to_string(),
        ));
    }

    let id = match &req.id {
        Some(raw) => {
            let uuid = uuid::Uuid::parse_str(raw)
                .map_err(|e| ApiError::BadRequest(format!("Invalid item id: {e}")))?;
            ItemId::from_uuid(uuid)
        }
        None => ItemId::new(),
    };

    let item = InventoryItem {
        id,
        name: req.name,
        unit_price: Money::from_cents(req.unit_price_cents),
        available: req.available,
    };
    state.inventory.put(item.clone()).await?;

    Ok((StatusCode::CREATED, Json(item_response(&item))))
}

/// GET /inventory/:id — fetch an item row.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let uuid = uuid::Uuid::parse_str(&id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid item id: {e}")))?;

    let item = state
        .inventory
        .fetch(ItemId::from_uuid(uuid))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {id} not found")))?;

    Ok(Json(item_response(&item)))
}
