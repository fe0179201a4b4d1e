//! Inventory storage.

use async_trait::async_trait;
use common::{ItemId, Money};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A stocked catalog item.
///
/// `available` is mutated only while the caller holds the distributed
/// lock for the item's key; the store additionally write-locks the row,
/// since the distributed lock only coordinates this service's own
/// processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub unit_price: Money,
    pub available: u32,
}

/// Trait for durable, row-lockable inventory storage.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Inserts or replaces an item row.
    async fn put(&self, item: InventoryItem) -> Result<()>;

    /// Fetches an item row without locking it.
    async fn fetch(&self, item_id: ItemId) -> Result<Option<InventoryItem>>;

    /// Verifies and decrements available quantity under a row-level
    /// write lock, persisting synchronously. Returns the row as read
    /// under the lock (the price-at-purchase snapshot source), with
    /// `available` reflecting the decrement.
    ///
    /// Fails with `InsufficientStock` or `ItemNotFound`; on failure the
    /// row is unchanged.
    async fn reserve(&self, item_id: ItemId, quantity: u32) -> Result<InventoryItem>;

    /// Compensating increment: restores quantity reserved by a request
    /// that subsequently failed.
    async fn restore(&self, item_id: ItemId, quantity: u32) -> Result<()>;
}
