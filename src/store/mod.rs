// ============================================================================
// Document Stores
// ============================================================================
//
// The approval workflow only needs two narrow contracts: an order store with
// a status-and-version compare-and-swap, and a catalog store with a stock
// compare-and-swap.
// Both are injected as trait objects so the process entry point owns their
// lifecycle.
//
// Backends:
// - memory - in-process maps, used by tests and local runs
// - scylla - ScyllaDB, conditional writes via lightweight transactions
//
// ============================================================================

mod memory;
mod scylla;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::inventory::CatalogItem;
use crate::domain::order::{Order, OrderStatus};
use crate::health::ComponentHealth;

pub use memory::{InMemoryCatalogStore, InMemoryOrderStore};
pub use scylla::{ensure_schema, ScyllaCatalogStore, ScyllaOrderStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Stored document could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a conditional order write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// The stored status no longer matches.
    Conflict { current: OrderStatus },
    /// Status matches but the document was rewritten since it was read.
    Modified { version: u64 },
    Missing,
}

/// Outcome of a conditional stock write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockUpdate {
    Applied,
    Stale { current: u64 },
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub store_name: String,
    pub city: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn for_store(store_name: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
            ..Self::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        order.store_name == self.store_name
            && self.city.as_ref().map_or(true, |city| &order.city == city)
            && self.status.map_or(true, |status| order.status == status)
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Order>>;

    /// Orders matching `filter`, newest request first.
    async fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;

    /// Insert only if no order with this id exists. Returns whether it was written.
    async fn insert(&self, order: &Order) -> StoreResult<bool>;

    /// Replace the stored document only if it still has `expected_status` and
    /// `expected_version`.
    async fn update_if_current(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        expected_version: u64,
    ) -> StoreResult<TransitionOutcome>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn check_health(&self) -> ComponentHealth;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get(&self, id: Uuid) -> StoreResult<Option<CatalogItem>>;

    /// Set stock to `new` only if it still equals `expected`.
    async fn compare_and_set_stock(&self, id: Uuid, expected: u64, new: u64) -> StoreResult<StockUpdate>;

    async fn upsert(&self, item: &CatalogItem) -> StoreResult<()>;

    async fn check_health(&self) -> ComponentHealth;
}

fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
}
