use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    sort_newest_first, CatalogStore, OrderFilter, OrderStore, StockUpdate, StoreResult,
    TransitionOutcome,
};
use crate::domain::inventory::CatalogItem;
use crate::domain::order::{Order, OrderStatus};
use crate::health::{ComponentHealth, HealthStatus};

// ============================================================================
// In-Memory Stores
// ============================================================================
//
// Each call takes the write lock for its whole read-modify-write, which gives
// the same single-document atomicity the database backend gets from LWTs.
//
// ============================================================================

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect();
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn insert(&self, order: &Order) -> StoreResult<bool> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Ok(false);
        }
        orders.insert(order.id, order.clone());
        Ok(true)
    }

    async fn update_if_current(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        expected_version: u64,
    ) -> StoreResult<TransitionOutcome> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.id) {
            None => Ok(TransitionOutcome::Missing),
            Some(stored) if stored.status != expected_status => Ok(TransitionOutcome::Conflict {
                current: stored.status,
            }),
            Some(stored) if stored.version != expected_version => Ok(TransitionOutcome::Modified {
                version: stored.version,
            }),
            Some(stored) => {
                *stored = order.clone();
                Ok(TransitionOutcome::Applied)
            }
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.orders.write().await.remove(&id).is_some())
    }

    async fn check_health(&self) -> ComponentHealth {
        ComponentHealth::new("order_store", HealthStatus::Healthy).with_details("in-memory")
    }
}

#[derive(Default)]
pub struct InMemoryCatalogStore {
    items: RwLock<HashMap<Uuid, CatalogItem>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let items = items.into_iter().map(|item| (item.id, item)).collect();
        Self {
            items: RwLock::new(items),
        }
    }

    pub async fn stock_of(&self, id: Uuid) -> Option<u64> {
        self.items.read().await.get(&id).map(|item| item.stock)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get(&self, id: Uuid) -> StoreResult<Option<CatalogItem>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn compare_and_set_stock(&self, id: Uuid, expected: u64, new: u64) -> StoreResult<StockUpdate> {
        let mut items = self.items.write().await;
        match items.get_mut(&id) {
            None => Ok(StockUpdate::Missing),
            Some(item) if item.stock != expected => Ok(StockUpdate::Stale { current: item.stock }),
            Some(item) => {
                item.stock = new;
                Ok(StockUpdate::Applied)
            }
        }
    }

    async fn upsert(&self, item: &CatalogItem) -> StoreResult<()> {
        self.items.write().await.insert(item.id, item.clone());
        Ok(())
    }

    async fn check_health(&self) -> ComponentHealth {
        ComponentHealth::new("catalog_store", HealthStatus::Healthy).with_details("in-memory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderItem, PlaceOrder};
    use chrono::Utc;

    fn pending_order() -> Order {
        Order::place(
            Uuid::new_v4(),
            PlaceOrder {
                store_name: "Central".to_string(),
                city: "Lagos".to_string(),
                items: vec![OrderItem::new(Uuid::new_v4(), "Insulin", "hormone", 2)],
                requested_by: "clerk".to_string(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_is_create_only() {
        let store = InMemoryOrderStore::new();
        let order = pending_order();

        assert!(store.insert(&order).await.unwrap());
        assert!(!store.insert(&order).await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_compares_current_status() {
        let store = InMemoryOrderStore::new();
        let order = pending_order();
        store.insert(&order).await.unwrap();

        let mut approved = order.clone();
        approved.status = OrderStatus::Approved;
        approved.version = order.version + 1;

        let first = store
            .update_if_current(&approved, OrderStatus::Pending, order.version)
            .await
            .unwrap();
        assert_eq!(first, TransitionOutcome::Applied);

        let second = store
            .update_if_current(&approved, OrderStatus::Pending, order.version)
            .await
            .unwrap();
        assert_eq!(second, TransitionOutcome::Conflict { current: OrderStatus::Approved });

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Approved);
    }

    #[tokio::test]
    async fn test_update_compares_version() {
        let store = InMemoryOrderStore::new();
        let order = pending_order();
        store.insert(&order).await.unwrap();

        let mut revised = order.clone();
        revised.version = order.version + 1;
        revised.items[0].quantity = 1;
        let outcome = store
            .update_if_current(&revised, OrderStatus::Pending, order.version)
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);

        // A writer still holding the first version must not clobber the revision
        let mut stale = order.clone();
        stale.version = order.version + 1;
        let outcome = store
            .update_if_current(&stale, OrderStatus::Pending, order.version)
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Modified { version: revised.version });

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let store = InMemoryOrderStore::new();
        let outcome = store
            .update_if_current(&pending_order(), OrderStatus::Pending, 1)
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Missing);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryOrderStore::new();
        let order = pending_order();
        store.insert(&order).await.unwrap();

        assert!(store.delete(order.id).await.unwrap());
        assert!(!store.delete(order.id).await.unwrap());
        assert!(store.get(order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stock_compare_and_set() {
        let id = Uuid::new_v4();
        let store = InMemoryCatalogStore::with_items([CatalogItem::new(id, "Insulin", 10)]);

        assert_eq!(store.compare_and_set_stock(id, 10, 4).await.unwrap(), StockUpdate::Applied);
        assert_eq!(
            store.compare_and_set_stock(id, 10, 0).await.unwrap(),
            StockUpdate::Stale { current: 4 }
        );
        assert_eq!(
            store.compare_and_set_stock(Uuid::new_v4(), 1, 0).await.unwrap(),
            StockUpdate::Missing
        );
        assert_eq!(store.stock_of(id).await, Some(4));
    }
}
