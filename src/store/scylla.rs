use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use scylla::client::session::Session;
use scylla::response::query_result::QueryResult;
use scylla::value::{CqlValue, Row};
use uuid::Uuid;

use super::{
    sort_newest_first, CatalogStore, OrderFilter, OrderStore, StockUpdate, StoreError, StoreResult,
    TransitionOutcome,
};
use crate::domain::inventory::CatalogItem;
use crate::domain::order::{Order, OrderStatus};
use crate::health::{ComponentHealth, HealthStatus};

// ============================================================================
// ScyllaDB Stores
// ============================================================================
//
// Orders are kept as JSON documents next to the few columns needed for
// lookups and conditions. Every write that must not race uses a lightweight
// transaction; the first column of an LWT result is always `[applied]`,
// followed by the current values of the condition columns when it was not.
//
// ============================================================================

const SELECT_ORDER: &str = "SELECT doc FROM orders WHERE id = ?";
const SELECT_ORDERS_BY_STORE: &str = "SELECT doc FROM orders WHERE store_name = ?";
const INSERT_ORDER: &str = "INSERT INTO orders (id, store_name, city, status, version, doc, updated_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS";
const UPDATE_ORDER_IF_CURRENT: &str = "UPDATE orders \
     SET store_name = ?, city = ?, status = ?, version = ?, doc = ?, updated_at = ? \
     WHERE id = ? IF status = ? AND version = ?";
const DELETE_ORDER: &str = "DELETE FROM orders WHERE id = ? IF EXISTS";

const SELECT_CATALOG_ITEM: &str = "SELECT id, name, stock FROM catalog_items WHERE id = ?";
const UPDATE_STOCK_IF: &str = "UPDATE catalog_items SET stock = ? WHERE id = ? IF stock = ?";
const UPSERT_CATALOG_ITEM: &str = "INSERT INTO catalog_items (id, name, stock) VALUES (?, ?, ?)";

const HEALTH_PROBE: &str = "SELECT release_version FROM system.local";

/// Create keyspace, tables and index if they do not exist, then switch the
/// session to the keyspace.
pub async fn ensure_schema(session: &Session, keyspace: &str, replication_factor: u32) -> anyhow::Result<()> {
    session
        .query_unpaged(
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                 {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
                keyspace, replication_factor
            ),
            &[],
        )
        .await?;

    session.use_keyspace(keyspace, false).await?;

    session
        .query_unpaged(
            "CREATE TABLE IF NOT EXISTS orders (
                id uuid PRIMARY KEY,
                store_name text,
                city text,
                status text,
                version bigint,
                doc text,
                updated_at timestamp
            )",
            &[],
        )
        .await?;

    session
        .query_unpaged(
            "CREATE INDEX IF NOT EXISTS orders_store_name_idx ON orders (store_name)",
            &[],
        )
        .await?;

    session
        .query_unpaged(
            "CREATE TABLE IF NOT EXISTS catalog_items (
                id uuid PRIMARY KEY,
                name text,
                stock bigint
            )",
            &[],
        )
        .await?;

    tracing::info!(keyspace = %keyspace, "Schema ready");
    Ok(())
}

fn backend<E: std::fmt::Display>(error: E) -> StoreError {
    StoreError::Backend(error.to_string())
}

fn encode_order(order: &Order) -> StoreResult<String> {
    Ok(serde_json::to_string(order)?)
}

fn decode_order(doc: &str) -> StoreResult<Order> {
    Ok(serde_json::from_str(doc)?)
}

fn to_bigint(value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::UnexpectedResponse(format!("{} exceeds bigint range", value)))
}

fn from_bigint(value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::UnexpectedResponse(format!("unexpected negative value {}", value)))
}

/// Every statement issued here returns rows; anything else is a protocol surprise.
fn expect_rows<T, E: std::fmt::Display>(rows: Result<T, E>) -> StoreResult<T> {
    rows.map_err(|e| StoreError::UnexpectedResponse(format!("expected rows: {}", e)))
}

fn lwt_row(result: QueryResult) -> StoreResult<Row> {
    let rows = expect_rows(result.into_rows_result())?;
    rows.maybe_first_row::<Row>()
        .map_err(backend)?
        .ok_or_else(|| StoreError::UnexpectedResponse("empty LWT result".to_string()))
}

fn was_applied(row: &Row) -> StoreResult<bool> {
    match row.columns.first() {
        Some(Some(CqlValue::Boolean(applied))) => Ok(*applied),
        other => Err(StoreError::UnexpectedResponse(format!(
            "missing [applied] column: {:?}",
            other
        ))),
    }
}

/// A refused `IF status = ? AND version = ?` returns the current status and
/// version after `[applied]`, or nulls when the row is gone.
fn order_transition_from_row(row: &Row, expected_status: OrderStatus) -> StoreResult<TransitionOutcome> {
    if was_applied(row)? {
        return Ok(TransitionOutcome::Applied);
    }
    let current = match row.columns.get(1) {
        Some(Some(CqlValue::Text(status))) => status.parse::<OrderStatus>().map_err(StoreError::UnexpectedResponse)?,
        _ => return Ok(TransitionOutcome::Missing),
    };
    if current != expected_status {
        return Ok(TransitionOutcome::Conflict { current });
    }
    let version = match row.columns.get(2) {
        Some(Some(CqlValue::BigInt(version))) => from_bigint(*version)?,
        _ => 0,
    };
    Ok(TransitionOutcome::Modified { version })
}

fn stock_update_from_row(row: &Row) -> StoreResult<StockUpdate> {
    if was_applied(row)? {
        return Ok(StockUpdate::Applied);
    }
    match row.columns.get(1) {
        Some(Some(CqlValue::BigInt(current))) => Ok(StockUpdate::Stale {
            current: from_bigint(*current)?,
        }),
        _ => Ok(StockUpdate::Missing),
    }
}

async fn probe(session: &Session, component: &str) -> ComponentHealth {
    match session.query_unpaged(HEALTH_PROBE, &[]).await {
        Ok(_) => ComponentHealth::new(component, HealthStatus::Healthy).with_details("scylla"),
        Err(e) => ComponentHealth::new(component, HealthStatus::Unhealthy(e.to_string())).with_details("scylla"),
    }
}

// ============================================================================
// Orders
// ============================================================================

pub struct ScyllaOrderStore {
    session: Arc<Session>,
}

impl ScyllaOrderStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl OrderStore for ScyllaOrderStore {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let result = self.session.query_unpaged(SELECT_ORDER, (id,)).await.map_err(backend)?;

        let rows = expect_rows(result.into_rows_result())?;

        match rows.maybe_first_row::<(String,)>().map_err(backend)? {
            Some((doc,)) => {
                tracing::debug!(order_id = %id, "Loaded order document");
                Ok(Some(decode_order(&doc)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let result = self
            .session
            .query_unpaged(SELECT_ORDERS_BY_STORE, (filter.store_name.as_str(),))
            .await
            .map_err(backend)?;

        let rows = expect_rows(result.into_rows_result())?;

        let mut orders = Vec::new();
        for row in rows.rows::<(String,)>().map_err(backend)? {
            let (doc,) = row.map_err(backend)?;
            let order = decode_order(&doc)?;
            if filter.matches(&order) {
                orders.push(order);
            }
        }

        sort_newest_first(&mut orders);
        tracing::debug!(store_name = %filter.store_name, count = orders.len(), "Listed orders");
        Ok(orders)
    }

    async fn insert(&self, order: &Order) -> StoreResult<bool> {
        let doc = encode_order(order)?;
        let result = self
            .session
            .query_unpaged(
                INSERT_ORDER,
                (
                    order.id,
                    order.store_name.as_str(),
                    order.city.as_str(),
                    order.status.as_str(),
                    to_bigint(order.version)?,
                    doc,
                    Utc::now(),
                ),
            )
            .await
            .map_err(backend)?;

        was_applied(&lwt_row(result)?)
    }

    async fn update_if_current(
        &self,
        order: &Order,
        expected_status: OrderStatus,
        expected_version: u64,
    ) -> StoreResult<TransitionOutcome> {
        let doc = encode_order(order)?;
        let result = self
            .session
            .query_unpaged(
                UPDATE_ORDER_IF_CURRENT,
                (
                    order.store_name.as_str(),
                    order.city.as_str(),
                    order.status.as_str(),
                    to_bigint(order.version)?,
                    doc,
                    Utc::now(),
                    order.id,
                    expected_status.as_str(),
                    to_bigint(expected_version)?,
                ),
            )
            .await
            .map_err(backend)?;

        order_transition_from_row(&lwt_row(result)?, expected_status)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = self.session.query_unpaged(DELETE_ORDER, (id,)).await.map_err(backend)?;
        was_applied(&lwt_row(result)?)
    }

    async fn check_health(&self) -> ComponentHealth {
        probe(&self.session, "order_store").await
    }
}

// ============================================================================
// Catalog
// ============================================================================

pub struct ScyllaCatalogStore {
    session: Arc<Session>,
}

impl ScyllaCatalogStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl CatalogStore for ScyllaCatalogStore {
    async fn get(&self, id: Uuid) -> StoreResult<Option<CatalogItem>> {
        let result = self
            .session
            .query_unpaged(SELECT_CATALOG_ITEM, (id,))
            .await
            .map_err(backend)?;

        let rows = expect_rows(result.into_rows_result())?;

        match rows.maybe_first_row::<(Uuid, String, i64)>().map_err(backend)? {
            Some((id, name, stock)) => Ok(Some(CatalogItem {
                id,
                name,
                stock: from_bigint(stock)?,
            })),
            None => Ok(None),
        }
    }

    async fn compare_and_set_stock(&self, id: Uuid, expected: u64, new: u64) -> StoreResult<StockUpdate> {
        let result = self
            .session
            .query_unpaged(UPDATE_STOCK_IF, (to_bigint(new)?, id, to_bigint(expected)?))
            .await
            .map_err(backend)?;

        stock_update_from_row(&lwt_row(result)?)
    }

    async fn upsert(&self, item: &CatalogItem) -> StoreResult<()> {
        self.session
            .query_unpaged(
                UPSERT_CATALOG_ITEM,
                (item.id, item.name.as_str(), to_bigint(item.stock)?),
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn check_health(&self) -> ComponentHealth {
        probe(&self.session, "catalog_store").await
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
//
// Statements and LWT result mapping only; executing them needs a live node.
//
// ============================================================================
