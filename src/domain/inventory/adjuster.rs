use std::sync::Arc;

use futures_util::future::join_all;
use uuid::Uuid;

use super::value_objects::{DeductResult, SkipReason};
use crate::metrics::Metrics;
use crate::store::{CatalogStore, StockUpdate};

// ============================================================================
// Inventory Adjuster
// ============================================================================
//
// Decrements catalog stock for approved order lines. A deduction never fails
// the caller: every problem becomes a DeductResult::Skipped so one item's
// shortage cannot block the others. Stock is never taken below zero and a
// short item is left untouched rather than partially deducted.
//
// ============================================================================

pub struct InventoryAdjuster {
    catalog: Arc<dyn CatalogStore>,
    metrics: Arc<Metrics>,
    cas_attempts: u32,
}

impl InventoryAdjuster {
    pub fn new(catalog: Arc<dyn CatalogStore>, metrics: Arc<Metrics>, cas_attempts: u32) -> Self {
        Self {
            catalog,
            metrics,
            cas_attempts: cas_attempts.max(1),
        }
    }

    /// Deduct `quantity` units of `item_id`.
    pub async fn deduct(&self, item_id: Uuid, quantity: u64) -> DeductResult {
        let result = self.try_deduct(item_id, quantity).await;

        match &result {
            DeductResult::Applied { remaining, .. } => {
                tracing::info!(
                    item_id = %item_id,
                    quantity = quantity,
                    remaining = remaining,
                    "Stock deducted"
                );
                self.metrics.record_deduction(true, "-");
            }
            DeductResult::Skipped { reason, .. } => {
                tracing::warn!(
                    item_id = %item_id,
                    quantity = quantity,
                    reason = %reason,
                    "Stock deduction skipped"
                );
                self.metrics.record_deduction(false, reason.label());
            }
        }

        result
    }

    /// Run independent deductions concurrently, one per item.
    pub async fn deduct_all(&self, lines: &[(Uuid, u32)]) -> Vec<DeductResult> {
        join_all(
            lines
                .iter()
                .map(|(item_id, quantity)| self.deduct(*item_id, u64::from(*quantity))),
        )
        .await
    }

    async fn try_deduct(&self, item_id: Uuid, quantity: u64) -> DeductResult {
        let skipped = |reason| DeductResult::Skipped { item_id, quantity, reason };

        if quantity == 0 {
            return skipped(SkipReason::NothingToDeduct);
        }

        for attempt in 1..=self.cas_attempts {
            let item = match self.catalog.get(item_id).await {
                Ok(Some(item)) => item,
                Ok(None) => return skipped(SkipReason::NotFound),
                Err(e) => {
                    return skipped(SkipReason::StoreUnavailable { message: e.to_string() });
                }
            };

            let Some(remaining) = item.stock.checked_sub(quantity) else {
                return skipped(SkipReason::InsufficientStock {
                    available: item.stock,
                    requested: quantity,
                });
            };

            match self.catalog.compare_and_set_stock(item_id, item.stock, remaining).await {
                Ok(StockUpdate::Applied) => {
                    return DeductResult::Applied { item_id, quantity, remaining };
                }
                Ok(StockUpdate::Missing) => return skipped(SkipReason::NotFound),
                Ok(StockUpdate::Stale { current }) => {
                    tracing::debug!(
                        item_id = %item_id,
                        attempt = attempt,
                        expected = item.stock,
                        current = current,
                        "Stock changed during deduction, re-reading"
                    );
                }
                Err(e) => {
                    return skipped(SkipReason::StoreUnavailable { message: e.to_string() });
                }
            }
        }

        skipped(SkipReason::Contention)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
