use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use super::commands::{ApproveOrder, RejectOrder};
use super::errors::OrderError;
use super::value_objects::Order;
use crate::domain::inventory::{DeductResult, InventoryAdjuster};
use crate::metrics::Metrics;
use crate::store::{OrderStore, StoreError, TransitionOutcome};

// ============================================================================
// Approval Engine
// ============================================================================
//
// Orchestrates: load -> aggregate decision -> conditional write -> deductions
//
// The write is conditional on the order still being `pending` at the version
// that was read, so of two racing calls exactly one transitions the order and
// only that one touches inventory. A revision that lands between the read and
// the write makes the call fail instead of approving stale items. Deductions run after the order is persisted and are best-effort
// per item; their failures never undo the approval.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order {0} was modified concurrently")]
    Modified(Uuid),

    #[error(transparent)]
    Rule(#[from] OrderError),

    #[error("Order store failure: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub order: Order,
    pub deductions: Vec<DeductResult>,
}

impl ApprovalOutcome {
    pub fn skipped(&self) -> impl Iterator<Item = &DeductResult> {
        self.deductions.iter().filter(|d| !d.is_applied())
    }
}

pub struct ApprovalEngine {
    orders: Arc<dyn OrderStore>,
    inventory: Arc<InventoryAdjuster>,
    metrics: Arc<Metrics>,
}

impl ApprovalEngine {
    pub fn new(orders: Arc<dyn OrderStore>, inventory: Arc<InventoryAdjuster>, metrics: Arc<Metrics>) -> Self {
        Self {
            orders,
            inventory,
            metrics,
        }
    }

    /// Approve a pending order, fully or partially, and deduct approved stock.
    pub async fn approve(&self, order_id: Uuid, command: ApproveOrder) -> Result<ApprovalOutcome, ApprovalError> {
        let started = Instant::now();
        let order = self.load(order_id).await?;

        let decision = order
            .approve(&command, Utc::now())
            .map_err(|e| self.refused("approve", e))?;

        for unknown in &decision.unknown_items {
            tracing::warn!(
                order_id = %order_id,
                item_id = %unknown,
                "Approved quantity given for an item not in the order, ignoring"
            );
        }

        self.persist_transition("approve", &order, &decision.order).await?;

        let partial = command.is_partial();
        self.metrics.record_approval(partial);
        tracing::info!(
            order_id = %order_id,
            approved_by = %command.approved_by,
            partial = partial,
            "Order approved"
        );

        let deductions = self.inventory.deduct_all(&decision.deductions()).await;
        let outcome = ApprovalOutcome {
            order: decision.order,
            deductions,
        };

        let skipped = outcome.skipped().count();
        if skipped > 0 {
            tracing::warn!(
                order_id = %order_id,
                skipped = skipped,
                "Order approved but some stock deductions were skipped"
            );
        }

        self.metrics
            .observe_duration("approve", started.elapsed().as_secs_f64());
        Ok(outcome)
    }

    /// Reject a pending order. No inventory side effects.
    pub async fn reject(&self, order_id: Uuid, command: RejectOrder) -> Result<Order, ApprovalError> {
        let started = Instant::now();
        let order = self.load(order_id).await?;

        let rejected = order
            .reject(&command, Utc::now())
            .map_err(|e| self.refused("reject", e))?;

        self.persist_transition("reject", &order, &rejected).await?;

        self.metrics.record_rejection();
        tracing::info!(
            order_id = %order_id,
            rejected_by = %command.rejected_by,
            reason = ?rejected.rejection_reason,
            "Order rejected"
        );

        self.metrics
            .observe_duration("reject", started.elapsed().as_secs_f64());
        Ok(rejected)
    }

    async fn load(&self, order_id: Uuid) -> Result<Order, ApprovalError> {
        match self.orders.get(order_id).await {
            Ok(Some(order)) => Ok(order),
            Ok(None) => Err(ApprovalError::NotFound(order_id)),
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Failed to load order");
                Err(e.into())
            }
        }
    }

    async fn persist_transition(&self, operation: &str, read: &Order, next: &Order) -> Result<(), ApprovalError> {
        let outcome = self
            .orders
            .update_if_current(next, read.status, read.version)
            .await
            .map_err(|e| {
                tracing::error!(order_id = %next.id, operation = operation, error = %e, "Failed to persist order");
                ApprovalError::from(e)
            })?;

        match outcome {
            TransitionOutcome::Applied => Ok(()),
            TransitionOutcome::Conflict { current } => {
                tracing::info!(
                    order_id = %next.id,
                    operation = operation,
                    current = %current,
                    "Order left pending concurrently"
                );
                Err(self.refused(operation, OrderError::InvalidState(current)).into())
            }
            TransitionOutcome::Modified { version } => {
                tracing::info!(
                    order_id = %next.id,
                    operation = operation,
                    read_version = read.version,
                    current_version = version,
                    "Order revised concurrently"
                );
                self.metrics.record_refused_transition(operation, "modified");
                Err(ApprovalError::Modified(next.id))
            }
            TransitionOutcome::Missing => Err(ApprovalError::NotFound(next.id)),
        }
    }

    fn refused(&self, operation: &str, error: OrderError) -> OrderError {
        if let OrderError::InvalidState(current) = &error {
            self.metrics.record_refused_transition(operation, current.as_str());
        }
        error
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
