use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use super::commands::{
    ApproveOrder, PlaceOrder, RejectOrder, DEFAULT_PARTIAL_APPROVAL_NOTE, DEFAULT_REJECTION_REASON,
};
use super::errors::OrderError;
use super::value_objects::{Order, OrderItem, OrderStatus};

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// Pure state transitions. Nothing here touches a store; the approval engine
// loads the document, asks the aggregate for the next version and persists it
// with a conditional write.
//
// ============================================================================

/// Result of computing an approval.
#[derive(Debug, Clone)]
pub struct ApprovalDecision {
    pub order: Order,
    /// Keys of the approval map that name no item of this order.
    pub unknown_items: Vec<Uuid>,
}

impl ApprovalDecision {
    /// Stock deductions implied by the decision, zero quantities excluded.
    pub fn deductions(&self) -> Vec<(Uuid, u32)> {
        self.order
            .items
            .iter()
            .filter_map(|item| match item.approved_quantity {
                Some(quantity) if quantity > 0 => Some((item.item_id, quantity)),
                _ => None,
            })
            .collect()
    }
}

impl Order {
    /// Build a new pending order.
    pub fn place(id: Uuid, command: PlaceOrder, now: DateTime<Utc>) -> Result<Self, OrderError> {
        validate_details(&command)?;

        Ok(Self {
            id,
            store_name: command.store_name,
            city: command.city,
            status: OrderStatus::Pending,
            version: 1,
            items: command.items.into_iter().map(fresh_item).collect(),
            requested_by: command.requested_by,
            requested_at: now,
            approved_at: None,
            approved_by: None,
            is_partial_approval: None,
            partial_approval_note: None,
            rejected_at: None,
            rejected_by: None,
            rejection_reason: None,
        })
    }

    pub fn ensure_pending(&self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Pending => Ok(()),
            current => Err(OrderError::InvalidState(current)),
        }
    }

    /// Replace the descriptive fields and items of a pending order.
    pub fn revise(&self, command: PlaceOrder) -> Result<Self, OrderError> {
        self.ensure_pending()?;
        validate_details(&command)?;

        let mut revised = self.next_version();
        revised.store_name = command.store_name;
        revised.city = command.city;
        revised.items = command.items.into_iter().map(fresh_item).collect();
        revised.requested_by = command.requested_by;
        Ok(revised)
    }

    /// Compute the approved version of this order.
    pub fn approve(&self, command: &ApproveOrder, now: DateTime<Utc>) -> Result<ApprovalDecision, OrderError> {
        self.ensure_pending()?;

        let partial = command.is_partial();
        let quantities = command.approved_quantities.as_ref().filter(|_| partial);

        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let requested = item.quantity;
            let approved = match quantities {
                Some(map) => map.get(&item.item_id).copied().unwrap_or(0),
                None => requested,
            };

            if approved > requested {
                return Err(OrderError::QuantityExceedsRequested {
                    item_id: item.item_id,
                    requested,
                    approved,
                });
            }

            let mut approved_item = item.clone();
            approved_item.original_quantity = Some(requested);
            approved_item.approved_quantity = Some(approved);
            approved_item.quantity = approved;
            items.push(approved_item);
        }

        let unknown_items = match quantities {
            Some(map) => {
                let known: HashSet<Uuid> = self.items.iter().map(|item| item.item_id).collect();
                let mut unknown: Vec<Uuid> = map.keys().filter(|id| !known.contains(id)).copied().collect();
                unknown.sort();
                unknown
            }
            None => Vec::new(),
        };

        let mut order = self.next_version();
        order.status = OrderStatus::Approved;
        order.items = items;
        order.approved_at = Some(now);
        order.approved_by = Some(command.approved_by.clone());
        order.is_partial_approval = Some(partial);
        order.partial_approval_note = if partial {
            Some(
                command
                    .note
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PARTIAL_APPROVAL_NOTE.to_string()),
            )
        } else {
            None
        };

        Ok(ApprovalDecision { order, unknown_items })
    }

    /// Compute the rejected version of this order.
    pub fn reject(&self, command: &RejectOrder, now: DateTime<Utc>) -> Result<Self, OrderError> {
        self.ensure_pending()?;

        let mut order = self.next_version();
        order.status = OrderStatus::Rejected;
        order.rejected_at = Some(now);
        order.rejected_by = Some(command.rejected_by.clone());
        order.rejection_reason = Some(
            command
                .reason
                .clone()
                .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
        );
        Ok(order)
    }

    fn next_version(&self) -> Self {
        let mut next = self.clone();
        next.version = self.version + 1;
        next
    }
}

fn fresh_item(mut item: OrderItem) -> OrderItem {
    item.approved_quantity = None;
    item.original_quantity = None;
    item
}

fn validate_details(command: &PlaceOrder) -> Result<(), OrderError> {
    if command.store_name.trim().is_empty() {
        return Err(OrderError::MissingField("storeName"));
    }
    if command.city.trim().is_empty() {
        return Err(OrderError::MissingField("city"));
    }
    if command.requested_by.trim().is_empty() {
        return Err(OrderError::MissingField("requestedBy"));
    }
    if command.items.is_empty() {
        return Err(OrderError::EmptyItems);
    }

    let mut seen = HashSet::new();
    for item in &command.items {
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                item_id: item.item_id,
                quantity: item.quantity,
            });
        }
        if !seen.insert(item.item_id) {
            return Err(OrderError::DuplicateItem { item_id: item.item_id });
        }
    }

    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
