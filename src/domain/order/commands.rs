use std::collections::HashMap;
use uuid::Uuid;
use super::value_objects::OrderItem;

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

pub const DEFAULT_PARTIAL_APPROVAL_NOTE: &str = "Partial quantities approved";
pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";

/// Create a new pending order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub store_name: String,
    pub city: String,
    pub items: Vec<OrderItem>,
    pub requested_by: String,
}

/// Approve a pending order.
///
/// An absent or empty `approved_quantities` is a full approval. A non-empty map
/// is a partial approval even when it covers every item at its requested
/// quantity; items missing from the map are approved at zero.
#[derive(Debug, Clone, Default)]
pub struct ApproveOrder {
    pub approved_quantities: Option<HashMap<Uuid, u32>>,
    pub approved_by: String,
    pub note: Option<String>,
}

impl ApproveOrder {
    pub fn full(approved_by: impl Into<String>) -> Self {
        Self {
            approved_quantities: None,
            approved_by: approved_by.into(),
            note: None,
        }
    }

    pub fn partial(approved_by: impl Into<String>, quantities: HashMap<Uuid, u32>) -> Self {
        Self {
            approved_quantities: Some(quantities),
            approved_by: approved_by.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_partial(&self) -> bool {
        self.approved_quantities
            .as_ref()
            .is_some_and(|quantities| !quantities.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RejectOrder {
    pub rejected_by: String,
    pub reason: Option<String>,
}

impl RejectOrder {
    pub fn new(rejected_by: impl Into<String>) -> Self {
        Self {
            rejected_by: rejected_by.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
