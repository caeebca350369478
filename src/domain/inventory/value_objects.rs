use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Inventory Value Objects
// ============================================================================

/// On-hand stock of a catalog product. Owned by the catalog, only ever
/// decremented by order approval.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    pub stock: u64,
}

impl CatalogItem {
    pub fn new(id: Uuid, name: impl Into<String>, stock: u64) -> Self {
        Self {
            id,
            name: name.into(),
            stock,
        }
    }
}

/// Why a deduction left stock untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SkipReason {
    NotFound,
    InsufficientStock { available: u64, requested: u64 },
    Contention,
    StoreUnavailable { message: String },
    NothingToDeduct,
}

impl SkipReason {
    /// Stable label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::NotFound => "not_found",
            SkipReason::InsufficientStock { .. } => "insufficient_stock",
            SkipReason::Contention => "contention",
            SkipReason::StoreUnavailable { .. } => "store_unavailable",
            SkipReason::NothingToDeduct => "nothing_to_deduct",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "catalog item not found"),
            SkipReason::InsufficientStock { available, requested } => {
                write!(f, "insufficient stock: {} available, {} requested", available, requested)
            }
            SkipReason::Contention => write!(f, "stock changed concurrently too many times"),
            SkipReason::StoreUnavailable { message } => write!(f, "catalog store unavailable: {}", message),
            SkipReason::NothingToDeduct => write!(f, "nothing to deduct"),
        }
    }
}

/// Outcome of a single stock deduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeductResult {
    Applied {
        item_id: Uuid,
        quantity: u64,
        remaining: u64,
    },
    Skipped {
        item_id: Uuid,
        quantity: u64,
        reason: SkipReason,
    },
}

impl DeductResult {
    pub fn item_id(&self) -> Uuid {
        match self {
            DeductResult::Applied { item_id, .. } | DeductResult::Skipped { item_id, .. } => *item_id,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, DeductResult::Applied { .. })
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            DeductResult::Applied { .. } => None,
            DeductResult::Skipped { reason, .. } => Some(reason),
        }
    }
}
