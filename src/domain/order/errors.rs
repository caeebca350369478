use uuid::Uuid;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Order is not pending (current status: {0})")]
    InvalidState(OrderStatus),

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid quantity {quantity} for item {item_id}")]
    InvalidQuantity { item_id: Uuid, quantity: u32 },

    #[error("Item {item_id} appears more than once in the order")]
    DuplicateItem { item_id: Uuid },

    #[error("Approved quantity {approved} for item {item_id} exceeds requested quantity {requested}")]
    QuantityExceedsRequested {
        item_id: Uuid,
        requested: u32,
        approved: u32,
    },

    #[error("Field '{0}' is required")]
    MissingField(&'static str),
}

impl OrderError {
    /// Status errors are reported separately from malformed input.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, OrderError::InvalidState(_))
    }
}
