// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// order     - order documents and the approval state machine
// inventory - catalog stock and best-effort deductions
//
// Stores are reached only through the traits in crate::store.
//
// ============================================================================

pub mod order;
pub mod inventory;
