// ============================================================================
// Order Domain - Approval workflow for store replenishment orders
// ============================================================================
//
// - Value objects (Order, OrderItem, OrderStatus)
// - Commands (PlaceOrder, ApproveOrder, RejectOrder)
// - Errors (OrderError enum)
// - Aggregate (pure pending -> approved/rejected transitions)
// - Approval engine (store + inventory orchestration)
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod approval;

// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use approval::*;
