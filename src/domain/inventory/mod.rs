// ============================================================================
// Inventory Domain - Catalog stock touched by order approval
// ============================================================================

pub mod value_objects;
pub mod adjuster;

pub use value_objects::*;
pub use adjuster::*;
