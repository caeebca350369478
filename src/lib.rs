//! Pharmacy order approval service.
//!
//! Stores submit medication orders; an approver approves them in full or in
//! part, or rejects them. Approval deducts catalog stock item by item on a
//! best-effort basis.

pub mod api;
pub mod config;
pub mod domain;
pub mod health;
pub mod metrics;
pub mod store;
pub mod utils;
