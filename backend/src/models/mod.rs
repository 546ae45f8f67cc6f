//! Domain models for the Sign Production Management platform
//!
//! Re-exports models from the shared crate so services and handlers share one
//! vocabulary with the browser bindings

pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::{validate_bom, validate_order_code};
