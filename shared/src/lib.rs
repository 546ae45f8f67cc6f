//! Shared types and models for the Sign Production Management platform
//!
//! This crate holds the order lifecycle domain: material catalog, BOM
//! validation, design request and order state machines, release
//! reconciliation and payment splitting. It is used by the backend and,
//! via WASM, by the browser client.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
