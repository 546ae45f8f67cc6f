//! HTTP handlers for the Sign Production Management API

pub mod attachment;
pub mod container;
pub mod health;
pub mod lead;
pub mod material;
pub mod mockup;
pub mod order;
pub mod release;
pub mod stock;
pub mod upload;

pub use attachment::*;
pub use container::*;
pub use health::*;
pub use lead::*;
pub use material::*;
pub use mockup::*;
pub use order::*;
pub use release::*;
pub use stock::*;

use axum::http::Uri;

use crate::error::{AppError, AppResult};
use crate::models::{validate_order_code, Page, PageParams};

/// Wrap a result slice in a page whose links point back at the request URI
pub(crate) fn page_for<T>(results: Vec<T>, count: u64, params: PageParams, uri: &Uri) -> Page<T> {
    Page::new(results, count, params, uri.path(), uri.query())
}

/// Reject a malformed order code taken from the path
pub(crate) fn order_code_param(code: String) -> AppResult<String> {
    validate_order_code(&code).map_err(|msg| AppError::validation("order_code", msg))?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_code_param() {
        assert_eq!(order_code_param("ORD-2026-00042".to_string()).unwrap(), "ORD-2026-00042");

        let err = order_code_param("ORD-26-1".to_string()).unwrap_err();
        match err {
            AppError::Validation { field, message } => {
                assert_eq!(field, "order_code");
                assert_eq!(message, "Invalid year in order code");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(order_code_param("../orders".to_string()).is_err());
    }
}
