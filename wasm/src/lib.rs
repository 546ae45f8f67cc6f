//! WebAssembly module for the Sign Production Management platform
//!
//! Provides client-side checks so forms can flag problems before submitting:
//! - BOM line validation against material kinds
//! - Payment split and re-pricing
//! - Wallet routing and order stage lookups
//!
//! Amounts cross the boundary as decimal strings.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

use shared::DomainError;

/// Validate BOM drafts; `kinds_json` maps material id to kind
///
/// Returns the priced lines as JSON, or a JSON array of line errors.
#[wasm_bindgen]
pub fn validate_bom_lines(drafts_json: &str, kinds_json: &str) -> Result<String, JsValue> {
    bom_lines(drafts_json, kinds_json).map_err(|e| JsValue::from_str(&e))
}

/// Split a full payment by an advance ratio
#[wasm_bindgen]
pub fn split_payment(full_payment: &str, advance_ratio: &str) -> Result<String, JsValue> {
    payment_split(full_payment, advance_ratio).map_err(|e| JsValue::from_str(&e))
}

/// Re-price an existing split, keeping its advance ratio
#[wasm_bindgen]
pub fn reprice_payment(split_json: &str, full_payment: &str) -> Result<String, JsValue> {
    repriced_split(split_json, full_payment).map_err(|e| JsValue::from_str(&e))
}

/// Wallet that receives a payment method; 0 for an unknown method
#[wasm_bindgen]
pub fn wallet_for_method(method: &str) -> i32 {
    PaymentMethod::parse(method).map_or(0, |m| m.wallet_id())
}

/// Statuses an order may move to next, as a JSON array
#[wasm_bindgen]
pub fn next_order_statuses(status: &str) -> String {
    let successors = OrderStatus::parse(status).map_or(&[][..], |s| s.successors());
    serde_json::to_string(successors).unwrap_or_else(|_| "[]".to_string())
}

fn bom_lines(drafts_json: &str, kinds_json: &str) -> Result<String, String> {
    let drafts: Vec<BomLineDraft> =
        serde_json::from_str(drafts_json).map_err(|e| format!("Invalid BOM JSON: {}", e))?;
    let kinds: HashMap<Uuid, MaterialKind> =
        serde_json::from_str(kinds_json).map_err(|e| format!("Invalid kinds JSON: {}", e))?;

    match validate_bom(&drafts, |id| kinds.get(&id).copied()) {
        Ok(lines) => serde_json::to_string(&lines).map_err(|e| e.to_string()),
        Err(DomainError::Validation(errors)) => {
            Err(serde_json::to_string(&errors).unwrap_or_else(|e| e.to_string()))
        }
        Err(other) => Err(other.to_string()),
    }
}

fn payment_split(full_payment: &str, advance_ratio: &str) -> Result<String, String> {
    let full = parse_decimal("full_payment", full_payment)?;
    let ratio = parse_decimal("advance_ratio", advance_ratio)?;
    let split = PaymentSplit::from_ratio(full, ratio).map_err(|e| e.to_string())?;
    serde_json::to_string(&split).map_err(|e| e.to_string())
}

fn repriced_split(split_json: &str, full_payment: &str) -> Result<String, String> {
    let split: PaymentSplit =
        serde_json::from_str(split_json).map_err(|e| format!("Invalid split JSON: {}", e))?;
    let full = parse_decimal("full_payment", full_payment)?;
    let repriced = split.with_full_payment(full).map_err(|e| e.to_string())?;
    serde_json::to_string(&repriced).map_err(|e| e.to_string())
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("{} is not a number: {}", field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bom_lines_prices_counted_material() {
        let vinyl = Uuid::new_v4();
        let drafts = format!(
            r#"[{{"material_id":"{}","amount":"5","width":"0","height":"0","price_per_unit":"2"}}]"#,
            vinyl
        );
        let kinds = format!(r#"{{"{}":"length"}}"#, vinyl);

        let lines: Vec<BomLine> = serde_json::from_str(&bom_lines(&drafts, &kinds).unwrap()).unwrap();
        assert_eq!(lines[0].total_price, Decimal::from(10));
    }

    #[test]
    fn test_bom_lines_reports_line_errors() {
        let acrylic = Uuid::new_v4();
        let drafts = format!(
            r#"[{{"material_id":"{}","amount":"5","width":"4","height":"3","price_per_unit":"1"}}]"#,
            acrylic
        );
        let kinds = format!(r#"{{"{}":"areal"}}"#, acrylic);

        let errors = bom_lines(&drafts, &kinds).unwrap_err();
        assert!(errors.contains("amount must be 0 for Areal material"));
        assert!(errors.contains(r#""line":1"#));
    }

    #[test]
    fn test_split_and_reprice() {
        let split = payment_split("1000", "0.4").unwrap();
        let repriced: PaymentSplit =
            serde_json::from_str(&repriced_split(&split, "2000").unwrap()).unwrap();
        assert_eq!(repriced.advance_payment, Decimal::from(800));
        assert_eq!(repriced.remaining_payment, Decimal::from(1200));

        assert!(payment_split("abc", "0.4").is_err());
        assert!(payment_split("1000", "1.5").is_err());
    }

    #[test]
    fn test_wallet_for_method() {
        assert_eq!(wallet_for_method("cash"), 2);
        assert_eq!(wallet_for_method("bank"), 1);
        assert_eq!(wallet_for_method("check"), 1);
        assert_eq!(wallet_for_method("barter"), 0);
    }

    #[test]
    fn test_next_order_statuses() {
        assert_eq!(
            next_order_statuses("assembly_completed"),
            r#"["dandi_started","rem_accepted"]"#
        );
        assert_eq!(next_order_statuses("rem_confirmed"), "[]");
        assert_eq!(next_order_statuses("unknown"), "[]");
    }
}
