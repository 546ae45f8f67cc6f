//! Validation utilities for the Sign Production Management platform

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{collect_errors, DomainError, FieldError};
use crate::models::{BomLine, BomLineDraft, MaterialKind};

// ============================================================================
// Bill of Materials
// ============================================================================

/// Validate a BOM batch against each material's kind
///
/// Every line is checked and all violations are returned together; nothing
/// is accepted unless the whole batch is clean. Rules:
/// - Areal: `amount == 0`, `width > 0`, `height > 0`
/// - Length / Piece: `amount > 0`, `width == 0`, `height == 0`
/// - one line per material
///
/// Totals are `amount × price_per_unit`; Areal lines keep a zero total.
pub fn validate_bom<F>(drafts: &[BomLineDraft], kind_of: F) -> Result<Vec<BomLine>, DomainError>
where
    F: Fn(Uuid) -> Option<MaterialKind>,
{
    if drafts.is_empty() {
        return Err(DomainError::invalid("boms", "BOM must contain at least one line"));
    }

    let mut errors = Vec::new();
    let mut first_seen: HashMap<Uuid, usize> = HashMap::new();
    let mut lines = Vec::with_capacity(drafts.len());

    for (idx, draft) in drafts.iter().enumerate() {
        let line_no = idx + 1;

        if let Some(first) = first_seen.get(&draft.material_id) {
            errors.push(FieldError::at_line(
                line_no,
                "material_id",
                format!("material already used on line {}", first),
            ));
        } else {
            first_seen.insert(draft.material_id, line_no);
        }

        if draft.price_per_unit < Decimal::ZERO {
            errors.push(FieldError::at_line(
                line_no,
                "price_per_unit",
                "price per unit cannot be negative",
            ));
        }

        let Some(kind) = kind_of(draft.material_id) else {
            errors.push(FieldError::at_line(
                line_no,
                "material_id",
                format!("material {} does not exist", draft.material_id),
            ));
            continue;
        };

        errors.extend(check_kind_rule(line_no, kind, draft));

        let total_price = match kind {
            MaterialKind::Areal => Decimal::ZERO,
            MaterialKind::Length | MaterialKind::Piece => {
                match draft.amount.checked_mul(draft.price_per_unit) {
                    Some(total) => total,
                    None => {
                        errors.push(FieldError::at_line(
                            line_no,
                            "price_per_unit",
                            "line total is too large",
                        ));
                        continue;
                    }
                }
            }
        };
        lines.push(BomLine {
            material_id: draft.material_id,
            kind,
            amount: draft.amount,
            width: draft.width,
            height: draft.height,
            price_per_unit: draft.price_per_unit,
            total_price,
        });
    }

    collect_errors(errors)?;
    Ok(lines)
}

fn check_kind_rule(line_no: usize, kind: MaterialKind, draft: &BomLineDraft) -> Vec<FieldError> {
    let mut errors = Vec::new();
    match kind {
        MaterialKind::Areal => {
            if !draft.amount.is_zero() {
                errors.push(FieldError::at_line(
                    line_no,
                    "amount",
                    "amount must be 0 for Areal material",
                ));
            }
            if draft.width <= Decimal::ZERO {
                errors.push(FieldError::at_line(
                    line_no,
                    "width",
                    "width must be greater than 0 for Areal material",
                ));
            }
            if draft.height <= Decimal::ZERO {
                errors.push(FieldError::at_line(
                    line_no,
                    "height",
                    "height must be greater than 0 for Areal material",
                ));
            }
        }
        MaterialKind::Length | MaterialKind::Piece => {
            if draft.amount <= Decimal::ZERO {
                errors.push(FieldError::at_line(
                    line_no,
                    "amount",
                    format!("amount must be greater than 0 for {} material", kind),
                ));
            }
            if !draft.width.is_zero() {
                errors.push(FieldError::at_line(
                    line_no,
                    "width",
                    format!("width must be 0 for {} material", kind),
                ));
            }
            if !draft.height.is_zero() {
                errors.push(FieldError::at_line(
                    line_no,
                    "height",
                    format!("height must be 0 for {} material", kind),
                ));
            }
        }
    }
    errors
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate a customer phone number (7-15 digits, optional leading +)
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let trimmed = phone.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = body.chars().filter(|c| !matches!(c, ' ' | '-')).collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("Phone number may only contain digits, spaces and dashes");
    }
    if digits.len() < 7 || digits.len() > 15 {
        return Err("Phone number must have between 7 and 15 digits");
    }
    Ok(())
}

/// Validate an order code of the form `ORD-YYYY-NNNNN`
pub fn validate_order_code(code: &str) -> Result<(), &'static str> {
    let parts: Vec<&str> = code.split('-').collect();
    if parts.len() != 3 || parts[0] != "ORD" {
        return Err("Order code must be in format ORD-YYYY-NNNNN");
    }
    if parts[1].len() != 4 || !parts[1].chars().all(|c| c.is_ascii_digit()) {
        return Err("Invalid year in order code");
    }
    if parts[2].len() < 5 || !parts[2].chars().all(|c| c.is_ascii_digit()) {
        return Err("Invalid sequence number in order code");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(material_id: Uuid, amount: i64, width: i64, height: i64) -> BomLineDraft {
        BomLineDraft {
            material_id,
            amount: Decimal::from(amount),
            width: Decimal::from(width),
            height: Decimal::from(height),
            price_per_unit: Decimal::from(12),
        }
    }

    // ========================================================================
    // BOM Validation Tests
    // ========================================================================

    #[test]
    fn test_mixed_batch_accepted() {
        let vinyl = Uuid::new_v4();
        let acrylic = Uuid::new_v4();
        let kinds: HashMap<Uuid, MaterialKind> =
            [(vinyl, MaterialKind::Length), (acrylic, MaterialKind::Areal)].into_iter().collect();

        let lines = validate_bom(
            &[draft(vinyl, 5, 0, 0), draft(acrylic, 0, 4, 3)],
            |id| kinds.get(&id).copied(),
        )
        .unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].total_price, Decimal::from(60));
        assert_eq!(lines[1].total_price, Decimal::ZERO);
        assert_eq!(lines[1].area(), Decimal::from(12));
    }

    #[test]
    fn test_areal_with_amount_rejected() {
        let acrylic = Uuid::new_v4();
        let err = validate_bom(&[draft(acrylic, 5, 4, 3)], |_| Some(MaterialKind::Areal)).unwrap_err();

        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(
            err.field_errors()[0].to_string(),
            "line 1: amount must be 0 for Areal material"
        );
    }

    #[test]
    fn test_all_line_errors_collected() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let kinds: HashMap<Uuid, MaterialKind> =
            [(a, MaterialKind::Areal), (b, MaterialKind::Piece)].into_iter().collect();

        let err = validate_bom(
            &[draft(a, 0, 0, 0), draft(b, 0, 2, 0)],
            |id| kinds.get(&id).copied(),
        )
        .unwrap_err();

        let found: Vec<(Option<usize>, &str)> = err
            .field_errors()
            .iter()
            .map(|e| (e.line, e.field.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (Some(1), "width"),
                (Some(1), "height"),
                (Some(2), "amount"),
                (Some(2), "width"),
            ]
        );
    }

    #[test]
    fn test_duplicate_material_rejected() {
        let vinyl = Uuid::new_v4();
        let err = validate_bom(
            &[draft(vinyl, 1, 0, 0), draft(vinyl, 2, 0, 0)],
            |_| Some(MaterialKind::Length),
        )
        .unwrap_err();

        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].line, Some(2));
        assert!(err.field_errors()[0].message.contains("line 1"));
    }

    #[test]
    fn test_unknown_material_rejected() {
        let err = validate_bom(&[draft(Uuid::new_v4(), 1, 0, 0)], |_| None).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "material_id");
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(validate_bom(&[], |_| Some(MaterialKind::Piece)).is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut line = draft(Uuid::new_v4(), 1, 0, 0);
        line.price_per_unit = Decimal::from(-1);
        let err = validate_bom(&[line], |_| Some(MaterialKind::Piece)).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "price_per_unit");
    }

    #[test]
    fn test_overflowing_line_total_rejected() {
        let mut line = draft(Uuid::new_v4(), 2, 0, 0);
        line.price_per_unit = Decimal::MAX;
        let err = validate_bom(&[line], |_| Some(MaterialKind::Piece)).unwrap_err();
        let errors = err.field_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "price_per_unit");
        assert_eq!(errors[0].line, Some(1));
    }

    // ========================================================================
    // General Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+251 911 234 567").is_ok());
        assert!(validate_phone("0911-234567").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn test_validate_order_code() {
        assert!(validate_order_code("ORD-2026-00042").is_ok());
        assert!(validate_order_code("ORD-2026-123456").is_ok());
        assert!(validate_order_code("ORD-26-00042").is_err());
        assert!(validate_order_code("INV-2026-00042").is_err());
        assert!(validate_order_code("ORD202600042").is_err());
    }
}
