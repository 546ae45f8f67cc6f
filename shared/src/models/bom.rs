//! Bill-of-materials line models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MaterialKind;

/// A BOM line as submitted by the client, before validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomLineDraft {
    pub material_id: Uuid,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub width: Decimal,
    #[serde(default)]
    pub height: Decimal,
    #[serde(default)]
    pub price_per_unit: Decimal,
}

/// A validated BOM line attached to an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomLine {
    pub material_id: Uuid,
    pub kind: MaterialKind,
    pub amount: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub price_per_unit: Decimal,
    /// `amount × price_per_unit`; always zero for Areal lines, whose price is
    /// derived from surface further down the pricing pipeline
    pub total_price: Decimal,
}

impl BomLine {
    /// Surface covered by an Areal line (zero for other kinds)
    pub fn area(&self) -> Decimal {
        match self.kind {
            MaterialKind::Areal => self.width.saturating_mul(self.height),
            _ => Decimal::ZERO,
        }
    }
}

/// Sum of the unit-priced line totals; `None` if the sum overflows
pub fn bom_total(lines: &[BomLine]) -> Option<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.total_price))
}
