//! Direct sales and maintenance records; both consume stock through releases

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ReleaseDraft, ReleaseReason, ReleaseTarget};
use crate::error::{collect_errors, DomainError, FieldError};

/// One material drawn by a sale or maintenance job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockLine {
    pub material_id: Uuid,
    pub amount: Decimal,
}

/// Check a batch of stock lines, reporting every bad line
pub fn validate_stock_lines(lines: &[StockLine]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::invalid("lines", "at least one line is required"));
    }
    let errors = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.amount <= Decimal::ZERO)
        .map(|(i, _)| FieldError::at_line(i + 1, "amount", "amount must be greater than 0"))
        .collect();
    collect_errors(errors)
}

fn drafts_for(lines: &[StockLine], reason: ReleaseReason, target: ReleaseTarget) -> Vec<ReleaseDraft> {
    lines
        .iter()
        .map(|l| ReleaseDraft {
            material_id: l.material_id,
            reason,
            amount: l.amount,
            target: target.clone(),
            proof_image: None,
        })
        .collect()
}

/// Material sold over the counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub customer_name: String,
    pub lines: Vec<StockLine>,
    pub total_price: Decimal,
    pub sold_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn release_drafts(&self) -> Vec<ReleaseDraft> {
        drafts_for(&self.lines, ReleaseReason::Sales, ReleaseTarget::Sale(self.id))
    }
}

/// Material used to maintain equipment or premises
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maintenance {
    pub id: Uuid,
    pub description: String,
    pub lines: Vec<StockLine>,
    pub requested_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Maintenance {
    pub fn release_drafts(&self) -> Vec<ReleaseDraft> {
        drafts_for(
            &self.lines,
            ReleaseReason::Maintenance,
            ReleaseTarget::Maintenance(self.id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_lines_report_each_bad_line() {
        let lines = vec![
            StockLine { material_id: Uuid::new_v4(), amount: Decimal::from(1) },
            StockLine { material_id: Uuid::new_v4(), amount: Decimal::ZERO },
            StockLine { material_id: Uuid::new_v4(), amount: Decimal::from(-2) },
        ];
        let err = validate_stock_lines(&lines).unwrap_err();
        let lines: Vec<Option<usize>> = err.field_errors().iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![Some(2), Some(3)]);
    }

    #[test]
    fn test_maintenance_emits_one_release_per_line() {
        let m = Maintenance {
            id: Uuid::new_v4(),
            description: "Replace router bit".to_string(),
            lines: vec![
                StockLine { material_id: Uuid::new_v4(), amount: Decimal::from(1) },
                StockLine { material_id: Uuid::new_v4(), amount: Decimal::from(4) },
            ],
            requested_by: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let drafts = m.release_drafts();
        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|d| d.validate().is_ok()));
        assert!(drafts
            .iter()
            .all(|d| d.target == ReleaseTarget::Maintenance(m.id)));
    }
}
