//! Domain errors raised by the order lifecycle rules

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level violation
///
/// `line` is the 1-based position inside a batch (BOM lines, stock lines)
/// when the violation belongs to one entry of that batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            line: None,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn at_line(line: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors produced by domain rules, independent of transport or storage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Client-correctable input problems; always carries every violation found
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<FieldError>),

    /// The action is not allowed from the entity's current status
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// A revision would close a loop in a modification chain
    #[error("Revision chain cycle detected at {0}")]
    RevisionCycle(uuid::Uuid),

    /// The acting user's role or assignment does not permit the action
    #[error("Permission denied: {0}")]
    Forbidden(String),
}

impl DomainError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn transition(message: impl Into<String>) -> Self {
        DomainError::InvalidTransition(message.into())
    }

    /// Field errors carried by a validation failure, empty otherwise
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            DomainError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

/// Turn a collected error list into a result
pub fn collect_errors(errors: Vec<FieldError>) -> Result<(), DomainError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_error_display() {
        let err = FieldError::at_line(1, "amount", "amount must be 0 for Areal material");
        assert_eq!(err.to_string(), "line 1: amount must be 0 for Areal material");
    }

    #[test]
    fn test_validation_message_joins_all_errors() {
        let err = DomainError::Validation(vec![
            FieldError::at_line(1, "width", "width must be greater than 0 for Areal material"),
            FieldError::new("account_id", "account is required for bank payments"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("line 1: width"));
        assert!(msg.contains("account_id: account is required"));
    }

    #[test]
    fn test_collect_errors() {
        assert!(collect_errors(vec![]).is_ok());
        let err = collect_errors(vec![FieldError::new("price", "required")]).unwrap_err();
        assert_eq!(err.field_errors().len(), 1);
    }
}
