//! Caller identity and roles

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Roles that gate lifecycle transitions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Sales,
    Designer,
    StockManager,
    Production,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sales => "sales",
            Role::Designer => "designer",
            Role::StockManager => "stock_manager",
            Role::Production => "production",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sales" => Some(Role::Sales),
            "designer" => Some(Role::Designer),
            "stock_manager" => Some(Role::StockManager),
            "production" => Some(Role::Production),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Sales => write!(f, "Sales"),
            Role::Designer => write!(f, "Designer"),
            Role::StockManager => write!(f, "Stock Manager"),
            Role::Production => write!(f, "Production"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

/// The user performing a mutating operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Admins pass every role check
    pub fn require(&self, allowed: &[Role], action: &str) -> Result<(), DomainError> {
        if self.role == Role::Admin || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!(
                "{} may not {}",
                self.role, action
            )))
        }
    }
}
