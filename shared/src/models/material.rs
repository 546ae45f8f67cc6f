//! Material catalog models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a material is measured; decides which BOM fields apply
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Sheet goods priced by surface (acrylic, aluminium composite)
    Areal,
    /// Roll goods consumed by running length (vinyl, LED strip)
    Length,
    /// Counted items (screws, power supplies)
    Piece,
}

impl MaterialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialKind::Areal => "areal",
            MaterialKind::Length => "length",
            MaterialKind::Piece => "piece",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "areal" => Some(MaterialKind::Areal),
            "length" => Some(MaterialKind::Length),
            "piece" => Some(MaterialKind::Piece),
            _ => None,
        }
    }
}

impl std::fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialKind::Areal => write!(f, "Areal"),
            MaterialKind::Length => write!(f, "Length"),
            MaterialKind::Piece => write!(f, "Piece"),
        }
    }
}

/// A catalog material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub kind: MaterialKind,
    pub available_quantity: Decimal,
    pub is_available: bool,
}

impl Material {
    /// Kind may only change while no BOM line references the material
    pub fn kind_change_allowed(&self, new_kind: MaterialKind, referenced_by_bom: bool) -> bool {
        self.kind == new_kind || !referenced_by_bom
    }

    pub fn has_stock_for(&self, amount: Decimal) -> bool {
        self.available_quantity >= amount
    }
}

/// Account partition used when selecting where a payment lands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Accounts that may receive invoiced payments
    Invoice,
    Regular,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Invoice => "invoice",
            AccountType::Regular => "regular",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(AccountType::Invoice),
            "regular" => Some(AccountType::Regular),
            _ => None,
        }
    }
}

/// A bank account payments may be deposited into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub number: String,
    pub account_type: AccountType,
}

impl Account {
    pub fn is_invoice_eligible(&self) -> bool {
        self.account_type == AccountType::Invoice
    }
}

/// Accounts selectable for a payment, given whether it is invoiced
pub fn selectable_accounts(accounts: &[Account], invoice: bool) -> Vec<&Account> {
    accounts
        .iter()
        .filter(|a| !invoice || a.is_invoice_eligible())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(kind: MaterialKind) -> Material {
        Material {
            id: Uuid::new_v4(),
            code: "ACR-3MM".to_string(),
            name: "Acrylic 3mm".to_string(),
            kind,
            available_quantity: Decimal::from(10),
            is_available: true,
        }
    }

    #[test]
    fn test_kind_round_trip_names() {
        for kind in [MaterialKind::Areal, MaterialKind::Length, MaterialKind::Piece] {
            assert_eq!(MaterialKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MaterialKind::parse("volume"), None);
    }

    #[test]
    fn test_kind_locked_once_referenced() {
        let m = material(MaterialKind::Areal);
        assert!(m.kind_change_allowed(MaterialKind::Piece, false));
        assert!(!m.kind_change_allowed(MaterialKind::Piece, true));
        assert!(m.kind_change_allowed(MaterialKind::Areal, true));
    }

    #[test]
    fn test_invoice_partition() {
        let accounts = vec![
            Account {
                id: Uuid::new_v4(),
                name: "Main".to_string(),
                number: "1000".to_string(),
                account_type: AccountType::Invoice,
            },
            Account {
                id: Uuid::new_v4(),
                name: "Petty".to_string(),
                number: "2000".to_string(),
                account_type: AccountType::Regular,
            },
        ];
        assert_eq!(selectable_accounts(&accounts, false).len(), 2);
        let invoice = selectable_accounts(&accounts, true);
        assert_eq!(invoice.len(), 1);
        assert_eq!(invoice[0].name, "Main");
    }
}
