//! Inventory release models and confirmation rules

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Actor, Role};
use crate::error::{collect_errors, DomainError, FieldError};

/// Why material left (or moved within) stock
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    /// Consumption covered by the order's BOM
    Order,
    Maintenance,
    Sales,
    /// Consumption beyond the order's BOM estimate
    Add,
    Transfer,
    Waste,
    Damaged,
}

impl ReleaseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseReason::Order => "order",
            ReleaseReason::Maintenance => "maintenance",
            ReleaseReason::Sales => "sales",
            ReleaseReason::Add => "add",
            ReleaseReason::Transfer => "transfer",
            ReleaseReason::Waste => "waste",
            ReleaseReason::Damaged => "damaged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "order" => Some(ReleaseReason::Order),
            "maintenance" => Some(ReleaseReason::Maintenance),
            "sales" => Some(ReleaseReason::Sales),
            "add" => Some(ReleaseReason::Add),
            "transfer" => Some(ReleaseReason::Transfer),
            "waste" => Some(ReleaseReason::Waste),
            "damaged" => Some(ReleaseReason::Damaged),
            _ => None,
        }
    }

    /// Whether a release for this reason may point at the given target
    pub fn accepts_target(&self, target: &ReleaseTarget) -> bool {
        match self {
            ReleaseReason::Order | ReleaseReason::Add => matches!(target, ReleaseTarget::Order(_)),
            ReleaseReason::Maintenance => matches!(target, ReleaseTarget::Maintenance(_)),
            ReleaseReason::Sales => matches!(target, ReleaseTarget::Sale(_)),
            ReleaseReason::Transfer | ReleaseReason::Waste | ReleaseReason::Damaged => {
                matches!(target, ReleaseTarget::Stock | ReleaseTarget::Order(_))
            }
        }
    }
}

impl std::fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a release is tied to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum ReleaseTarget {
    Order(String),
    Maintenance(Uuid),
    Sale(Uuid),
    /// Plain stock movement with no related record
    Stock,
}

impl ReleaseTarget {
    pub fn order_code(&self) -> Option<&str> {
        match self {
            ReleaseTarget::Order(code) => Some(code),
            _ => None,
        }
    }

    pub fn maintenance_id(&self) -> Option<Uuid> {
        match self {
            ReleaseTarget::Maintenance(id) => Some(*id),
            _ => None,
        }
    }

    pub fn sale_id(&self) -> Option<Uuid> {
        match self {
            ReleaseTarget::Sale(id) => Some(*id),
            _ => None,
        }
    }

    /// Rebuild from nullable storage columns; at most one may be set
    pub fn from_refs(
        order_code: Option<String>,
        maintenance_id: Option<Uuid>,
        sale_id: Option<Uuid>,
    ) -> Option<Self> {
        match (order_code, maintenance_id, sale_id) {
            (Some(code), None, None) => Some(ReleaseTarget::Order(code)),
            (None, Some(id), None) => Some(ReleaseTarget::Maintenance(id)),
            (None, None, Some(id)) => Some(ReleaseTarget::Sale(id)),
            (None, None, None) => Some(ReleaseTarget::Stock),
            _ => None,
        }
    }
}

/// Input for opening a release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDraft {
    pub material_id: Uuid,
    pub reason: ReleaseReason,
    pub amount: Decimal,
    pub target: ReleaseTarget,
    pub proof_image: Option<String>,
}

impl ReleaseDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = Vec::new();
        if self.amount <= Decimal::ZERO {
            errors.push(FieldError::new("amount", "amount must be greater than 0"));
        }
        if !self.reason.accepts_target(&self.target) {
            errors.push(FieldError::new(
                "target",
                format!("a {} release cannot be tied to this target", self.reason),
            ));
        }
        collect_errors(errors)
    }
}

/// A recorded inventory movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: Uuid,
    pub material_id: Uuid,
    pub reason: ReleaseReason,
    pub amount: Decimal,
    pub target: ReleaseTarget,
    pub proof_image: Option<String>,
    pub released_by: Uuid,
    pub released_at: DateTime<Utc>,
    pub confirmed: bool,
    pub confirmed_by: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Release {
    pub fn is_pending_add_for(&self, order_code: &str) -> bool {
        self.reason == ReleaseReason::Add
            && !self.confirmed
            && self.target.order_code() == Some(order_code)
    }

    /// Confirm the release; returns `false` if it was already confirmed
    ///
    /// Confirmation is write-once: a confirmed release keeps its original
    /// confirmer and timestamp.
    pub fn confirm(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<bool, DomainError> {
        actor.require(&[Role::StockManager], "confirm releases")?;
        if self.confirmed {
            return Ok(false);
        }
        self.confirmed = true;
        self.confirmed_by = Some(actor.user_id);
        self.confirmed_at = Some(now);
        Ok(true)
    }
}

/// Count unconfirmed `Add` releases tied to an order
pub fn pending_add_releases(releases: &[Release], order_code: &str) -> usize {
    releases
        .iter()
        .filter(|r| r.is_pending_add_for(order_code))
        .count()
}

/// Confirm every pending `Add` release of an order in one step
///
/// The role check happens before anything is touched, so either all pending
/// releases flip or none do. Returns the ids that changed; an order with
/// nothing pending yields an empty list.
pub fn confirm_pending_adds(
    releases: &mut [Release],
    order_code: &str,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Vec<Uuid>, DomainError> {
    actor.require(&[Role::StockManager], "confirm releases")?;

    let mut confirmed = Vec::new();
    for release in releases.iter_mut().filter(|r| r.is_pending_add_for(order_code)) {
        if release.confirm(actor, now)? {
            confirmed.push(release.id);
        }
    }
    Ok(confirmed)
}

/// Filters accepted by release listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseFilter {
    pub confirmed: Option<bool>,
    pub released_by: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub order_code: Option<String>,
    pub maintenance_id: Option<Uuid>,
    pub material_id: Option<Uuid>,
    pub reason: Option<ReleaseReason>,
}
