//! Production order models and the order state machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Actor, BomLine, Role};
use crate::error::DomainError;

/// Stage of a fabrication order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PreAccepted,
    PreConfirmed,
    CncStarted,
    CncCompleted,
    AssemblyStarted,
    AssemblyCompleted,
    DandiStarted,
    RemAccepted,
    RemConfirmed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::PreAccepted,
        OrderStatus::PreConfirmed,
        OrderStatus::CncStarted,
        OrderStatus::CncCompleted,
        OrderStatus::AssemblyStarted,
        OrderStatus::AssemblyCompleted,
        OrderStatus::DandiStarted,
        OrderStatus::RemAccepted,
        OrderStatus::RemConfirmed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PreAccepted => "pre_accepted",
            OrderStatus::PreConfirmed => "pre_confirmed",
            OrderStatus::CncStarted => "cnc_started",
            OrderStatus::CncCompleted => "cnc_completed",
            OrderStatus::AssemblyStarted => "assembly_started",
            OrderStatus::AssemblyCompleted => "assembly_completed",
            OrderStatus::DandiStarted => "dandi_started",
            OrderStatus::RemAccepted => "rem_accepted",
            OrderStatus::RemConfirmed => "rem_confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Statuses reachable in one step
    ///
    /// Assembly-Completed branches: delivery (Dandi) or straight to
    /// remaining-payment acceptance for customer pickup.
    pub fn successors(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::PreAccepted => &[OrderStatus::PreConfirmed],
            OrderStatus::PreConfirmed => &[OrderStatus::CncStarted],
            OrderStatus::CncStarted => &[OrderStatus::CncCompleted],
            OrderStatus::CncCompleted => &[OrderStatus::AssemblyStarted],
            OrderStatus::AssemblyStarted => &[OrderStatus::AssemblyCompleted],
            OrderStatus::AssemblyCompleted => {
                &[OrderStatus::DandiStarted, OrderStatus::RemAccepted]
            }
            OrderStatus::DandiStarted => &[OrderStatus::RemAccepted],
            OrderStatus::RemAccepted => &[OrderStatus::RemConfirmed],
            OrderStatus::RemConfirmed => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    /// Stages during which production draws material from stock
    pub fn consumes_material(&self) -> bool {
        matches!(
            self,
            OrderStatus::CncStarted
                | OrderStatus::CncCompleted
                | OrderStatus::AssemblyStarted
                | OrderStatus::AssemblyCompleted
                | OrderStatus::DandiStarted
        )
    }

    /// Roles allowed to move an order into this status (admins always may)
    pub fn entering_roles(&self) -> &'static [Role] {
        match self {
            OrderStatus::PreAccepted | OrderStatus::PreConfirmed | OrderStatus::RemAccepted => {
                &[Role::Sales]
            }
            OrderStatus::CncStarted
            | OrderStatus::CncCompleted
            | OrderStatus::AssemblyStarted
            | OrderStatus::AssemblyCompleted
            | OrderStatus::DandiStarted => &[Role::Production],
            OrderStatus::RemConfirmed => &[],
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OrderStatus::PreAccepted => "Pre-Accepted",
            OrderStatus::PreConfirmed => "Pre-Confirmed",
            OrderStatus::CncStarted => "CNC-Started",
            OrderStatus::CncCompleted => "CNC-Completed",
            OrderStatus::AssemblyStarted => "Assembly-Started",
            OrderStatus::AssemblyCompleted => "Assembly-Completed",
            OrderStatus::DandiStarted => "Dandi-Started",
            OrderStatus::RemAccepted => "Rem-Accepted",
            OrderStatus::RemConfirmed => "Rem-Confirmed",
        };
        write!(f, "{}", label)
    }
}

/// The returned design an order was built from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DesignSource {
    Mockup(Uuid),
    Modification(Uuid),
}

impl DesignSource {
    /// Rebuild from the two exclusive storage columns
    pub fn from_refs(mockup_id: Option<Uuid>, modification_id: Option<Uuid>) -> Option<Self> {
        match (mockup_id, modification_id) {
            (Some(id), None) => Some(DesignSource::Mockup(id)),
            (None, Some(id)) => Some(DesignSource::Modification(id)),
            _ => None,
        }
    }

    pub fn mockup_id(&self) -> Option<Uuid> {
        match self {
            DesignSource::Mockup(id) => Some(*id),
            DesignSource::Modification(_) => None,
        }
    }

    pub fn modification_id(&self) -> Option<Uuid> {
        match self {
            DesignSource::Mockup(_) => None,
            DesignSource::Modification(id) => Some(*id),
        }
    }
}

/// A cutting file attached to an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DxfFile {
    pub id: Uuid,
    pub file_name: String,
    pub stored_path: String,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
}

/// A fabrication order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_code: String,
    pub source: DesignSource,
    pub status: OrderStatus,
    pub price: Decimal,
    pub boms: Vec<BomLine>,
    pub dxf_files: Vec<DxfFile>,
    pub dxf_ready: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_bom_filled(&self) -> bool {
        !self.boms.is_empty()
    }

    fn require_editable(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::transition(format!(
                "order {} is {} and can no longer be changed",
                self.order_code, self.status
            )));
        }
        Ok(())
    }

    /// First BOM attachment; the order must not have one yet
    pub fn fill_bom(&mut self, lines: Vec<BomLine>) -> Result<(), DomainError> {
        self.require_editable()?;
        if self.is_bom_filled() {
            return Err(DomainError::transition(format!(
                "order {} already has a BOM, use editbom",
                self.order_code
            )));
        }
        self.boms = lines;
        Ok(())
    }

    /// Replace the BOM wholesale; earlier lines are discarded
    pub fn edit_bom(&mut self, lines: Vec<BomLine>) -> Result<(), DomainError> {
        self.require_editable()?;
        if !self.is_bom_filled() {
            return Err(DomainError::transition(format!(
                "order {} has no BOM yet, use fillbom",
                self.order_code
            )));
        }
        self.boms = lines;
        Ok(())
    }

    pub fn attach_dxf(&mut self, file: DxfFile) {
        self.dxf_files.push(file);
    }

    /// Remove a DXF file; removing the last one clears `dxf_ready`
    pub fn remove_dxf(&mut self, file_id: Uuid) -> Option<DxfFile> {
        let idx = self.dxf_files.iter().position(|f| f.id == file_id)?;
        let removed = self.dxf_files.remove(idx);
        if self.dxf_files.is_empty() {
            self.dxf_ready = false;
        }
        Some(removed)
    }

    /// Flip `dxf_ready` and return the new value
    pub fn toggle_dxf_ready(&mut self) -> Result<bool, DomainError> {
        if self.dxf_files.is_empty() {
            return Err(DomainError::transition(format!(
                "order {} has no DXF files",
                self.order_code
            )));
        }
        self.dxf_ready = !self.dxf_ready;
        Ok(self.dxf_ready)
    }

    /// Resolve the target of an advance request; branching stages need an
    /// explicit target
    pub fn next_status(&self, requested: Option<OrderStatus>) -> Result<OrderStatus, DomainError> {
        match (requested, self.status.successors()) {
            (_, []) => Err(DomainError::transition(format!(
                "order {} is {} which is final",
                self.order_code, self.status
            ))),
            (Some(to), successors) if successors.contains(&to) => Ok(to),
            (Some(to), _) => Err(DomainError::transition(format!(
                "order {} cannot move from {} to {}",
                self.order_code, self.status, to
            ))),
            (None, [only]) => Ok(*only),
            (None, _) => Err(DomainError::transition(format!(
                "order {} is {}; the next status must be given explicitly",
                self.order_code, self.status
            ))),
        }
    }

    /// Move the order forward one stage
    ///
    /// `pending_add_releases` is the number of unconfirmed `Add` releases
    /// tied to this order; any of them blocks leaving a material-consuming
    /// stage.
    pub fn advance(
        &mut self,
        actor: &Actor,
        requested: Option<OrderStatus>,
        pending_add_releases: usize,
        now: DateTime<Utc>,
    ) -> Result<OrderStatus, DomainError> {
        let to = self.next_status(requested)?;
        actor.require(to.entering_roles(), &format!("move orders to {}", to))?;

        if to == OrderStatus::CncStarted && !self.is_bom_filled() {
            return Err(DomainError::transition(format!(
                "order {} cannot start production without a BOM",
                self.order_code
            )));
        }

        if self.status.consumes_material() && pending_add_releases > 0 {
            return Err(DomainError::transition(format!(
                "order {} has {} unconfirmed additional release(s)",
                self.order_code, pending_add_releases
            )));
        }

        self.status = to;
        self.updated_at = now;
        Ok(to)
    }
}

/// Format a service-assigned order code: `ORD-YYYY-NNNNN`
pub fn generate_order_code(year: i32, sequence: i64) -> String {
    format!("ORD-{}-{:05}", year, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaterialKind;

    fn order(status: OrderStatus) -> Order {
        Order {
            order_code: generate_order_code(2026, 7),
            source: DesignSource::Mockup(Uuid::new_v4()),
            status,
            price: Decimal::from(1000),
            boms: vec![],
            dxf_files: vec![],
            dxf_ready: false,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line() -> BomLine {
        BomLine {
            material_id: Uuid::new_v4(),
            kind: MaterialKind::Piece,
            amount: Decimal::from(2),
            width: Decimal::ZERO,
            height: Decimal::ZERO,
            price_per_unit: Decimal::from(5),
            total_price: Decimal::from(10),
        }
    }

    fn dxf() -> DxfFile {
        DxfFile {
            id: Uuid::new_v4(),
            file_name: "letters.dxf".to_string(),
            stored_path: "uploads/dxf/letters.dxf".to_string(),
            uploaded_by: Uuid::new_v4(),
            uploaded_at: Utc::now(),
        }
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    #[test]
    fn test_order_code_format() {
        assert_eq!(generate_order_code(2026, 42), "ORD-2026-00042");
    }

    #[test]
    fn test_status_names_parse_back() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_design_source_exclusive() {
        let id = Uuid::new_v4();
        assert_eq!(DesignSource::from_refs(Some(id), None), Some(DesignSource::Mockup(id)));
        assert_eq!(
            DesignSource::from_refs(None, Some(id)),
            Some(DesignSource::Modification(id))
        );
        assert_eq!(DesignSource::from_refs(Some(id), Some(id)), None);
        assert_eq!(DesignSource::from_refs(None, None), None);
    }

    #[test]
    fn test_fill_then_edit() {
        let mut o = order(OrderStatus::PreAccepted);
        assert!(o.edit_bom(vec![line()]).is_err());
        o.fill_bom(vec![line()]).unwrap();
        assert!(o.fill_bom(vec![line()]).is_err());

        let replacement = vec![line(), line()];
        o.edit_bom(replacement.clone()).unwrap();
        assert_eq!(o.boms, replacement);
    }

    #[test]
    fn test_dxf_ready_requires_file() {
        let mut o = order(OrderStatus::CncStarted);
        assert!(o.toggle_dxf_ready().is_err());

        let file = dxf();
        let file_id = file.id;
        o.attach_dxf(file);
        assert!(o.toggle_dxf_ready().unwrap());
        assert!(!o.toggle_dxf_ready().unwrap());
        assert!(o.toggle_dxf_ready().unwrap());

        o.remove_dxf(file_id).unwrap();
        assert!(!o.dxf_ready);
    }

    #[test]
    fn test_branch_needs_explicit_target() {
        let o = order(OrderStatus::AssemblyCompleted);
        assert!(o.next_status(None).is_err());
        assert_eq!(
            o.next_status(Some(OrderStatus::RemAccepted)).unwrap(),
            OrderStatus::RemAccepted
        );
        assert!(o.next_status(Some(OrderStatus::PreConfirmed)).is_err());
    }

    #[test]
    fn test_production_requires_bom() {
        let mut o = order(OrderStatus::PreConfirmed);
        assert!(o.advance(&admin(), None, 0, Utc::now()).is_err());
        o.boms.push(line());
        assert_eq!(
            o.advance(&admin(), None, 0, Utc::now()).unwrap(),
            OrderStatus::CncStarted
        );
    }

    #[test]
    fn test_pending_add_release_blocks_consuming_stage() {
        let mut o = order(OrderStatus::CncStarted);
        o.boms.push(line());
        let err = o.advance(&admin(), None, 2, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert_eq!(o.status, OrderStatus::CncStarted);

        assert_eq!(
            o.advance(&admin(), None, 0, Utc::now()).unwrap(),
            OrderStatus::CncCompleted
        );
    }

    #[test]
    fn test_pending_releases_do_not_block_before_production() {
        let mut o = order(OrderStatus::PreAccepted);
        assert_eq!(
            o.advance(&admin(), None, 3, Utc::now()).unwrap(),
            OrderStatus::PreConfirmed
        );
    }

    #[test]
    fn test_role_gating() {
        let mut o = order(OrderStatus::PreConfirmed);
        o.boms.push(line());
        let sales = Actor::new(Uuid::new_v4(), Role::Sales);
        assert!(matches!(
            o.advance(&sales, None, 0, Utc::now()),
            Err(DomainError::Forbidden(_))
        ));
        let production = Actor::new(Uuid::new_v4(), Role::Production);
        assert!(o.advance(&production, None, 0, Utc::now()).is_ok());
    }

    #[test]
    fn test_terminal_order_is_frozen() {
        let mut o = order(OrderStatus::RemConfirmed);
        assert!(o.fill_bom(vec![line()]).is_err());
        assert!(o.advance(&admin(), None, 0, Utc::now()).is_err());
    }
}
