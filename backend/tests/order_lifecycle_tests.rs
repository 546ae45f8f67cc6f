//! Order lifecycle tests
//!
//! Covers stage transitions, the BOM fill/edit split, DXF readiness and the
//! gate that pending additional releases put on production stages.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    generate_order_code, Actor, BomLine, DesignSource, DomainError, DxfFile, MaterialKind, Order,
    OrderStatus, Role,
};
use uuid::Uuid;

fn actor(role: Role) -> Actor {
    Actor::new(Uuid::new_v4(), role)
}

fn new_order() -> Order {
    let now = Utc::now();
    Order {
        order_code: generate_order_code(2026, 1),
        source: DesignSource::Mockup(Uuid::new_v4()),
        status: OrderStatus::PreAccepted,
        price: Decimal::from(1000),
        boms: Vec::new(),
        dxf_files: Vec::new(),
        dxf_ready: false,
        created_by: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
    }
}

fn piece_line(amount: i64) -> BomLine {
    BomLine {
        material_id: Uuid::new_v4(),
        kind: MaterialKind::Piece,
        amount: Decimal::from(amount),
        width: Decimal::ZERO,
        height: Decimal::ZERO,
        price_per_unit: Decimal::ONE,
        total_price: Decimal::from(amount),
    }
}

fn dxf() -> DxfFile {
    DxfFile {
        id: Uuid::new_v4(),
        file_name: "front.dxf".to_string(),
        stored_path: "dxf/2026/10/front.dxf".to_string(),
        uploaded_by: Uuid::new_v4(),
        uploaded_at: Utc::now(),
    }
}

/// Walk the order to `target` as an admin, taking the delivery branch
fn walk_to(order: &mut Order, target: OrderStatus) {
    let admin = actor(Role::Admin);
    while order.status != target {
        let next = match order.status {
            OrderStatus::AssemblyCompleted => Some(OrderStatus::DandiStarted),
            _ => None,
        };
        order.advance(&admin, next, 0, Utc::now()).unwrap();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_order_code_format() {
    assert_eq!(generate_order_code(2026, 42), "ORD-2026-00042");
}

#[test]
fn test_production_needs_bom() {
    let mut order = new_order();
    walk_to(&mut order, OrderStatus::PreConfirmed);

    let err = order
        .advance(&actor(Role::Production), None, 0, Utc::now())
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition(_)));
    assert_eq!(order.status, OrderStatus::PreConfirmed);

    order.fill_bom(vec![piece_line(2)]).unwrap();
    let to = order
        .advance(&actor(Role::Production), None, 0, Utc::now())
        .unwrap();
    assert_eq!(to, OrderStatus::CncStarted);
}

#[test]
fn test_fillbom_then_editbom_replaces_lines() {
    let mut order = new_order();
    assert!(order.edit_bom(vec![piece_line(1)]).is_err());

    order.fill_bom(vec![piece_line(1), piece_line(2)]).unwrap();
    assert!(order.fill_bom(vec![piece_line(3)]).is_err());

    let replacement = vec![piece_line(7)];
    order.edit_bom(replacement.clone()).unwrap();
    assert_eq!(order.boms, replacement);
}

#[test]
fn test_wrong_role_cannot_advance() {
    let mut order = new_order();

    let err = order
        .advance(&actor(Role::Designer), None, 0, Utc::now())
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    assert_eq!(order.status, OrderStatus::PreAccepted);
}

#[test]
fn test_branch_needs_explicit_target() {
    let mut order = new_order();
    order.fill_bom(vec![piece_line(1)]).unwrap();
    walk_to(&mut order, OrderStatus::AssemblyCompleted);

    assert!(order
        .advance(&actor(Role::Production), None, 0, Utc::now())
        .is_err());

    let to = order
        .advance(&actor(Role::Sales), Some(OrderStatus::RemAccepted), 0, Utc::now())
        .unwrap();
    assert_eq!(to, OrderStatus::RemAccepted);
}

#[test]
fn test_pending_add_release_blocks_production_stage() {
    let mut order = new_order();
    order.fill_bom(vec![piece_line(1)]).unwrap();
    walk_to(&mut order, OrderStatus::CncStarted);

    let err = order
        .advance(&actor(Role::Production), None, 2, Utc::now())
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition(_)));
    assert_eq!(order.status, OrderStatus::CncStarted);

    order
        .advance(&actor(Role::Production), None, 0, Utc::now())
        .unwrap();
    assert_eq!(order.status, OrderStatus::CncCompleted);
}

#[test]
fn test_terminal_order_is_frozen() {
    let mut order = new_order();
    order.fill_bom(vec![piece_line(1)]).unwrap();
    walk_to(&mut order, OrderStatus::RemConfirmed);

    assert!(order.status.is_terminal());
    assert!(order.advance(&actor(Role::Admin), None, 0, Utc::now()).is_err());
    assert!(order.edit_bom(vec![piece_line(3)]).is_err());
}

#[test]
fn test_dxf_ready_needs_a_file() {
    let mut order = new_order();
    assert!(order.toggle_dxf_ready().is_err());

    let file = dxf();
    order.attach_dxf(file.clone());
    assert!(order.toggle_dxf_ready().unwrap());
    assert!(!order.toggle_dxf_ready().unwrap());
    assert!(order.toggle_dxf_ready().unwrap());

    order.remove_dxf(file.id).unwrap();
    assert!(!order.dxf_ready);
}

// ============================================================================
// Property Tests
// ============================================================================

fn any_status() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::PreAccepted),
        Just(OrderStatus::PreConfirmed),
        Just(OrderStatus::CncStarted),
        Just(OrderStatus::CncCompleted),
        Just(OrderStatus::AssemblyStarted),
        Just(OrderStatus::AssemblyCompleted),
        Just(OrderStatus::DandiStarted),
        Just(OrderStatus::RemAccepted),
        Just(OrderStatus::RemConfirmed),
    ]
}

proptest! {
    /// Any sequence of requested targets only ever moves along the transition table
    #[test]
    fn prop_advance_follows_transition_table(
        requests in prop::collection::vec(prop::option::of(any_status()), 1..30)
    ) {
        let admin = actor(Role::Admin);
        let mut order = new_order();
        order.fill_bom(vec![piece_line(1)]).unwrap();

        for requested in requests {
            let before = order.status;
            match order.advance(&admin, requested, 0, Utc::now()) {
                Ok(to) => {
                    prop_assert!(before.can_transition_to(to));
                    prop_assert_eq!(order.status, to);
                }
                Err(_) => prop_assert_eq!(order.status, before),
            }
        }
    }

    /// editbom discards every earlier line
    #[test]
    fn prop_editbom_replaces_wholesale(
        first in prop::collection::vec(1i64..100, 1..10),
        second in prop::collection::vec(1i64..100, 1..10),
    ) {
        let mut order = new_order();
        order.fill_bom(first.into_iter().map(piece_line).collect()).unwrap();

        let replacement: Vec<BomLine> = second.into_iter().map(piece_line).collect();
        order.edit_bom(replacement.clone()).unwrap();

        prop_assert_eq!(order.boms, replacement);
    }

    /// Pending additional releases never let an order leave a consuming stage
    #[test]
    fn prop_pending_adds_gate_consuming_stages(status in any_status(), pending in 1usize..5) {
        let mut order = new_order();
        order.fill_bom(vec![piece_line(1)]).unwrap();
        order.status = status;

        let next = order.status.successors().first().copied();
        let result = order.advance(&actor(Role::Admin), next, pending, Utc::now());

        if status.consumes_material() || status.is_terminal() {
            prop_assert!(result.is_err());
            prop_assert_eq!(order.status, status);
        } else {
            prop_assert!(result.is_ok());
        }
    }
}
