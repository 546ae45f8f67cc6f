//! Release confirmation tests
//!
//! Covers the batch confirmation of an order's additional releases, write-once
//! confirmation, and target rules per reason.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    confirm_pending_adds, pending_add_releases, Actor, DomainError, Release, ReleaseDraft,
    ReleaseReason, ReleaseTarget, Role,
};
use uuid::Uuid;

const ORDER: &str = "ORD-2026-00007";

fn stock_manager() -> Actor {
    Actor::new(Uuid::new_v4(), Role::StockManager)
}

fn release(reason: ReleaseReason, target: ReleaseTarget) -> Release {
    Release {
        id: Uuid::new_v4(),
        material_id: Uuid::new_v4(),
        reason,
        amount: Decimal::from(3),
        target,
        proof_image: None,
        released_by: Uuid::new_v4(),
        released_at: Utc::now(),
        confirmed: false,
        confirmed_by: None,
        confirmed_at: None,
    }
}

fn add_for(order_code: &str) -> Release {
    release(ReleaseReason::Add, ReleaseTarget::Order(order_code.to_string()))
}

#[test]
fn test_two_add_releases_confirmed_together_then_noop() {
    let manager = stock_manager();
    let mut releases = vec![add_for(ORDER), add_for(ORDER)];
    assert_eq!(pending_add_releases(&releases, ORDER), 2);

    let first_at = Utc::now();
    let confirmed = confirm_pending_adds(&mut releases, ORDER, &manager, first_at).unwrap();
    assert_eq!(confirmed.len(), 2);
    assert!(releases.iter().all(|r| r.confirmed));
    assert_eq!(pending_add_releases(&releases, ORDER), 0);

    let again = confirm_pending_adds(
        &mut releases,
        ORDER,
        &manager,
        first_at + Duration::minutes(5),
    )
    .unwrap();
    assert!(again.is_empty());
    assert!(releases.iter().all(|r| r.confirmed_at == Some(first_at)));
}

#[test]
fn test_only_stock_manager_confirms() {
    let mut releases = vec![add_for(ORDER)];
    let production = Actor::new(Uuid::new_v4(), Role::Production);

    let err = confirm_pending_adds(&mut releases, ORDER, &production, Utc::now()).unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    assert!(!releases[0].confirmed);
}

#[test]
fn test_confirm_keeps_first_confirmer() {
    let first = stock_manager();
    let second = stock_manager();
    let mut r = add_for(ORDER);

    assert!(r.confirm(&first, Utc::now()).unwrap());
    assert!(!r.confirm(&second, Utc::now()).unwrap());
    assert_eq!(r.confirmed_by, Some(first.user_id));
}

#[test]
fn test_other_orders_are_untouched() {
    let mut releases = vec![add_for(ORDER), add_for("ORD-2026-00008")];

    let confirmed = confirm_pending_adds(&mut releases, ORDER, &stock_manager(), Utc::now()).unwrap();

    assert_eq!(confirmed, vec![releases[0].id]);
    assert!(!releases[1].confirmed);
}

#[test]
fn test_draft_target_rules() {
    let draft = |reason, target| ReleaseDraft {
        material_id: Uuid::new_v4(),
        reason,
        amount: Decimal::ONE,
        target,
        proof_image: None,
    };

    assert!(draft(ReleaseReason::Add, ReleaseTarget::Order(ORDER.into()))
        .validate()
        .is_ok());
    assert!(draft(ReleaseReason::Add, ReleaseTarget::Stock).validate().is_err());
    assert!(draft(ReleaseReason::Maintenance, ReleaseTarget::Maintenance(Uuid::new_v4()))
        .validate()
        .is_ok());
    assert!(draft(ReleaseReason::Waste, ReleaseTarget::Stock).validate().is_ok());
    assert!(draft(ReleaseReason::Sales, ReleaseTarget::Order(ORDER.into()))
        .validate()
        .is_err());
}

#[test]
fn test_target_from_refs_rejects_two_targets() {
    assert_eq!(
        ReleaseTarget::from_refs(None, None, None),
        Some(ReleaseTarget::Stock)
    );
    assert!(ReleaseTarget::from_refs(Some(ORDER.into()), Some(Uuid::new_v4()), None).is_none());
}

// ============================================================================
// Property Tests
// ============================================================================

fn any_release() -> impl Strategy<Value = Release> {
    let reason = prop_oneof![
        Just(ReleaseReason::Order),
        Just(ReleaseReason::Add),
        Just(ReleaseReason::Waste),
    ];
    let order = prop_oneof![Just(ORDER), Just("ORD-2026-00099")];
    (reason, order, any::<bool>()).prop_map(|(reason, code, confirmed)| {
        let mut r = release(reason, ReleaseTarget::Order(code.to_string()));
        r.confirmed = confirmed;
        r
    })
}

proptest! {
    /// One call confirms exactly the pending additions; a second changes nothing
    #[test]
    fn prop_confirmation_is_idempotent(mut releases in prop::collection::vec(any_release(), 0..20)) {
        let manager = stock_manager();
        let pending = pending_add_releases(&releases, ORDER);
        let before: Vec<bool> = releases.iter().map(|r| r.confirmed).collect();

        let confirmed = confirm_pending_adds(&mut releases, ORDER, &manager, Utc::now()).unwrap();
        prop_assert_eq!(confirmed.len(), pending);
        prop_assert_eq!(pending_add_releases(&releases, ORDER), 0);

        for (r, was) in releases.iter().zip(before) {
            if !r.is_pending_add_for(ORDER) && !confirmed.contains(&r.id) {
                prop_assert_eq!(r.confirmed, was);
            }
        }

        let snapshot: Vec<bool> = releases.iter().map(|r| r.confirmed).collect();
        let again = confirm_pending_adds(&mut releases, ORDER, &manager, Utc::now()).unwrap();
        prop_assert!(again.is_empty());
        prop_assert_eq!(releases.iter().map(|r| r.confirmed).collect::<Vec<_>>(), snapshot);
    }
}
