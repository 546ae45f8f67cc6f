//! Payment split tests
//!
//! Covers the advance/remaining split, re-pricing with a preserved ratio,
//! wallet routing and the evidence each payment method requires.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    round_currency, PaymentDetails, PaymentMethod, PaymentSplit, BANK_WALLET_ID, CASH_WALLET_ID,
    DEFAULT_ADVANCE_RATIO,
};
use uuid::Uuid;

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

#[test]
fn test_reprice_1000_to_2000_keeps_ratio() {
    let split = PaymentSplit::from_ratio(dec(1000), DEFAULT_ADVANCE_RATIO).unwrap();
    assert_eq!(split.advance_payment, dec(400));
    assert_eq!(split.remaining_payment, dec(600));

    let repriced = split.with_full_payment(dec(2000)).unwrap();
    assert_eq!(repriced.advance_payment, dec(800));
    assert_eq!(repriced.remaining_payment, dec(1200));
}

#[test]
fn test_zero_full_payment_reprices_with_default_ratio() {
    let split = PaymentSplit::from_ratio(Decimal::ZERO, Decimal::new(7, 1)).unwrap();
    assert_eq!(split.ratio(), DEFAULT_ADVANCE_RATIO);

    let repriced = split.with_full_payment(dec(500)).unwrap();
    assert_eq!(repriced.advance_payment, dec(200));
}

#[test]
fn test_reprice_rounds_half_advance_up() {
    let split = PaymentSplit::from_advance(dec(14), dec(1)).unwrap();
    let repriced = split.with_full_payment(dec(7)).unwrap();
    assert_eq!(repriced.advance_payment, dec(1));
    assert_eq!(repriced.remaining_payment, dec(6));
}

#[test]
fn test_invalid_amounts_are_rejected() {
    assert!(PaymentSplit::from_ratio(dec(-1), DEFAULT_ADVANCE_RATIO).is_err());
    assert!(PaymentSplit::from_ratio(Decimal::new(10005, 1), DEFAULT_ADVANCE_RATIO).is_err());
    assert!(PaymentSplit::from_ratio(dec(1000), Decimal::new(11, 1)).is_err());
    assert!(PaymentSplit::from_advance(dec(1000), dec(1001)).is_err());
}

#[test]
fn test_advance_rounds_half_away_from_zero() {
    assert_eq!(round_currency(Decimal::new(25, 1)), dec(3));
    let split = PaymentSplit::from_ratio(dec(5), Decimal::new(5, 1)).unwrap();
    assert_eq!(split.advance_payment, dec(3));
    assert_eq!(split.remaining_payment, dec(2));
}

#[test]
fn test_wallet_routing() {
    assert_eq!(PaymentMethod::Cash.wallet_id(), CASH_WALLET_ID);
    assert_eq!(PaymentMethod::Bank.wallet_id(), BANK_WALLET_ID);
    assert_eq!(PaymentMethod::Check.wallet_id(), BANK_WALLET_ID);
}

#[test]
fn test_payment_evidence_rules() {
    let cash = PaymentDetails {
        method: PaymentMethod::Cash,
        account_id: None,
        invoice: false,
        has_payment_screenshot: false,
        has_invoice_image: false,
    };
    assert!(cash.validate(None).is_ok());

    let cash_with_account = PaymentDetails {
        account_id: Some(Uuid::new_v4()),
        ..cash.clone()
    };
    assert!(cash_with_account.validate(Some(false)).is_err());

    let bank = PaymentDetails {
        method: PaymentMethod::Bank,
        account_id: Some(Uuid::new_v4()),
        invoice: false,
        has_payment_screenshot: true,
        has_invoice_image: false,
    };
    assert!(bank.validate(Some(false)).is_ok());
    assert!(bank.validate(None).is_err());

    let bank_without_screenshot = PaymentDetails {
        has_payment_screenshot: false,
        ..bank.clone()
    };
    assert!(bank_without_screenshot.validate(Some(false)).is_err());

    let invoiced = PaymentDetails {
        invoice: true,
        has_invoice_image: true,
        ..bank.clone()
    };
    assert!(invoiced.validate(Some(true)).is_ok());
    assert!(invoiced.validate(Some(false)).is_err());
}

// ============================================================================
// Property Tests
// ============================================================================

fn whole_amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(Decimal::from)
}

fn ratio() -> impl Strategy<Value = Decimal> {
    (0i64..=100).prop_map(|n| Decimal::new(n, 2))
}

proptest! {
    /// advance + remaining == full for every split handed out
    #[test]
    fn prop_split_is_balanced(full in whole_amount(), r in ratio()) {
        let split = PaymentSplit::from_ratio(full, r).unwrap();
        prop_assert!(split.is_balanced());
        prop_assert!(split.advance_payment >= Decimal::ZERO);
        prop_assert!(split.remaining_payment >= Decimal::ZERO);
    }

    /// Explicit advances also balance
    #[test]
    fn prop_explicit_advance_is_balanced(full in whole_amount(), share in 0u32..=100) {
        let advance = round_currency(full * Decimal::from(share) / Decimal::from(100));
        let split = PaymentSplit::from_advance(full, advance).unwrap();
        prop_assert!(split.is_balanced());
        prop_assert_eq!(split.advance_payment, advance);
    }

    /// Re-pricing keeps the ratio whenever amounts divide evenly
    #[test]
    fn prop_reprice_preserves_ratio(
        hundreds in 1i64..100_000,
        new_hundreds in 0i64..100_000,
        r in ratio(),
    ) {
        let split = PaymentSplit::from_ratio(Decimal::from(hundreds * 100), r).unwrap();
        let repriced = split.with_full_payment(Decimal::from(new_hundreds * 100)).unwrap();

        prop_assert!(repriced.is_balanced());
        prop_assert_eq!(repriced.advance_payment, Decimal::from(new_hundreds * 100) * r);
    }

    /// Re-priced advances match whole-number rounding of new * advance / full
    #[test]
    fn prop_reprice_matches_integer_rounding(
        full in 1i64..1_000_000,
        advance_share in 0i64..=1000,
        new_full in 0i64..1_000_000,
    ) {
        let advance = full * advance_share / 1000;
        let split = PaymentSplit::from_advance(dec(full), dec(advance)).unwrap();
        let repriced = split.with_full_payment(dec(new_full)).unwrap();

        // Halves round up; every operand is non-negative
        let numerator = 2 * i128::from(new_full) * i128::from(advance) + i128::from(full);
        let expected = numerator / (2 * i128::from(full));
        prop_assert_eq!(repriced.advance_payment, Decimal::from_i128_with_scale(expected, 0));
        prop_assert!(repriced.is_balanced());
    }

    /// Chains of re-pricing stay balanced
    #[test]
    fn prop_reprice_chain_stays_balanced(
        start in whole_amount(),
        r in ratio(),
        steps in prop::collection::vec(whole_amount(), 1..10),
    ) {
        let mut split = PaymentSplit::from_ratio(start, r).unwrap();
        for full in steps {
            split = split.with_full_payment(full).unwrap();
            prop_assert!(split.is_balanced());
            prop_assert_eq!(split.full_payment, full);
        }
    }
}
