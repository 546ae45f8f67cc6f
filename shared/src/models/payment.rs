//! Order container and payment split models

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{collect_errors, DomainError, FieldError};

/// Share of the full payment collected up front unless chosen otherwise
pub const DEFAULT_ADVANCE_RATIO: Decimal = Decimal::from_parts(4, 0, 0, false, 1);

/// Wallet that receives non-cash payments
pub const BANK_WALLET_ID: i32 = 1;
/// Wallet that receives cash payments
pub const CASH_WALLET_ID: i32 = 2;

/// How the customer paid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Bank,
    Check,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Check => "check",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "bank" => Some(PaymentMethod::Bank),
            "check" => Some(PaymentMethod::Check),
            _ => None,
        }
    }

    /// Fixed business mapping: cash lands in wallet 2, everything else in wallet 1
    pub fn wallet_id(&self) -> i32 {
        match self {
            PaymentMethod::Cash => CASH_WALLET_ID,
            PaymentMethod::Bank | PaymentMethod::Check => BANK_WALLET_ID,
        }
    }

    pub fn is_cash(&self) -> bool {
        *self == PaymentMethod::Cash
    }
}

/// Round to whole currency units, halves away from zero
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Advance/remaining split of an order container's full payment
///
/// `advance + remaining == full` holds for every value this type hands out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSplit {
    pub full_payment: Decimal,
    pub advance_payment: Decimal,
    pub remaining_payment: Decimal,
}

impl PaymentSplit {
    fn check_full(full: Decimal) -> Result<(), DomainError> {
        if full < Decimal::ZERO {
            return Err(DomainError::invalid("full_payment", "full payment cannot be negative"));
        }
        if full != full.trunc() {
            return Err(DomainError::invalid(
                "full_payment",
                "full payment must be a whole currency amount",
            ));
        }
        Ok(())
    }

    /// Split `full` using an advance ratio in `[0, 1]`
    pub fn from_ratio(full: Decimal, ratio: Decimal) -> Result<Self, DomainError> {
        Self::check_full(full)?;
        if ratio < Decimal::ZERO || ratio > Decimal::ONE {
            return Err(DomainError::invalid(
                "advance_ratio",
                "advance ratio must be between 0 and 1",
            ));
        }
        let advance = round_currency(full * ratio);
        Ok(Self {
            full_payment: full,
            advance_payment: advance,
            remaining_payment: full - advance,
        })
    }

    /// Split `full` using an explicit advance amount
    pub fn from_advance(full: Decimal, advance: Decimal) -> Result<Self, DomainError> {
        Self::check_full(full)?;
        let advance = round_currency(advance);
        if advance < Decimal::ZERO || advance > full {
            return Err(DomainError::invalid(
                "advance_payment",
                "advance payment must be between 0 and the full payment",
            ));
        }
        Ok(Self {
            full_payment: full,
            advance_payment: advance,
            remaining_payment: full - advance,
        })
    }

    /// Ratio implied by the current amounts; the default ratio while full is zero
    pub fn ratio(&self) -> Decimal {
        if self.full_payment.is_zero() {
            DEFAULT_ADVANCE_RATIO
        } else {
            self.advance_payment / self.full_payment
        }
    }

    /// Re-price to a new full payment, keeping the implied ratio rather than
    /// the absolute advance
    ///
    /// The new advance is `full * advance / old_full`, multiplied before the
    /// division so a quotient like 1/14 never gets truncated ahead of rounding.
    pub fn with_full_payment(&self, full: Decimal) -> Result<Self, DomainError> {
        if self.full_payment.is_zero() {
            return Self::from_ratio(full, DEFAULT_ADVANCE_RATIO);
        }
        Self::check_full(full)?;
        let advance = full
            .checked_mul(self.advance_payment)
            .and_then(|scaled| scaled.checked_div(self.full_payment))
            .map(round_currency)
            .ok_or_else(|| DomainError::invalid("full_payment", "full payment is too large"))?;
        Ok(Self {
            full_payment: full,
            advance_payment: advance,
            remaining_payment: full - advance,
        })
    }

    pub fn is_balanced(&self) -> bool {
        self.advance_payment + self.remaining_payment == self.full_payment
    }
}

/// Payment method and the evidence supplied with it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub invoice: bool,
    #[serde(default)]
    pub has_payment_screenshot: bool,
    #[serde(default)]
    pub has_invoice_image: bool,
}

impl PaymentDetails {
    /// Check which fields the method and invoice flag require
    ///
    /// `account_is_invoice` is the looked-up account's eligibility, `None`
    /// when no account was given or it could not be found.
    pub fn validate(&self, account_is_invoice: Option<bool>) -> Result<(), DomainError> {
        let mut errors = Vec::new();
        let method = self.method.as_str();

        if self.method.is_cash() {
            if self.account_id.is_some() {
                errors.push(FieldError::new("account_id", "cash payments do not take an account"));
            }
            if self.has_payment_screenshot {
                errors.push(FieldError::new(
                    "payment_screenshot",
                    "cash payments do not take a payment screenshot",
                ));
            }
        } else {
            if self.account_id.is_none() {
                errors.push(FieldError::new(
                    "account_id",
                    format!("account is required for {} payments", method),
                ));
            } else if account_is_invoice.is_none() {
                errors.push(FieldError::new("account_id", "account does not exist"));
            }
            if !self.has_payment_screenshot {
                errors.push(FieldError::new(
                    "payment_screenshot",
                    format!("payment screenshot is required for {} payments", method),
                ));
            }
        }

        if self.invoice {
            if !self.has_invoice_image {
                errors.push(FieldError::new(
                    "invoice_image",
                    "invoice image is required for invoiced payments",
                ));
            }
            if account_is_invoice == Some(false) {
                errors.push(FieldError::new(
                    "account_id",
                    "invoiced payments must use an invoice account",
                ));
            }
        }

        collect_errors(errors)
    }
}

/// Payment wrapper around one or more orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderContainer {
    pub id: Uuid,
    pub order_codes: Vec<String>,
    #[serde(flatten)]
    pub split: PaymentSplit,
    pub wallet_id: i32,
    pub method: PaymentMethod,
    pub account_id: Option<Uuid>,
    pub invoice: bool,
    pub payment_screenshot: Option<String>,
    pub invoice_image: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ratio_is_forty_percent() {
        assert_eq!(DEFAULT_ADVANCE_RATIO, Decimal::new(4, 1));
    }

    #[test]
    fn test_split_and_reprice() {
        let split = PaymentSplit::from_ratio(Decimal::from(1000), DEFAULT_ADVANCE_RATIO).unwrap();
        assert_eq!(split.advance_payment, Decimal::from(400));
        assert_eq!(split.remaining_payment, Decimal::from(600));

        let repriced = split.with_full_payment(Decimal::from(2000)).unwrap();
        assert_eq!(repriced.advance_payment, Decimal::from(800));
        assert_eq!(repriced.remaining_payment, Decimal::from(1200));
    }

    #[test]
    fn test_advance_rounds_half_away_from_zero() {
        let split = PaymentSplit::from_ratio(Decimal::from(5), Decimal::new(5, 1)).unwrap();
        assert_eq!(split.advance_payment, Decimal::from(3));
        assert_eq!(split.remaining_payment, Decimal::from(2));
    }

    #[test]
    fn test_reprice_from_zero_uses_default_ratio() {
        let split = PaymentSplit::from_ratio(Decimal::ZERO, Decimal::new(7, 1)).unwrap();
        let repriced = split.with_full_payment(Decimal::from(100)).unwrap();
        assert_eq!(repriced.advance_payment, Decimal::from(40));
    }

    #[test]
    fn test_reprice_rounds_exact_half() {
        // 7 * 1 / 14 is exactly 0.5, which must round up
        let split = PaymentSplit::from_advance(Decimal::from(14), Decimal::ONE).unwrap();
        let repriced = split.with_full_payment(Decimal::from(7)).unwrap();
        assert_eq!(repriced.advance_payment, Decimal::ONE);
        assert_eq!(repriced.remaining_payment, Decimal::from(6));

        let split = PaymentSplit::from_advance(Decimal::from(6), Decimal::ONE).unwrap();
        let repriced = split.with_full_payment(Decimal::from(3)).unwrap();
        assert_eq!(repriced.advance_payment, Decimal::ONE);
    }

    #[test]
    fn test_rejects_bad_amounts() {
        assert!(PaymentSplit::from_ratio(Decimal::from(-1), DEFAULT_ADVANCE_RATIO).is_err());
        assert!(PaymentSplit::from_ratio(Decimal::new(10005, 1), DEFAULT_ADVANCE_RATIO).is_err());
        assert!(PaymentSplit::from_ratio(Decimal::from(100), Decimal::from(2)).is_err());
        assert!(PaymentSplit::from_advance(Decimal::from(100), Decimal::from(101)).is_err());
    }

    #[test]
    fn test_wallet_mapping() {
        assert_eq!(PaymentMethod::Cash.wallet_id(), 2);
        assert_eq!(PaymentMethod::Bank.wallet_id(), 1);
        assert_eq!(PaymentMethod::Check.wallet_id(), 1);
    }

    #[test]
    fn test_cash_needs_nothing() {
        let details = PaymentDetails {
            method: PaymentMethod::Cash,
            account_id: None,
            invoice: false,
            has_payment_screenshot: false,
            has_invoice_image: false,
        };
        assert!(details.validate(None).is_ok());
    }

    #[test]
    fn test_bank_requires_account_and_screenshot() {
        let details = PaymentDetails {
            method: PaymentMethod::Bank,
            account_id: None,
            invoice: false,
            has_payment_screenshot: false,
            has_invoice_image: false,
        };
        let err = details.validate(None).unwrap_err();
        let fields: Vec<&str> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["account_id", "payment_screenshot"]);
    }

    #[test]
    fn test_invoice_requires_image_and_invoice_account() {
        let details = PaymentDetails {
            method: PaymentMethod::Check,
            account_id: Some(Uuid::new_v4()),
            invoice: true,
            has_payment_screenshot: true,
            has_invoice_image: false,
        };
        let err = details.validate(Some(false)).unwrap_err();
        assert_eq!(err.field_errors().len(), 2);

        let ok = PaymentDetails {
            has_invoice_image: true,
            ..details
        };
        assert!(ok.validate(Some(true)).is_ok());
    }
}
