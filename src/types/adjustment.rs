//! Ledger-adjustment types
//!
//! A ledger adjustment is the compensating accounting entry generated to
//! absorb a counted-vs-expected discrepancy in one instrument. Adjustments
//! are created only when a discrepant reconciliation is authorized, and are
//! never mutated afterward; the external ledger collaborator persists them.

use crate::types::{DrawerId, Instrument};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a compensating ledger entry
///
/// A surplus (counted above expected) books as income; a shortfall books
/// as an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentDirection {
    /// Counted more than expected
    Income,

    /// Counted less than expected
    Expense,
}

impl AdjustmentDirection {
    /// Classify a signed difference
    ///
    /// Positive differences are income, negative differences are expense.
    /// A zero difference never produces an adjustment, so this is only
    /// called for non-zero values.
    pub fn from_difference(difference: Decimal) -> Self {
        if difference.is_sign_negative() {
            AdjustmentDirection::Expense
        } else {
            AdjustmentDirection::Income
        }
    }

    /// Canonical wire/CSV name of the direction
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentDirection::Income => "income",
            AdjustmentDirection::Expense => "expense",
        }
    }
}

/// A compensating ledger entry for one instrument's discrepancy
///
/// At most one adjustment exists per instrument per reconciliation
/// session, so a single session produces at most three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAdjustment {
    /// The drawer the reconciliation belongs to
    pub drawer: DrawerId,

    /// Which of the three instruments was discrepant
    pub instrument: Instrument,

    /// Income for surplus, expense for shortfall
    pub direction: AdjustmentDirection,

    /// Absolute value of the signed difference, two fraction digits
    pub amount: Decimal,

    /// Identity of the supervisor who authorized the discrepancy
    pub authorized_by: String,
}

impl LedgerAdjustment {
    /// Build the adjustment for one instrument's signed difference
    ///
    /// # Arguments
    ///
    /// * `drawer` - The drawer under reconciliation
    /// * `instrument` - The discrepant instrument
    /// * `difference` - Signed counted-minus-expected difference (non-zero)
    /// * `authorized_by` - The authorizer identity attached to the session
    pub fn from_difference(
        drawer: DrawerId,
        instrument: Instrument,
        difference: Decimal,
        authorized_by: &str,
    ) -> Self {
        LedgerAdjustment {
            drawer,
            instrument,
            direction: AdjustmentDirection::from_difference(difference),
            amount: difference.abs(),
            authorized_by: authorized_by.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::surplus("100.00", AdjustmentDirection::Income)]
    #[case::shortfall("-100.00", AdjustmentDirection::Expense)]
    #[case::one_cent_over("0.02", AdjustmentDirection::Income)]
    #[case::one_cent_short("-0.02", AdjustmentDirection::Expense)]
    fn test_direction_from_difference(
        #[case] difference: &str,
        #[case] expected: AdjustmentDirection,
    ) {
        let difference: Decimal = difference.parse().unwrap();
        assert_eq!(AdjustmentDirection::from_difference(difference), expected);
    }

    #[test]
    fn test_adjustment_amount_is_absolute() {
        let adjustment = LedgerAdjustment::from_difference(
            7,
            Instrument::LocalCash,
            "-35.50".parse().unwrap(),
            "supervisor",
        );

        assert_eq!(adjustment.drawer, 7);
        assert_eq!(adjustment.direction, AdjustmentDirection::Expense);
        assert_eq!(adjustment.amount, "35.50".parse::<Decimal>().unwrap());
        assert_eq!(adjustment.authorized_by, "supervisor");
    }

    #[test]
    fn test_adjustment_serializes_lowercase_direction() {
        let adjustment = LedgerAdjustment::from_difference(
            1,
            Instrument::MobileBalance,
            "10.00".parse().unwrap(),
            "ana",
        );

        let json = serde_json::to_value(&adjustment).unwrap();
        assert_eq!(json["direction"], "income");
        assert_eq!(json["instrument"], "mobile-balance");
    }
}
