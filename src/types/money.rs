//! Money-related types for the cash-register engine
//!
//! This module defines the three value instruments tracked by a drawer,
//! the per-instrument amount triples used throughout reconciliation, and
//! the financial rounding rules applied to them.
//!
//! All amounts are `rust_decimal::Decimal` values with two fraction
//! digits. Binary floating point is never used for money.

use crate::types::RegisterError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Drawer identifier
///
/// Supports drawer IDs from 0 to 4,294,967,295
pub type DrawerId = u32;

/// Number of fraction digits carried by every monetary amount
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary amount to two fraction digits
///
/// Uses "round half away from zero", the rounding rule applied to all
/// counted and expected amounts before any difference is computed.
/// Upstream currency-conversion display rounding can introduce noise in
/// lower digits; this normalizes it away deterministically.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Discrepancy threshold for a single instrument
///
/// A difference whose absolute value is at or below this threshold is
/// treated as rounding noise, not a discrepancy. The threshold is a fixed
/// business rule with no configuration surface.
pub fn discrepancy_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

/// The three value-holding channels tracked by a drawer
///
/// Every reconciliation compares expected and counted amounts across all
/// three instruments; none may be omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instrument {
    /// Physical cash in the local currency
    LocalCash,

    /// Physical cash in the foreign currency
    ForeignCash,

    /// Mobile-payment account balance
    MobileBalance,
}

impl Instrument {
    /// All instruments in canonical order
    ///
    /// Used for deterministic iteration and output ordering.
    pub const ALL: [Instrument; 3] = [
        Instrument::LocalCash,
        Instrument::ForeignCash,
        Instrument::MobileBalance,
    ];

    /// Canonical wire/CSV name of the instrument
    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::LocalCash => "local-cash",
            Instrument::ForeignCash => "foreign-cash",
            Instrument::MobileBalance => "mobile-balance",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decimal amount per instrument
///
/// Used for expected totals, counted totals, and signed per-instrument
/// differences.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InstrumentAmounts {
    /// Local-currency cash amount
    pub local_cash: Decimal,

    /// Foreign-currency cash amount
    pub foreign_cash: Decimal,

    /// Mobile-payment balance amount
    pub mobile_balance: Decimal,
}

impl InstrumentAmounts {
    /// Create a new triple from the three per-instrument amounts
    pub fn new(local_cash: Decimal, foreign_cash: Decimal, mobile_balance: Decimal) -> Self {
        InstrumentAmounts {
            local_cash,
            foreign_cash,
            mobile_balance,
        }
    }

    /// Get the amount for a single instrument
    pub fn get(&self, instrument: Instrument) -> Decimal {
        match instrument {
            Instrument::LocalCash => self.local_cash,
            Instrument::ForeignCash => self.foreign_cash,
            Instrument::MobileBalance => self.mobile_balance,
        }
    }

    /// Set the amount for a single instrument
    pub fn set(&mut self, instrument: Instrument, amount: Decimal) {
        match instrument {
            Instrument::LocalCash => self.local_cash = amount,
            Instrument::ForeignCash => self.foreign_cash = amount,
            Instrument::MobileBalance => self.mobile_balance = amount,
        }
    }

    /// Round every amount to two fraction digits
    pub fn rounded(&self) -> Self {
        InstrumentAmounts {
            local_cash: round_money(self.local_cash),
            foreign_cash: round_money(self.foreign_cash),
            mobile_balance: round_money(self.mobile_balance),
        }
    }

    /// Iterate over (instrument, amount) pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Instrument, Decimal)> + '_ {
        Instrument::ALL.into_iter().map(move |i| (i, self.get(i)))
    }
}

/// User-entered counted amounts, each optional until submission
///
/// A count field is optional only while the operator is typing; submitting
/// a reconciliation requires all three. A missing field blocks computation
/// with a validation error rather than defaulting to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CountInput {
    /// Counted local-currency cash, if entered
    pub local_cash: Option<Decimal>,

    /// Counted foreign-currency cash, if entered
    pub foreign_cash: Option<Decimal>,

    /// Counted mobile-payment balance, if entered
    pub mobile_balance: Option<Decimal>,
}

impl CountInput {
    /// Create a complete count input from the three amounts
    pub fn complete(local_cash: Decimal, foreign_cash: Decimal, mobile_balance: Decimal) -> Self {
        CountInput {
            local_cash: Some(local_cash),
            foreign_cash: Some(foreign_cash),
            mobile_balance: Some(mobile_balance),
        }
    }

    /// Get the entered amount for a single instrument, if present
    pub fn get(&self, instrument: Instrument) -> Option<Decimal> {
        match instrument {
            Instrument::LocalCash => self.local_cash,
            Instrument::ForeignCash => self.foreign_cash,
            Instrument::MobileBalance => self.mobile_balance,
        }
    }

    /// Validate that all three counts are present
    ///
    /// # Returns
    ///
    /// * `Ok(InstrumentAmounts)` with every amount rounded to two places
    /// * `Err(RegisterError::MissingCount)` naming the first absent
    ///   instrument in canonical order
    pub fn validate(&self) -> Result<InstrumentAmounts, RegisterError> {
        for instrument in Instrument::ALL {
            if self.get(instrument).is_none() {
                return Err(RegisterError::missing_count(instrument));
            }
        }

        Ok(InstrumentAmounts {
            local_cash: round_money(self.local_cash.unwrap_or_default()),
            foreign_cash: round_money(self.foreign_cash.unwrap_or_default()),
            mobile_balance: round_money(self.mobile_balance.unwrap_or_default()),
        })
    }
}
