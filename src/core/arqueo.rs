//! Cash reconciliation ("arqueo") session
//!
//! This module implements the reconciliation workflow for one drawer:
//! comparing counted against expected amounts across the three
//! instruments, deciding balanced vs. discrepant, and producing the
//! compensating ledger adjustments once a discrepancy is authorized.
//!
//! # State machine
//!
//! ```text
//! Counting ──(balanced)──────────────────────────▶ Complete
//! Counting ──(discrepant)──▶ AwaitingAuthorization ──(authorized,
//!                                                      batch posted)──▶ Complete
//! Counting ──(cancel)──▶ Cancelled
//! ```
//!
//! No transition skips `AwaitingAuthorization` when discrepant, and a
//! session that has observed a discrepancy can no longer be cancelled:
//! it either completes or is explicitly escalated.

use crate::core::traits::LedgerGateway;
use crate::types::{
    discrepancy_tolerance, CountInput, DrawerId, Instrument, InstrumentAmounts, LedgerAdjustment,
    RegisterError,
};
use rust_decimal::Decimal;
use std::fmt;
use tracing::warn;

/// Lifecycle phase of a reconciliation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArqueoPhase {
    /// Counts are being entered; the session may still be cancelled
    Counting,

    /// A discrepancy was observed; forward progress is blocked until an
    /// authorizer identity is supplied and the adjustment batch posts
    AwaitingAuthorization,

    /// The session finished: balanced, or discrepant with the whole
    /// adjustment batch durably accepted
    Complete,

    /// The operator abandoned the count before submitting
    Cancelled,
}

impl ArqueoPhase {
    /// Human-readable phase name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ArqueoPhase::Counting => "counting",
            ArqueoPhase::AwaitingAuthorization => "awaiting-authorization",
            ArqueoPhase::Complete => "complete",
            ArqueoPhase::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ArqueoPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of submitting the counted amounts
#[derive(Debug, Clone, PartialEq)]
pub enum ArqueoVerdict {
    /// Every instrument is within the discrepancy threshold
    Balanced,

    /// At least one instrument differs beyond the threshold
    Discrepant {
        /// Signed counted-minus-expected difference per instrument
        differences: InstrumentAmounts,
    },
}

/// One drawer reconciliation from count entry to completion
///
/// A session is created when the operator starts a count, becomes
/// immutable in its amounts once submitted, and (if discrepant) carries
/// the authorizer identity attached before it can close.
#[derive(Debug, Clone)]
pub struct ArqueoSession {
    drawer: DrawerId,
    expected: InstrumentAmounts,
    counted: Option<InstrumentAmounts>,
    differences: Option<InstrumentAmounts>,
    authorized_by: Option<String>,
    phase: ArqueoPhase,
}

impl ArqueoSession {
    /// Start a reconciliation session for a drawer
    ///
    /// # Arguments
    ///
    /// * `drawer` - The drawer being reconciled
    /// * `expected` - Expected amounts per instrument, derived from the
    ///   external ledger; rounded to two places on entry
    pub fn new(drawer: DrawerId, expected: InstrumentAmounts) -> Self {
        ArqueoSession {
            drawer,
            expected: expected.rounded(),
            counted: None,
            differences: None,
            authorized_by: None,
            phase: ArqueoPhase::Counting,
        }
    }

    /// The drawer this session reconciles
    pub fn drawer(&self) -> DrawerId {
        self.drawer
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ArqueoPhase {
        self.phase
    }

    /// Expected amounts per instrument
    pub fn expected(&self) -> InstrumentAmounts {
        self.expected
    }

    /// Counted amounts, once submitted
    pub fn counted(&self) -> Option<InstrumentAmounts> {
        self.counted
    }

    /// Signed differences, once submitted
    pub fn differences(&self) -> Option<InstrumentAmounts> {
        self.differences
    }

    /// The authorizer identity, once supplied
    pub fn authorized_by(&self) -> Option<&str> {
        self.authorized_by.as_deref()
    }

    /// Instruments whose difference exceeds the threshold
    ///
    /// Empty until counts are submitted; empty forever for a balanced
    /// session.
    pub fn discrepant_instruments(&self) -> Vec<(Instrument, Decimal)> {
        let tolerance = discrepancy_tolerance();
        self.differences
            .map(|differences| {
                differences
                    .iter()
                    .filter(|(_, difference)| difference.abs() > tolerance)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Submit the counted amounts and compute the verdict
    ///
    /// Computes the signed counted-minus-expected difference for each
    /// instrument using fixed-point decimal subtraction. The session is
    /// discrepant iff at least one absolute difference exceeds 0.01; the
    /// threshold absorbs upstream display-rounding noise and is not
    /// configurable.
    ///
    /// # Arguments
    ///
    /// * `input` - Counted amounts; all three instruments are mandatory
    ///
    /// # Returns
    ///
    /// * `Ok(ArqueoVerdict::Balanced)` - Session completed, no adjustments
    /// * `Ok(ArqueoVerdict::Discrepant)` - Session now awaits authorization
    /// * `Err(RegisterError)` - Missing count or wrong phase; the session
    ///   stays in `Counting`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The session is not in the `Counting` phase
    /// - Any of the three counted amounts is absent
    /// - A difference would overflow decimal arithmetic
    pub fn submit_counts(&mut self, input: CountInput) -> Result<ArqueoVerdict, RegisterError> {
        if self.phase != ArqueoPhase::Counting {
            return Err(RegisterError::phase_violation(
                "submit counts",
                self.phase.as_str(),
            ));
        }

        let counted = input.validate()?;

        let mut differences = InstrumentAmounts::default();
        for instrument in Instrument::ALL {
            let difference = counted
                .get(instrument)
                .checked_sub(self.expected.get(instrument))
                .ok_or_else(|| RegisterError::arithmetic_overflow("difference"))?;
            differences.set(instrument, difference);
        }

        self.counted = Some(counted);
        self.differences = Some(differences);

        let tolerance = discrepancy_tolerance();
        let discrepant = differences
            .iter()
            .any(|(_, difference)| difference.abs() > tolerance);

        if discrepant {
            self.phase = ArqueoPhase::AwaitingAuthorization;
            Ok(ArqueoVerdict::Discrepant { differences })
        } else {
            self.phase = ArqueoPhase::Complete;
            Ok(ArqueoVerdict::Balanced)
        }
    }

    /// Cancel the session
    ///
    /// Permitted only while counting. Cancellation is local-only: no
    /// network call is involved, and any resources scoped to the session
    /// are released when it drops. Once a discrepancy has been observed,
    /// cancellation is refused so discrepancies cannot be hidden.
    ///
    /// # Errors
    ///
    /// Returns `RegisterError::CancellationBlocked` if the session has
    /// left the `Counting` phase.
    pub fn cancel(&mut self) -> Result<(), RegisterError> {
        if self.phase != ArqueoPhase::Counting {
            return Err(RegisterError::cancellation_blocked(self.phase.as_str()));
        }

        self.phase = ArqueoPhase::Cancelled;
        Ok(())
    }

    /// Attach an authorizer and synthesize the adjustment batch
    ///
    /// Produces exactly one adjustment per instrument whose difference
    /// exceeds the threshold: income for surplus, expense for shortfall,
    /// amount equal to the absolute difference. The session stays in
    /// `AwaitingAuthorization` until the whole batch is confirmed posted.
    ///
    /// Re-authorizing while still awaiting is permitted (a different
    /// supervisor may take over before the batch posts).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The session is not awaiting authorization
    /// - The authorizer identity is empty
    pub fn authorize(&mut self, authorizer: &str) -> Result<Vec<LedgerAdjustment>, RegisterError> {
        if self.phase != ArqueoPhase::AwaitingAuthorization {
            return Err(RegisterError::phase_violation(
                "authorize",
                self.phase.as_str(),
            ));
        }

        if authorizer.trim().is_empty() {
            return Err(RegisterError::validation("authorizer identity is required"));
        }

        self.authorized_by = Some(authorizer.to_string());

        let batch = self
            .discrepant_instruments()
            .into_iter()
            .map(|(instrument, difference)| {
                LedgerAdjustment::from_difference(self.drawer, instrument, difference, authorizer)
            })
            .collect();

        Ok(batch)
    }

    /// Mark the adjustment batch as durably accepted
    ///
    /// Called once the ledger collaborator has confirmed the whole batch.
    /// Only then does the session transition to `Complete`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not awaiting authorization or
    /// no authorizer has been attached.
    pub fn confirm_posted(&mut self) -> Result<(), RegisterError> {
        if self.phase != ArqueoPhase::AwaitingAuthorization {
            return Err(RegisterError::phase_violation(
                "confirm posting",
                self.phase.as_str(),
            ));
        }

        if self.authorized_by.is_none() {
            return Err(RegisterError::phase_violation(
                "confirm posting",
                "unauthorized",
            ));
        }

        self.phase = ArqueoPhase::Complete;
        Ok(())
    }

    /// Authorize, post the batch, and complete the session
    ///
    /// Submits the adjustment batch through the ledger collaborator.
    /// Rejections retry the whole batch as a unit; no adjustment is
    /// considered posted until the collaborator confirms all of them.
    /// When attempts exhaust, the error escalates and the session stays
    /// in `AwaitingAuthorization` for operator escalation.
    ///
    /// # Arguments
    ///
    /// * `authorizer` - Identity supplied by the authorization collaborator
    /// * `gateway` - The external ledger collaborator
    /// * `max_attempts` - Whole-batch attempts before escalating (>= 1)
    ///
    /// # Returns
    ///
    /// The posted batch on success.
    pub async fn finalize<G: LedgerGateway>(
        &mut self,
        authorizer: &str,
        gateway: &G,
        max_attempts: u32,
    ) -> Result<Vec<LedgerAdjustment>, RegisterError> {
        let batch = self.authorize(authorizer)?;
        let max_attempts = max_attempts.max(1);

        let mut last_error = None;
        for attempt in 1..=max_attempts {
            match gateway.post_adjustments(&batch).await {
                Ok(()) => {
                    self.confirm_posted()?;
                    return Ok(batch);
                }
                Err(error) => {
                    warn!(
                        drawer = self.drawer,
                        attempt,
                        max_attempts,
                        %error,
                        "adjustment batch rejected, will retry as a unit"
                    );
                    last_error = Some(error);
                }
            }
        }

        let message = last_error
            .map(|error| error.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        Err(RegisterError::ledger_rejected(max_attempts, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdjustmentDirection;
    use rstest::rstest;

    fn amounts(local: &str, foreign: &str, mobile: &str) -> InstrumentAmounts {
        InstrumentAmounts::new(
            local.parse().unwrap(),
            foreign.parse().unwrap(),
            mobile.parse().unwrap(),
        )
    }

    fn counts(local: &str, foreign: &str, mobile: &str) -> CountInput {
        CountInput::complete(
            local.parse().unwrap(),
            foreign.parse().unwrap(),
            mobile.parse().unwrap(),
        )
    }

    #[test]
    fn test_new_session_starts_counting() {
        let session = ArqueoSession::new(1, amounts("1500.00", "100.00", "0.00"));

        assert_eq!(session.phase(), ArqueoPhase::Counting);
        assert_eq!(session.counted(), None);
        assert_eq!(session.differences(), None);
        assert_eq!(session.authorized_by(), None);
    }

    #[test]
    fn test_exact_count_is_balanced() {
        let mut session = ArqueoSession::new(1, amounts("1500.00", "100.00", "0.00"));

        let verdict = session
            .submit_counts(counts("1500.00", "100.00", "0.00"))
            .unwrap();

        assert_eq!(verdict, ArqueoVerdict::Balanced);
        assert_eq!(session.phase(), ArqueoPhase::Complete);
        assert!(session.discrepant_instruments().is_empty());
    }

    #[rstest]
    #[case::one_cent_over("1500.01")]
    #[case::one_cent_short("1499.99")]
    fn test_one_cent_is_within_tolerance(#[case] counted_local: &str) {
        let mut session = ArqueoSession::new(1, amounts("1500.00", "100.00", "0.00"));

        let verdict = session
            .submit_counts(counts(counted_local, "100.00", "0.00"))
            .unwrap();

        assert_eq!(verdict, ArqueoVerdict::Balanced);
        assert_eq!(session.phase(), ArqueoPhase::Complete);
    }

    #[test]
    fn test_two_cents_is_discrepant() {
        let mut session = ArqueoSession::new(1, amounts("1500.00", "100.00", "0.00"));

        let verdict = session
            .submit_counts(counts("1500.02", "100.00", "0.00"))
            .unwrap();

        assert!(matches!(verdict, ArqueoVerdict::Discrepant { .. }));
        assert_eq!(session.phase(), ArqueoPhase::AwaitingAuthorization);
    }

    #[test]
    fn test_surplus_difference_is_signed() {
        let mut session = ArqueoSession::new(1, amounts("1500.00", "100.00", "4500.00"));

        let verdict = session
            .submit_counts(counts("1600.00", "100.00", "4500.00"))
            .unwrap();

        match verdict {
            ArqueoVerdict::Discrepant { differences } => {
                assert_eq!(
                    differences.get(Instrument::LocalCash),
                    "100.00".parse().unwrap()
                );
                assert_eq!(differences.get(Instrument::ForeignCash), Decimal::ZERO);
                assert_eq!(differences.get(Instrument::MobileBalance), Decimal::ZERO);
            }
            other => panic!("expected discrepant verdict, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_count_blocks_submission() {
        let mut session = ArqueoSession::new(1, amounts("1500.00", "100.00", "0.00"));

        let input = CountInput {
            local_cash: Some("1500.00".parse().unwrap()),
            foreign_cash: None,
            mobile_balance: Some(Decimal::ZERO),
        };

        let err = session.submit_counts(input).unwrap_err();
        assert!(matches!(
            err,
            RegisterError::MissingCount {
                instrument: Instrument::ForeignCash
            }
        ));
        // No state transition out of counting
        assert_eq!(session.phase(), ArqueoPhase::Counting);
        assert_eq!(session.counted(), None);
    }

    #[test]
    fn test_submit_twice_is_rejected() {
        let mut session = ArqueoSession::new(1, amounts("10.00", "0.00", "0.00"));
        session
            .submit_counts(counts("10.00", "0.00", "0.00"))
            .unwrap();

        let err = session
            .submit_counts(counts("10.00", "0.00", "0.00"))
            .unwrap_err();
        assert!(matches!(err, RegisterError::PhaseViolation { .. }));
    }

    #[test]
    fn test_cancel_while_counting() {
        let mut session = ArqueoSession::new(1, amounts("10.00", "0.00", "0.00"));

        session.cancel().unwrap();
        assert_eq!(session.phase(), ArqueoPhase::Cancelled);
    }

    #[test]
    fn test_cancel_after_discrepancy_is_blocked() {
        let mut session = ArqueoSession::new(1, amounts("10.00", "0.00", "0.00"));
        session
            .submit_counts(counts("20.00", "0.00", "0.00"))
            .unwrap();

        let err = session.cancel().unwrap_err();
        assert!(matches!(err, RegisterError::CancellationBlocked { .. }));
        assert_eq!(session.phase(), ArqueoPhase::AwaitingAuthorization);
    }

    #[test]
    fn test_authorize_produces_one_adjustment_per_discrepant_instrument() {
        let mut session = ArqueoSession::new(4, amounts("1500.00", "100.00", "4500.00"));
        session
            .submit_counts(counts("1600.00", "100.00", "4450.00"))
            .unwrap();

        let batch = session.authorize("supervisor").unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].instrument, Instrument::LocalCash);
        assert_eq!(batch[0].direction, AdjustmentDirection::Income);
        assert_eq!(batch[0].amount, "100.00".parse().unwrap());
        assert_eq!(batch[1].instrument, Instrument::MobileBalance);
        assert_eq!(batch[1].direction, AdjustmentDirection::Expense);
        assert_eq!(batch[1].amount, "50.00".parse().unwrap());
        assert!(batch.iter().all(|a| a.authorized_by == "supervisor"));
        assert!(batch.iter().all(|a| a.drawer == 4));

        // Authorization alone does not complete the session
        assert_eq!(session.phase(), ArqueoPhase::AwaitingAuthorization);
        assert_eq!(session.authorized_by(), Some("supervisor"));
    }

    #[test]
    fn test_authorize_balanced_session_is_rejected() {
        let mut session = ArqueoSession::new(1, amounts("10.00", "0.00", "0.00"));
        session
            .submit_counts(counts("10.00", "0.00", "0.00"))
            .unwrap();

        let err = session.authorize("supervisor").unwrap_err();
        assert!(matches!(err, RegisterError::PhaseViolation { .. }));
    }

    #[test]
    fn test_authorize_requires_identity() {
        let mut session = ArqueoSession::new(1, amounts("10.00", "0.00", "0.00"));
        session
            .submit_counts(counts("20.00", "0.00", "0.00"))
            .unwrap();

        let err = session.authorize("   ").unwrap_err();
        assert!(matches!(err, RegisterError::Validation { .. }));
        assert_eq!(session.authorized_by(), None);
    }

    #[test]
    fn test_confirm_posted_completes_session() {
        let mut session = ArqueoSession::new(1, amounts("10.00", "0.00", "0.00"));
        session
            .submit_counts(counts("20.00", "0.00", "0.00"))
            .unwrap();
        session.authorize("supervisor").unwrap();

        session.confirm_posted().unwrap();
        assert_eq!(session.phase(), ArqueoPhase::Complete);
    }

    #[test]
    fn test_confirm_posted_without_authorizer_is_rejected() {
        let mut session = ArqueoSession::new(1, amounts("10.00", "0.00", "0.00"));
        session
            .submit_counts(counts("20.00", "0.00", "0.00"))
            .unwrap();

        let err = session.confirm_posted().unwrap_err();
        assert!(matches!(err, RegisterError::PhaseViolation { .. }));
        assert_eq!(session.phase(), ArqueoPhase::AwaitingAuthorization);
    }

    #[test]
    fn test_expected_amounts_are_rounded_on_entry() {
        let session = ArqueoSession::new(1, amounts("10.005", "0.00", "0.00"));
        assert_eq!(
            session.expected().get(Instrument::LocalCash),
            "10.01".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn test_sub_threshold_difference_produces_no_adjustment() {
        // local is discrepant, foreign differs by exactly one cent:
        // only local gets an adjustment
        let mut session = ArqueoSession::new(1, amounts("100.00", "50.00", "0.00"));
        session
            .submit_counts(counts("105.00", "50.01", "0.00"))
            .unwrap();

        let batch = session.authorize("supervisor").unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].instrument, Instrument::LocalCash);
    }
}
