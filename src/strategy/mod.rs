//! Processing strategy module for batch count-sheet processing
//!
//! This module defines the Strategy pattern for complete end-of-day
//! processing pipelines, encompassing CSV parsing, per-sheet
//! reconciliation, and adjustment output. This allows different
//! processing implementations (synchronous, asynchronous batch) to be
//! selected at runtime.

use crate::cli::StrategyType;
use crate::core::arqueo::{ArqueoSession, ArqueoVerdict};
use crate::io::csv_format::CountSheet;
use crate::types::{LedgerAdjustment, RegisterError};
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete count-sheet pipelines
///
/// Each strategy reads count sheets from a CSV export, runs the
/// reconciliation calculator over every sheet, and writes the resulting
/// ledger adjustments to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Process count sheets from input file and write adjustments to output
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the input CSV file containing count sheets
    /// * `output` - Mutable reference to a writer for the adjustment CSV
    ///
    /// # Returns
    ///
    /// * `Ok(())` if processing completed (individual sheet failures are
    ///   recoverable: logged and skipped)
    /// * `Err(String)` if a fatal error occurred (file not found, I/O
    ///   error, output not writable)
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Run the reconciliation calculator over one count sheet
///
/// Balanced sheets produce no adjustments. Discrepant sheets require the
/// pre-authorized supervisor identity from the sheet; without one the
/// sheet is refused, because a discrepancy may never complete
/// unauthorized.
///
/// # Errors
///
/// Returns an error if:
/// - Any of the three counted amounts is missing
/// - The sheet is discrepant and carries no authorizer
pub fn evaluate_sheet(sheet: &CountSheet) -> Result<Vec<LedgerAdjustment>, RegisterError> {
    let mut session = ArqueoSession::new(sheet.drawer, sheet.expected);

    match session.submit_counts(sheet.counted)? {
        ArqueoVerdict::Balanced => Ok(Vec::new()),
        ArqueoVerdict::Discrepant { .. } => {
            let authorizer = sheet.authorized_by.as_deref().ok_or(
                RegisterError::AuthorizationRequired {
                    drawer: sheet.drawer,
                },
            )?;

            let batch = session.authorize(authorizer)?;
            // In batch mode the written CSV is the ledger hand-off
            session.confirm_posted()?;
            Ok(batch)
        }
    }
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create
/// * `config` - Optional configuration for async batch processing
///   (ignored for sync)
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
