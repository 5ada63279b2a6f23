//! Synchronous processing strategy
//!
//! Single-threaded implementation of the ProcessingStrategy trait. It
//! orchestrates the pipeline by coordinating the SheetReader (CSV
//! input), the reconciliation calculator (business logic), and the
//! csv_format module (output), streaming one sheet at a time.
//!
//! Individual sheet failures (missing counts, missing authorizer,
//! malformed rows) are recoverable: they are logged and the run
//! continues with the next sheet.

use crate::io::csv_format::write_adjustments_csv;
use crate::io::sync_reader::SheetReader;
use crate::strategy::{evaluate_sheet, ProcessingStrategy};
use crate::types::LedgerAdjustment;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Synchronous processing strategy
///
/// Streams count sheets from the CSV export and evaluates them one at a
/// time with constant memory usage.
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Process count sheets from input file and write adjustments to output
    ///
    /// Fatal errors (file not found, write failure) are returned
    /// immediately; per-sheet errors are logged and skipped.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let reader = SheetReader::new(input_path)?;

        let mut adjustments: Vec<LedgerAdjustment> = Vec::new();
        for result in reader {
            match result {
                Ok(sheet) => match evaluate_sheet(&sheet) {
                    Ok(batch) => adjustments.extend(batch),
                    Err(error) => warn!(drawer = sheet.drawer, %error, "sheet evaluation failed"),
                },
                Err(error) => warn!("CSV parsing error: {error}"),
            }
        }

        write_adjustments_csv(&adjustments, output)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "drawer,expected_local,expected_foreign,expected_mobile,counted_local,counted_foreign,counted_mobile,authorized_by\n";

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_strategy_balanced_sheets_produce_header_only() {
        let content = format!(
            "{HEADER}1,1500.00,100.00,0.00,1500.00,100.00,0.00,\n\
             2,10.00,0.00,0.00,10.00,0.00,0.00,\n"
        );
        let file = create_temp_csv(&content);

        let mut output = Vec::new();
        SyncProcessingStrategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "drawer,instrument,direction,amount,authorized_by\n"
        );
    }

    #[test]
    fn test_sync_strategy_emits_adjustments_for_authorized_discrepancy() {
        let content =
            format!("{HEADER}4,1500.00,100.00,4500.00,1600.00,100.00,4500.00,supervisor\n");
        let file = create_temp_csv(&content);

        let mut output = Vec::new();
        SyncProcessingStrategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "drawer,instrument,direction,amount,authorized_by\n\
             4,local-cash,income,100.00,supervisor\n"
        );
    }

    #[test]
    fn test_sync_strategy_skips_unauthorized_discrepancy() {
        let content = format!(
            "{HEADER}4,1500.00,100.00,0.00,1600.00,100.00,0.00,\n\
             5,10.00,0.00,0.00,15.00,0.00,0.00,supervisor\n"
        );
        let file = create_temp_csv(&content);

        let mut output = Vec::new();
        SyncProcessingStrategy.process(file.path(), &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        // Drawer 4 refused (no authorizer), drawer 5 present
        assert!(!output.contains("\n4,"));
        assert!(output.contains("5,local-cash,income,5.00,supervisor"));
    }

    #[test]
    fn test_sync_strategy_continues_after_malformed_row() {
        let content = format!(
            "{HEADER}1,bogus,0.00,0.00,10.00,0.00,0.00,\n\
             2,10.00,0.00,0.00,12.00,0.00,0.00,supervisor\n"
        );
        let file = create_temp_csv(&content);

        let mut output = Vec::new();
        SyncProcessingStrategy.process(file.path(), &mut output).unwrap();

        assert!(String::from_utf8(output)
            .unwrap()
            .contains("2,local-cash,income,2.00,supervisor"));
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let mut output = Vec::new();
        let result = SyncProcessingStrategy.process(Path::new("nonexistent.csv"), &mut output);

        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
