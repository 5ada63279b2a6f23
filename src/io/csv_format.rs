//! CSV format handling for count sheets and adjustment output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvCountSheet structure for deserialization
//! - Conversion from CSV records to domain types
//! - Adjustment output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{
    CountInput, DrawerId, Instrument, InstrumentAmounts, LedgerAdjustment,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the count-sheet export format with one row per drawer. The
/// counted fields are optional because an operator may have abandoned a
/// sheet half-entered; presence is enforced at evaluation time, not here.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvCountSheet {
    pub drawer: DrawerId,
    pub expected_local: String,
    pub expected_foreign: String,
    pub expected_mobile: String,
    pub counted_local: Option<String>,
    pub counted_foreign: Option<String>,
    pub counted_mobile: Option<String>,
    pub authorized_by: Option<String>,
}

/// A count sheet converted to domain types
///
/// One end-of-day reconciliation input for one drawer: the expected
/// amounts from the ledger export, the counted amounts the cashier
/// entered, and the supervisor identity if a discrepancy was already
/// authorized on paper.
#[derive(Debug, Clone, PartialEq)]
pub struct CountSheet {
    /// The drawer this sheet reconciles
    pub drawer: DrawerId,

    /// Expected amounts per instrument
    pub expected: InstrumentAmounts,

    /// Counted amounts, possibly incomplete
    pub counted: CountInput,

    /// Pre-authorized supervisor identity, if any
    pub authorized_by: Option<String>,
}

/// Convert a CsvCountSheet to a CountSheet
///
/// This function:
/// - Parses the three expected amounts (all required)
/// - Parses the counted amounts that are present, leaving absent or
///   blank fields unset (the reconciliation session enforces presence)
/// - Normalizes a blank authorizer to absent
///
/// # Arguments
///
/// * `record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(CountSheet) - Successfully converted sheet
/// - Err(String) - Error message describing the conversion failure
pub fn convert_count_sheet(record: CsvCountSheet) -> Result<CountSheet, String> {
    let expected = InstrumentAmounts::new(
        parse_required(&record.expected_local, "expected_local", record.drawer)?,
        parse_required(&record.expected_foreign, "expected_foreign", record.drawer)?,
        parse_required(&record.expected_mobile, "expected_mobile", record.drawer)?,
    );

    let counted = CountInput {
        local_cash: parse_optional(record.counted_local.as_deref(), "counted_local", record.drawer)?,
        foreign_cash: parse_optional(
            record.counted_foreign.as_deref(),
            "counted_foreign",
            record.drawer,
        )?,
        mobile_balance: parse_optional(
            record.counted_mobile.as_deref(),
            "counted_mobile",
            record.drawer,
        )?,
    };

    let authorized_by = record
        .authorized_by
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    Ok(CountSheet {
        drawer: record.drawer,
        expected,
        counted,
        authorized_by,
    })
}

fn parse_required(value: &str, field: &str, drawer: DrawerId) -> Result<Decimal, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("Missing {} for drawer {}", field, drawer));
    }
    Decimal::from_str(trimmed)
        .map_err(|_| format!("Invalid {} '{}' for drawer {}", field, value, drawer))
}

fn parse_optional(
    value: Option<&str>,
    field: &str,
    drawer: DrawerId,
) -> Result<Option<Decimal>, String> {
    match value {
        Some(raw) if !raw.trim().is_empty() => Decimal::from_str(raw.trim())
            .map(Some)
            .map_err(|_| format!("Invalid {} '{}' for drawer {}", field, raw, drawer)),
        _ => Ok(None),
    }
}

/// Write ledger adjustments to CSV format
///
/// Writes adjustments with columns: drawer, instrument, direction,
/// amount, authorized_by. Rows are sorted by drawer and canonical
/// instrument order for deterministic output.
///
/// # Arguments
///
/// * `adjustments` - Slice of adjustments to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_adjustments_csv(
    adjustments: &[LedgerAdjustment],
    output: &mut dyn Write,
) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["drawer", "instrument", "direction", "amount", "authorized_by"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = adjustments.to_vec();
    sorted.sort_by_key(|adjustment| (adjustment.drawer, instrument_rank(adjustment.instrument)));

    for adjustment in sorted {
        writer
            .write_record(&[
                adjustment.drawer.to_string(),
                adjustment.instrument.as_str().to_string(),
                adjustment.direction.as_str().to_string(),
                format!("{:.2}", adjustment.amount),
                adjustment.authorized_by.clone(),
            ])
            .map_err(|e| format!("Failed to write adjustment record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

fn instrument_rank(instrument: Instrument) -> usize {
    Instrument::ALL
        .iter()
        .position(|candidate| *candidate == instrument)
        .unwrap_or(Instrument::ALL.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdjustmentDirection;
    use rstest::rstest;

    fn record(drawer: DrawerId) -> CsvCountSheet {
        CsvCountSheet {
            drawer,
            expected_local: "1500.00".to_string(),
            expected_foreign: "100.00".to_string(),
            expected_mobile: "0.00".to_string(),
            counted_local: Some("1500.00".to_string()),
            counted_foreign: Some("100.00".to_string()),
            counted_mobile: Some("0.00".to_string()),
            authorized_by: None,
        }
    }

    #[test]
    fn test_convert_complete_sheet() {
        let sheet = convert_count_sheet(record(3)).unwrap();

        assert_eq!(sheet.drawer, 3);
        assert_eq!(
            sheet.expected.get(Instrument::LocalCash),
            "1500.00".parse().unwrap()
        );
        assert_eq!(
            sheet.counted.get(Instrument::ForeignCash),
            Some("100.00".parse().unwrap())
        );
        assert_eq!(sheet.authorized_by, None);
    }

    #[test]
    fn test_convert_keeps_missing_counts_unset() {
        let mut raw = record(3);
        raw.counted_foreign = None;
        raw.counted_mobile = Some("   ".to_string());

        let sheet = convert_count_sheet(raw).unwrap();
        assert_eq!(sheet.counted.foreign_cash, None);
        assert_eq!(sheet.counted.mobile_balance, None);
        assert!(sheet.counted.local_cash.is_some());
    }

    #[test]
    fn test_convert_normalizes_blank_authorizer() {
        let mut raw = record(3);
        raw.authorized_by = Some("  ".to_string());
        assert_eq!(convert_count_sheet(raw).unwrap().authorized_by, None);

        let mut raw = record(3);
        raw.authorized_by = Some(" supervisor ".to_string());
        assert_eq!(
            convert_count_sheet(raw).unwrap().authorized_by.as_deref(),
            Some("supervisor")
        );
    }

    #[rstest]
    #[case::missing_expected("", "Missing expected_local for drawer 3")]
    #[case::invalid_expected("not-a-number", "Invalid expected_local 'not-a-number' for drawer 3")]
    fn test_convert_expected_errors(#[case] expected_local: &str, #[case] message: &str) {
        let mut raw = record(3);
        raw.expected_local = expected_local.to_string();

        let err = convert_count_sheet(raw).unwrap_err();
        assert_eq!(err, message);
    }

    #[test]
    fn test_convert_invalid_counted_is_error() {
        let mut raw = record(3);
        raw.counted_mobile = Some("12,34".to_string());

        let err = convert_count_sheet(raw).unwrap_err();
        assert!(err.contains("Invalid counted_mobile"));
    }

    #[test]
    fn test_write_adjustments_sorted_and_formatted() {
        let adjustments = vec![
            LedgerAdjustment {
                drawer: 2,
                instrument: Instrument::MobileBalance,
                direction: AdjustmentDirection::Expense,
                amount: "50.00".parse().unwrap(),
                authorized_by: "supervisor".to_string(),
            },
            LedgerAdjustment {
                drawer: 1,
                instrument: Instrument::LocalCash,
                direction: AdjustmentDirection::Income,
                amount: "100.00".parse().unwrap(),
                authorized_by: "supervisor".to_string(),
            },
            LedgerAdjustment {
                drawer: 2,
                instrument: Instrument::ForeignCash,
                direction: AdjustmentDirection::Income,
                amount: "5.50".parse().unwrap(),
                authorized_by: "supervisor".to_string(),
            },
        ];

        let mut output = Vec::new();
        write_adjustments_csv(&adjustments, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            "drawer,instrument,direction,amount,authorized_by\n\
             1,local-cash,income,100.00,supervisor\n\
             2,foreign-cash,income,5.50,supervisor\n\
             2,mobile-balance,expense,50.00,supervisor\n"
        );
    }

    #[test]
    fn test_write_empty_adjustments_is_header_only() {
        let mut output = Vec::new();
        write_adjustments_csv(&[], &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "drawer,instrument,direction,amount,authorized_by\n"
        );
    }
}
