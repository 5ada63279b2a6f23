//! End-to-end batch pipeline tests
//!
//! These tests validate the complete count-sheet pipeline: CSV input
//! through the reconciliation calculator to the adjustment CSV output,
//! with each case run through both processing strategies.

use register_engine::cli::StrategyType;
use register_engine::strategy::create_strategy;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str = "drawer,expected_local,expected_foreign,expected_mobile,counted_local,counted_foreign,counted_mobile,authorized_by\n";

fn create_temp_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

fn run(content: &str, strategy: StrategyType) -> String {
    let file = create_temp_csv(content);
    let strategy = create_strategy(strategy, None);

    let mut output = Vec::new();
    strategy
        .process(file.path(), &mut output)
        .expect("Processing failed");
    String::from_utf8(output).expect("Output was not UTF-8")
}

#[rstest]
fn all_balanced_sheets_yield_header_only(
    #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
) {
    let content = format!(
        "{HEADER}1,1500.00,100.00,0.00,1500.00,100.00,0.00,\n\
         2,820.00,35.00,4500.00,820.01,35.00,4500.00,\n"
    );

    assert_eq!(
        run(&content, strategy),
        "drawer,instrument,direction,amount,authorized_by\n"
    );
}

#[rstest]
fn mixed_day_produces_sorted_adjustments(
    #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
) {
    let content = format!(
        "{HEADER}3,1500.00,100.00,4500.00,1450.00,100.00,4500.00,carla\n\
         1,1500.00,100.00,4500.00,1600.00,102.50,4500.00,carla\n\
         2,900.00,0.00,0.00,900.00,0.00,0.00,\n"
    );

    assert_eq!(
        run(&content, strategy),
        "drawer,instrument,direction,amount,authorized_by\n\
         1,local-cash,income,100.00,carla\n\
         1,foreign-cash,income,2.50,carla\n\
         3,local-cash,expense,50.00,carla\n"
    );
}

#[rstest]
fn invalid_and_unauthorized_sheets_are_skipped(
    #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
) {
    let content = format!(
        // Row 1: unauthorized discrepancy (skipped)
        // Row 2: missing counted field (skipped)
        // Row 3: malformed expected amount (skipped)
        // Row 4: valid authorized discrepancy
        "{HEADER}1,100.00,0.00,0.00,150.00,0.00,0.00,\n\
         2,100.00,0.00,0.00,100.00,,0.00,\n\
         3,oops,0.00,0.00,1.00,0.00,0.00,\n\
         4,100.00,0.00,0.00,95.00,0.00,0.00,miguel\n"
    );

    assert_eq!(
        run(&content, strategy),
        "drawer,instrument,direction,amount,authorized_by\n\
         4,local-cash,expense,5.00,miguel\n"
    );
}

#[rstest]
fn empty_export_is_header_only(
    #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
) {
    assert_eq!(
        run(HEADER, strategy),
        "drawer,instrument,direction,amount,authorized_by\n"
    );
}
