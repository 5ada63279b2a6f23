//! Register Engine CLI
//!
//! Command-line interface for reconciling exported drawer count sheets
//! into ledger adjustments.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- sheets.csv > adjustments.csv
//! cargo run -- --strategy sync sheets.csv > adjustments.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 sheets.csv > adjustments.csv
//! ```
//!
//! The program reads count sheets from the input CSV file, runs the
//! reconciliation calculator over each sheet using the selected
//! processing strategy, and writes the resulting ledger adjustments to
//! stdout. Logs go to stderr so stdout stays valid CSV.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use register_engine::cli;
use register_engine::strategy;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        tracing::error!("{e}");
        process::exit(1);
    }
}
