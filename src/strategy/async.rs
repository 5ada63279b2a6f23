//! Asynchronous batch processing strategy
//!
//! Multi-threaded implementation of the ProcessingStrategy trait for
//! large end-of-day exports. Sheets are read in batches; within each
//! batch, sheets are partitioned by drawer and evaluated in parallel,
//! with results aggregated in a thread-safe map.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncSheetReader (batch CSV reading)
//!     └── per-drawer tasks → DashMap<DrawerId, Vec<LedgerAdjustment>>
//! ```
//!
//! Batches are processed sequentially so a drawer whose sheets span
//! batches keeps its evaluation order; within a batch, different drawers
//! evaluate concurrently.

use crate::io::async_reader::AsyncSheetReader;
use crate::io::csv_format::{write_adjustments_csv, CountSheet};
use crate::strategy::{evaluate_sheet, ProcessingStrategy};
use crate::types::{DrawerId, LedgerAdjustment};
use dashmap::DashMap;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Configuration for batch processing
///
/// Controls how sheets are batched and the number of worker threads for
/// parallel evaluation within each batch.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of sheets per batch
    pub batch_size: usize,
    /// Maximum number of drawers evaluating concurrently
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a logged warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                "invalid batch_size (0), using default ({})",
                default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                "invalid max_concurrent_batches (0), using default ({})",
                default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
///
/// Thread-safe throughout: results aggregate into an Arc-wrapped DashMap
/// keyed by drawer, and per-drawer tasks never contend on a drawer's
/// entry.
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    /// Batch processing configuration
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy with the specified configuration
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Process count sheets from input file and write adjustments to output
    ///
    /// Builds a multi-threaded tokio runtime sized to the configured
    /// concurrency, streams sheets in batches, evaluates each batch with
    /// one task per drawer, and writes the aggregated adjustments.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncSheetReader::new(compat_file);

            let results: Arc<DashMap<DrawerId, Vec<LedgerAdjustment>>> = Arc::new(DashMap::new());

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Partition by drawer so concurrent tasks never interleave
                // work for the same drawer
                let mut partitions: HashMap<DrawerId, Vec<CountSheet>> = HashMap::new();
                for sheet in batch {
                    partitions.entry(sheet.drawer).or_default().push(sheet);
                }

                let mut handles = Vec::with_capacity(partitions.len());
                for (drawer, sheets) in partitions {
                    let results = Arc::clone(&results);
                    handles.push(tokio::spawn(async move {
                        for sheet in sheets {
                            match evaluate_sheet(&sheet) {
                                Ok(batch) if !batch.is_empty() => {
                                    results.entry(drawer).or_default().extend(batch);
                                }
                                Ok(_) => {}
                                Err(error) => {
                                    warn!(drawer, %error, "sheet evaluation failed");
                                }
                            }
                        }
                    }));
                }

                for handle in handles {
                    if let Err(e) = handle.await {
                        return Err(format!("Evaluation task failed: {}", e));
                    }
                }
            }

            let mut adjustments = Vec::new();
            for entry in results.iter() {
                adjustments.extend(entry.value().clone());
            }

            write_adjustments_csv(&adjustments, output)?;

            Ok(())
        })
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
    fn test_async_strategy_emits_adjustments() {
        let content = format!(
            "{HEADER}1,1500.00,100.00,0.00,1600.00,100.00,0.00,supervisor\n\
             2,10.00,0.00,0.00,10.00,0.00,0.00,\n"
        );
        let file = create_temp_csv(&content);

        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "drawer,instrument,direction,amount,authorized_by\n\
             1,local-cash,income,100.00,supervisor\n"
        );
    }

    #[test]
    fn test_async_strategy_small_batches_match_sync_output() {
        let content = format!(
            "{HEADER}3,10.00,0.00,0.00,15.00,0.00,0.00,ana\n\
             1,20.00,5.00,0.00,18.00,5.00,0.00,ana\n\
             2,30.00,0.00,1.00,30.00,0.00,1.00,\n\
             4,1.00,2.00,3.00,1.00,4.50,3.00,ana\n"
        );
        let file = create_temp_csv(&content);

        // Force multiple batches with a tiny batch size
        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(2, 2));
        let mut async_output = Vec::new();
        strategy.process(file.path(), &mut async_output).unwrap();

        let mut sync_output = Vec::new();
        crate::strategy::SyncProcessingStrategy
            .process(file.path(), &mut sync_output)
            .unwrap();

        // Output is deterministically sorted, so both strategies agree
        assert_eq!(async_output, sync_output);
        assert!(String::from_utf8(async_output)
            .unwrap()
            .contains("1,local-cash,expense,2.00,ana"));
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_batch_config_zero_values_fall_back() {
        let config = BatchConfig::new(0, 0);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.max_concurrent_batches, num_cpus::get());
    }
}
