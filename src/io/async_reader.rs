//! Asynchronous CSV reader with batch interface
//!
//! Provides a batch-reading interface over count sheets from a CSV
//! export, for the asynchronous processing strategy.
//!
//! # Design
//!
//! The AsyncSheetReader uses:
//! - csv-async for streaming CSV parsing
//! - batch reading so the strategy can bound how much work is in flight

use crate::io::csv_format::{convert_count_sheet, CountSheet, CsvCountSheet};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous count-sheet reader
///
/// Provides batch reading over count sheets. Maintains streaming
/// behavior with constant memory usage.
pub struct AsyncSheetReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncSheetReader<R> {
    /// Create a new AsyncSheetReader from an async reader
    ///
    /// # Arguments
    ///
    /// * `reader` - Async reader providing CSV data
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read a batch of count sheets
    ///
    /// Reads up to `batch_size` records, converting them to domain
    /// sheets. Invalid records are logged and skipped.
    ///
    /// # Arguments
    ///
    /// * `batch_size` - Maximum number of sheets to read
    ///
    /// # Returns
    ///
    /// A vector of successfully converted sheets. Returns an empty
    /// vector when the end of the file is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<CountSheet> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvCountSheet>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => match convert_count_sheet(record) {
                    Ok(sheet) => batch.push(sheet),
                    Err(e) => warn!("sheet conversion error: {e}"),
                },
                Some(Err(e)) => warn!("CSV parse error: {e}"),
                None => break,
            }
        }

        batch
    }
}
