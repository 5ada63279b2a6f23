//! I/O module
//!
//! Handles CSV parsing and output for batch count-sheet processing.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (sheet conversion, adjustment output)
//! - `sync_reader` - Synchronous count-sheet reader with iterator interface
//! - `async_reader` - Asynchronous count-sheet reader with batch interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncSheetReader;
pub use csv_format::{convert_count_sheet, write_adjustments_csv, CountSheet, CsvCountSheet};
pub use sync_reader::SheetReader;
