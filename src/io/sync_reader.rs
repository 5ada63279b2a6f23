//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over count sheets from a CSV export.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! The SheetReader uses csv::Reader to read and deserialize CSV records
//! sequentially, one sheet at a time, without loading the entire export
//! into memory.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record parsing errors are yielded as Err variants in the
//!   iterator, with line numbers for debugging

use crate::io::csv_format::{convert_count_sheet, CountSheet, CsvCountSheet};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous count-sheet reader
///
/// Provides an iterator interface over count sheets. Maintains streaming
/// behavior with constant memory usage.
#[derive(Debug)]
pub struct SheetReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SheetReader {
    /// Create a new SheetReader from a file path
    ///
    /// Opens the CSV file and prepares it for streaming iteration. The
    /// CSV reader is configured to trim whitespace and allow flexible
    /// field counts (the trailing authorizer column is optional).
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(SheetReader)` if the file opened successfully
    /// * `Err(String)` if the file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SheetReader {
    type Item = Result<CountSheet, String>;

    /// Get the next count sheet from the CSV file
    ///
    /// # Returns
    ///
    /// * `Some(Ok(CountSheet))` - Successfully parsed sheet
    /// * `Some(Err(String))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvCountSheet>();

        match deserializer.next()? {
            Ok(record) => {
                self.line_num += 1;
                Some(
                    convert_count_sheet(record)
                        .map_err(|e| format!("Line {}: {}", self.line_num + 1, e)),
                )
            }
            Err(e) => {
                self.line_num += 1;
                Some(Err(format!(
                    "Line {}: CSV parse error: {}",
                    self.line_num + 1,
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Instrument;
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
    fn test_sheet_reader_new_opens_file() {
        let content = format!("{HEADER}1,1500.00,100.00,0.00,1500.00,100.00,0.00,\n");
        let file = create_temp_csv(&content);

        assert!(SheetReader::new(file.path()).is_ok());
    }

    #[test]
    fn test_sheet_reader_new_fails_on_missing_file() {
        let result = SheetReader::new(Path::new("nonexistent.csv"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sheet_reader_iterates_valid_sheet() {
        let content = format!("{HEADER}1,1500.00,100.00,0.00,1600.00,100.00,0.00,supervisor\n");
        let file = create_temp_csv(&content);

        let sheets: Vec<_> = SheetReader::new(file.path()).unwrap().collect();

        assert_eq!(sheets.len(), 1);
        let sheet = sheets[0].as_ref().unwrap();
        assert_eq!(sheet.drawer, 1);
        assert_eq!(
            sheet.counted.get(Instrument::LocalCash),
            Some("1600.00".parse().unwrap())
        );
        assert_eq!(sheet.authorized_by.as_deref(), Some("supervisor"));
    }

    #[test]
    fn test_sheet_reader_includes_line_numbers_in_errors() {
        let content = format!(
            "{HEADER}1,1500.00,100.00,0.00,1500.00,100.00,0.00,\n\
             2,bogus,100.00,0.00,100.00,100.00,0.00,\n\
             3,10.00,0.00,0.00,10.00,0.00,0.00,\n"
        );
        let file = create_temp_csv(&content);

        let sheets: Vec<_> = SheetReader::new(file.path()).unwrap().collect();

        assert_eq!(sheets.len(), 3);
        assert!(sheets[0].is_ok());
        assert!(sheets[1].is_err());
        assert!(sheets[2].is_ok());

        let error = sheets[1].as_ref().unwrap_err();
        assert!(error.contains("Line 3")); // header occupies line 1
        assert!(error.contains("Invalid expected_local"));
    }

    #[test]
    fn test_sheet_reader_handles_missing_trailing_column() {
        // No authorized_by column at all
        let content = "drawer,expected_local,expected_foreign,expected_mobile,counted_local,counted_foreign,counted_mobile\n\
                       4,10.00,0.00,0.00,10.00,0.00,0.00\n";
        let file = create_temp_csv(content);

        let sheets: Vec<_> = SheetReader::new(file.path()).unwrap().collect();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].as_ref().unwrap().authorized_by, None);
    }

    #[test]
    fn test_sheet_reader_handles_empty_file_after_header() {
        let file = create_temp_csv(HEADER);
        let sheets: Vec<_> = SheetReader::new(file.path()).unwrap().collect();
        assert!(sheets.is_empty());
    }

    #[test]
    fn test_sheet_reader_handles_whitespace() {
        let content = format!("{HEADER}  1 , 1500.00 , 100.00 , 0.00 , 1500.00 , 100.00 , 0.00 ,\n");
        let file = create_temp_csv(&content);

        let sheets: Vec<_> = SheetReader::new(file.path()).unwrap().collect();
        assert_eq!(sheets.len(), 1);
        assert!(sheets[0].is_ok());
    }
}
