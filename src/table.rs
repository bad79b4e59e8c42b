//! Delimited table I/O.
//!
//! Intermediate files are plain CSV or TSV with a header row. Cells are
//! kept as strings; numeric formatting is a rendering concern.

use crate::config::FileFormat;
use crate::error::{SummaryError, SummaryResult};
use std::path::Path;
use tracing::debug;

/// A header row plus data rows of string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with the given header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// First row whose first cell equals `key`.
    pub fn row_by_key(&self, key: &str) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|row| row.first().map(String::as_str) == Some(key))
            .map(Vec::as_slice)
    }

    /// Read a delimited file.
    pub fn read(path: &Path, format: FileFormat) -> SummaryResult<Self> {
        let to_error = |source| SummaryError::TableRead {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(format.delimiter()?)
            .flexible(true)
            .from_path(path)
            .map_err(to_error)?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(to_error)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut table = Table::new(headers);
        for record in reader.records() {
            let record = record.map_err(to_error)?;
            table.push_row(record.iter().map(|c| c.trim().to_string()).collect());
        }

        debug!(
            "Read {} rows x {} columns from {}",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    /// Write a delimited file, replacing any existing one.
    pub fn write(&self, path: &Path, format: FileFormat) -> SummaryResult<()> {
        let to_error = |source| SummaryError::TableWrite {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(format.delimiter()?)
            .from_path(path)
            .map_err(to_error)?;

        writer.write_record(&self.headers).map_err(to_error)?;
        for row in &self.rows {
            writer.write_record(row).map_err(to_error)?;
        }
        writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_push_row_pads_to_width() {
        let mut table = Table::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        table.push_row(vec!["1".to_string()]);
        table.push_row(vec![
            "1".to_string(),
            "2".to_string(),
            "3".to_string(),
            "4".to_string(),
        ]);

        assert_eq!(table.rows[0], vec!["1", "", ""]);
        assert_eq!(table.rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_read_pandas_style_csv() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("exp_eval_short.csv");
        std::fs::write(
            &path,
            ",N,corr,QWK\nraw,100,0.71,0.65\nraw_trim,100,0.72,0.66\n",
        )
        .unwrap();

        let table = Table::read(&path, FileFormat::Csv).unwrap();
        assert_eq!(table.headers, vec!["", "N", "corr", "QWK"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_index("corr"), Some(2));
        assert_eq!(
            table.row_by_key("raw_trim"),
            Some(&["raw_trim".to_string(), "100".to_string(), "0.72".to_string(), "0.66".to_string()][..])
        );
    }

    #[test]
    fn test_tsv_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("table.tsv");

        let mut table = Table::new(vec!["feature".to_string(), "exp, one".to_string()]);
        table.push_row(vec!["length".to_string(), "0.25".to_string()]);
        table.write(&path, FileFormat::Tsv).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("feature\texp, one\n"));
        assert_eq!(Table::read(&path, FileFormat::Tsv).unwrap(), table);
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = Table::read(&temp_dir.path().join("nope.csv"), FileFormat::Csv);
        assert!(matches!(result, Err(SummaryError::TableRead { .. })));
    }
}
