//! Lazy row iteration
//!
//! Each job opens its own iterator over the decoded upload; iteration is
//! once-only and ordered. Rows that cannot be decoded at all are yielded as
//! malformed records so the dispatcher can fail them without touching the
//! routing daemon - only filesystem-level failures are errors.

use std::collections::HashMap;
use std::io::Cursor;

use crate::descriptor::UploadDescriptor;
use crate::error::{Result, TableError};

/// One record from an uploaded table
#[derive(Debug, Clone)]
pub enum TableRow {
    /// A data row with its named field values
    Values {
        /// Zero-based data row index
        index: u64,
        /// Column name to raw value
        fields: HashMap<String, String>,
    },
    /// A row the reader could not produce values for
    Malformed {
        /// Zero-based data row index
        index: u64,
        /// What went wrong
        reason: String,
    },
}

impl TableRow {
    /// The row's position in the upload
    pub fn index(&self) -> u64 {
        match self {
            Self::Values { index, .. } | Self::Malformed { index, .. } => *index,
        }
    }
}

/// Ordered, once-only iterator over an upload's data rows
pub struct RowIterator {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<Cursor<Vec<u8>>>,
    index: u64,
}

impl RowIterator {
    /// Open an iterator over a decoded upload
    ///
    /// The descriptor's detected separator governs parsing; short records
    /// simply omit the missing columns.
    pub fn open(descriptor: &UploadDescriptor) -> Result<Self> {
        let bytes = std::fs::read(&descriptor.path)
            .map_err(|e| TableError::io(descriptor.path.display().to_string(), e))?;
        let text = descriptor.encoding.decode(&bytes).into_owned();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(descriptor.separator as u8)
            .has_headers(true)
            .flexible(true)
            .from_reader(Cursor::new(text.into_bytes()));

        let headers = reader
            .headers()
            .map_err(TableError::Read)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        Ok(Self {
            headers,
            records: reader.into_records(),
            index: 0,
        })
    }

    /// Column names from the header row
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl Iterator for RowIterator {
    type Item = Result<TableRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let index = self.index;
        self.index += 1;

        let row = match record {
            Ok(record) => {
                if record.iter().all(|f| f.trim().is_empty()) {
                    TableRow::Malformed {
                        index,
                        reason: "empty row".into(),
                    }
                } else {
                    let fields = self
                        .headers
                        .iter()
                        .zip(record.iter())
                        .map(|(name, value)| (name.clone(), value.trim().to_string()))
                        .collect();
                    TableRow::Values { index, fields }
                }
            }
            Err(e) => match e.kind() {
                // Disk-level failure kills the whole iteration
                csv::ErrorKind::Io(_) => return Some(Err(TableError::Read(e))),
                _ => TableRow::Malformed {
                    index,
                    reason: e.to_string(),
                },
            },
        };

        Some(Ok(row))
    }
}

/// Parse a coordinate field honouring the upload's decimal mark
///
/// Decimal commas are normalised to dots before conversion. Returns `None`
/// for empty, non-numeric, or non-finite values.
pub fn parse_coordinate(raw: &str, decimal_comma: bool) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalised = if decimal_comma {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };
    normalised.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
#[path = "rows_test.rs"]
mod rows_test;
