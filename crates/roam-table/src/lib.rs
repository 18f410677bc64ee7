//! Tabular uploads for Roam
//!
//! Handles the life of an uploaded origin/destination table: persisting the
//! raw bytes, sniffing its format (character encoding, field separator,
//! decimal mark), and replaying it as an ordered, lazy sequence of
//! `(rowIndex, column -> value)` records.
//!
//! Rows are dynamic maps keyed by column name, not a fixed record type -
//! whatever columns the table carries ride along into the output features.

mod descriptor;
mod error;
mod rows;
mod sniff;
mod store;

pub use descriptor::{TableEncoding, UploadDescriptor};
pub use error::{Result, TableError};
pub use rows::{RowIterator, TableRow, parse_coordinate};
pub use sniff::TableFormat;
pub use store::UploadStore;
