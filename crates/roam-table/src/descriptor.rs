//! Upload descriptors

use std::borrow::Cow;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Character encoding detected for an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableEncoding {
    /// Valid UTF-8
    #[serde(rename = "utf-8")]
    Utf8,
    /// Anything that is not valid UTF-8 is read as Latin-1 / Windows-1252
    #[serde(rename = "latin-1")]
    Latin1,
}

impl TableEncoding {
    /// Decode raw upload bytes to text, dropping a leading byte-order mark
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let text = match self {
            // Detection already proved validity; lossy is a no-op here
            Self::Utf8 => String::from_utf8_lossy(bytes),
            Self::Latin1 => {
                let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
                text
            }
        };
        strip_bom(text)
    }

    /// Canonical label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
        }
    }
}

/// A BOM would otherwise end up glued to the first column name
fn strip_bom(text: Cow<'_, str>) -> Cow<'_, str> {
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(s.strip_prefix('\u{feff}').unwrap_or(s)),
        Cow::Owned(s) => match s.strip_prefix('\u{feff}') {
            Some(stripped) => Cow::Owned(stripped.to_string()),
            None => Cow::Owned(s),
        },
    }
}

/// Immutable description of an ingested upload
///
/// Everything here is fixed at ingest time; the raw bytes live at `path`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDescriptor {
    /// Random file identifier
    pub file_id: String,

    /// Original client-side file name (sanitised)
    pub original_name: String,

    /// Raw size in bytes
    pub size_bytes: u64,

    /// Detected character encoding
    pub encoding: TableEncoding,

    /// Detected field separator
    pub separator: char,

    /// Detected decimal mark (`.` or `,`)
    pub decimal_mark: char,

    /// Ordered column names from the header row
    pub columns: Vec<String>,

    /// Number of data rows (header excluded)
    pub row_count: u64,

    /// Ingest timestamp
    pub uploaded_at: DateTime<Utc>,

    /// On-disk location of the raw bytes
    #[serde(skip)]
    pub path: PathBuf,
}

impl UploadDescriptor {
    /// Whether the named column exists in this upload
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Whether numeric fields use a decimal comma
    pub fn decimal_comma(&self) -> bool {
        self.decimal_mark == ','
    }
}
