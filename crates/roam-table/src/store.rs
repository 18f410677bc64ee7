//! Upload store
//!
//! Owns the upload directory and the in-memory registry of descriptors.
//! Ingest persists the raw bytes under `<fileId>_<originalName>` and
//! freezes a descriptor; everything downstream reads through it.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::descriptor::UploadDescriptor;
use crate::error::{Result, TableError};
use crate::rows::RowIterator;
use crate::sniff::TableFormat;

/// Registry of ingested uploads
pub struct UploadStore {
    dir: PathBuf,
    entries: RwLock<HashMap<String, Arc<UploadDescriptor>>>,
}

impl UploadStore {
    /// Create a store rooted at `dir`, creating the directory if missing
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| TableError::io(dir.display().to_string(), e))?;
        Ok(Self {
            dir,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Ingest an upload: sniff format, count rows, persist, register
    pub fn ingest(&self, original_name: &str, bytes: &[u8]) -> Result<Arc<UploadDescriptor>> {
        if bytes.is_empty() {
            return Err(TableError::EmptyUpload);
        }

        let format = TableFormat::detect(bytes);
        let text = format.encoding.decode(bytes);
        let (columns, row_count) = scan_table(&text, format.separator)?;

        let file_id = Uuid::new_v4().simple().to_string();
        let name = sanitise_name(original_name);
        let path = self.dir.join(format!("{file_id}_{name}"));

        std::fs::write(&path, bytes).map_err(|e| TableError::io(path.display().to_string(), e))?;

        let descriptor = Arc::new(UploadDescriptor {
            file_id: file_id.clone(),
            original_name: name,
            size_bytes: bytes.len() as u64,
            encoding: format.encoding,
            separator: format.separator,
            decimal_mark: format.decimal_mark,
            columns,
            row_count,
            uploaded_at: Utc::now(),
            path,
        });

        tracing::info!(
            file_id = %file_id,
            name = %descriptor.original_name,
            rows = row_count,
            separator = %descriptor.separator,
            encoding = descriptor.encoding.as_str(),
            "upload ingested"
        );

        self.entries.write().insert(file_id, Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Look up a descriptor
    pub fn get(&self, file_id: &str) -> Result<Arc<UploadDescriptor>> {
        self.entries
            .read()
            .get(file_id)
            .cloned()
            .ok_or_else(|| TableError::UnknownUpload(file_id.to_string()))
    }

    /// Open a fresh row iterator over an upload
    pub fn open_rows(&self, descriptor: &UploadDescriptor) -> Result<RowIterator> {
        RowIterator::open(descriptor)
    }

    /// First `limit` data rows, as field maps in row order
    pub fn sample(
        &self,
        file_id: &str,
        limit: usize,
    ) -> Result<(Arc<UploadDescriptor>, Vec<HashMap<String, String>>)> {
        let descriptor = self.get(file_id)?;
        let mut rows = Vec::with_capacity(limit.min(64));
        for row in RowIterator::open(&descriptor)?.take(limit) {
            if let crate::rows::TableRow::Values { fields, .. } = row? {
                rows.push(fields);
            }
        }
        Ok((descriptor, rows))
    }

    /// Drop an upload's record and raw file; true if it existed
    pub fn remove(&self, file_id: &str) -> bool {
        let Some(descriptor) = self.entries.write().remove(file_id) else {
            return false;
        };
        if let Err(e) = std::fs::remove_file(&descriptor.path) {
            tracing::warn!(
                file_id = %file_id,
                path = %descriptor.path.display(),
                error = %e,
                "failed to delete upload file"
            );
        }
        true
    }

    /// The upload directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of registered uploads
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no uploads
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Read the header and count data rows
fn scan_table(text: &str, separator: char) -> Result<(Vec<String>, u64)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(text.as_bytes().to_vec()));

    let columns: Vec<String> = reader
        .headers()
        .map_err(TableError::Read)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return Err(TableError::MissingHeader);
    }

    let mut row_count = 0u64;
    for record in reader.records() {
        // Unreadable records still occupy a row slot
        let _ = record;
        row_count += 1;
    }

    Ok((columns, row_count))
}

/// Keep the file name shell- and path-safe
fn sanitise_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".into()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
