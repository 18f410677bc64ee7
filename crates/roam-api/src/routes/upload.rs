//! Upload endpoints

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::ApiResponse;

/// POST /api/upload - ingest a tabular file
///
/// Expects a single multipart part named `file`. Encoding, separator, and
/// decimal mark are sniffed; the descriptor comes back to the client for
/// the column-mapping step.
pub async fn ingest(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<roam_table::UploadDescriptor>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .unwrap_or("upload.csv")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;

        if bytes.len() > state.max_upload_bytes {
            return Err(ApiError::BadRequest(format!(
                "file size {} exceeds limit {}",
                bytes.len(),
                state.max_upload_bytes
            )));
        }

        let descriptor = state.uploads.ingest(&original_name, &bytes)?;
        return Ok(Json(ApiResponse::new((*descriptor).clone())));
    }

    Err(ApiError::BadRequest("missing multipart part 'file'".into()))
}

#[derive(Debug, Deserialize)]
pub struct SampleParams {
    /// Number of rows to return
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResponse {
    /// Column names
    pub headers: Vec<String>,
    /// First rows as field maps
    pub sample: Vec<HashMap<String, String>>,
    /// Data rows in the whole upload
    pub total_rows: u64,
}

/// GET /api/upload/{file_id}/sample - first N data rows
pub async fn sample(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(params): Query<SampleParams>,
) -> Result<Json<ApiResponse<SampleResponse>>> {
    let limit = params.limit.unwrap_or(10).min(1000);
    let (descriptor, rows) = state.uploads.sample(&file_id, limit)?;

    Ok(Json(ApiResponse::new(SampleResponse {
        headers: descriptor.columns.clone(),
        sample: rows,
        total_rows: descriptor.row_count,
    })))
}
