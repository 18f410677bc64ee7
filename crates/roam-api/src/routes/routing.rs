//! Routing job endpoints

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use roam_jobs::{Job, JobStatus, RoutingConfig};
use serde::Serialize;
use serde_json::Value;
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::ApiResponse;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// Identifier of the scheduled job
    pub job_id: String,
}

/// POST /api/routing/batch - submit a job
pub async fn submit(
    State(state): State<AppState>,
    Json(config): Json<RoutingConfig>,
) -> Result<Json<ApiResponse<SubmitResponse>>> {
    let job_id = state.engine.submit(config)?;
    Ok(Json(ApiResponse::new(SubmitResponse { job_id })))
}

/// GET /api/routing/status/{job_id} - current snapshot
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ApiResponse<Job>>> {
    Ok(Json(ApiResponse::new(state.registry.snapshot(&job_id)?)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    /// Job identifier
    pub job_id: String,
    /// Terminal status
    pub status: JobStatus,
    /// Final counters
    pub progress: roam_jobs::Progress,
    /// All successful outcomes as GeoJSON features
    pub features: Vec<Value>,
}

/// GET /api/routing/results/{job_id} - materialised outcomes
///
/// Convenience endpoint that loads the whole collection into one response;
/// `/export` is the streaming path for large results.
pub async fn results(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ApiResponse<ResultsResponse>>> {
    let job = completed_job(&state, &job_id)?;
    let collection = load_collection(&job).await?;

    let features = match collection.get("features") {
        Some(Value::Array(features)) => features.clone(),
        _ => Vec::new(),
    };

    Ok(Json(ApiResponse::new(ResultsResponse {
        job_id: job.id,
        status: job.status,
        progress: job.progress,
        features,
    })))
}

/// GET /api/routing/export/{job_id} - download the feature collection
///
/// Served straight from disk where possible: the file never materialises
/// in memory and `Content-Length` comes from its stat. When the file is no
/// longer streamable the successful outcomes are materialised in memory
/// instead, through the same read path `/results` uses.
pub async fn export(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response> {
    let job = completed_job(&state, &job_id)?;
    let filename = roam_output::result_file_name(&job_id);

    if let Some((path, size)) = state.registry.result_file(&job_id)?
        && let Ok(file) = tokio::fs::File::open(&path).await
    {
        let body = Body::from_stream(ReaderStream::new(file));
        return Ok((export_headers(&filename, size), body).into_response());
    }

    // Fallback: build the whole response body in memory
    let collection = load_collection(&job).await?;
    let body = serde_json::to_vec(&collection)
        .map_err(|e| ApiError::internal(format!("failed to serialise collection: {e}")))?;
    let size = body.len() as u64;
    Ok((export_headers(&filename, size), body).into_response())
}

fn export_headers(filename: &str, size: u64) -> [(header::HeaderName, String); 3] {
    [
        (header::CONTENT_TYPE, "application/geo+json".to_string()),
        (header::CONTENT_LENGTH, size.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ]
}

/// Read a completed job's collection into memory
async fn load_collection(job: &Job) -> Result<Value> {
    let path = job
        .result_path
        .as_ref()
        .ok_or_else(|| ApiError::not_found("result file for job", &job.id))?;
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::not_found("result file for job", &job.id)
        } else {
            ApiError::internal(format!("failed to read result file: {e}"))
        }
    })?;
    serde_json::from_str(&content)
        .map_err(|e| ApiError::internal(format!("corrupt result file: {e}")))
}

/// GET /api/routing/metadata/{job_id} - sibling metadata document
pub async fn metadata(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>> {
    let job = completed_job(&state, &job_id)?;

    let path = job
        .metadata_path
        .as_ref()
        .ok_or_else(|| ApiError::not_found("metadata for job", &job_id))?;
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ApiError::internal(format!("failed to read metadata: {e}")))?;
    let document = serde_json::from_str(&content)
        .map_err(|e| ApiError::internal(format!("corrupt metadata document: {e}")))?;
    Ok(Json(document))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Whether the signal was freshly set
    pub cancelled: bool,
}

/// DELETE /api/routing/job/{job_id} - cancel a job
pub async fn cancel(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ApiResponse<CancelResponse>>> {
    let cancelled = state.registry.cancel(&job_id)?;
    Ok(Json(ApiResponse::new(CancelResponse { cancelled })))
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    /// Whether a record (and its files) were purged
    pub purged: bool,
}

/// DELETE /api/routing/job/{job_id}/cleanup - purge a terminal job
pub async fn cleanup(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ApiResponse<CleanupResponse>>> {
    let purged = state.registry.cleanup(&job_id)?;
    Ok(Json(ApiResponse::new(CleanupResponse { purged })))
}

/// Fetch a job and require it to be completed
fn completed_job(state: &AppState, job_id: &str) -> Result<Job> {
    let job = state.registry.snapshot(job_id)?;
    if job.status != JobStatus::Completed {
        return Err(ApiError::JobNotCompleted);
    }
    Ok(job)
}
