//! Operations routes
//!
//! Liveness and engine counters. No wrapper envelope here - monitors expect
//! `{"status": "ok", ...}` at the top level.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always "ok" when the process answers
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Seconds since startup
    pub uptime_secs: u64,
    /// Job record counts
    pub jobs: JobCounts,
    /// Engine counters since startup
    pub engine: roam_engine::EngineMetricsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct JobCounts {
    /// Non-terminal jobs
    pub live: usize,
    /// All retained records
    pub total: usize,
}

/// GET /api/health - liveness
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (live, total) = state.registry.job_counts();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
        jobs: JobCounts { live, total },
        engine: state.engine.metrics().snapshot(),
    })
}
