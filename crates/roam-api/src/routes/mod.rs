//! Route assembly

mod ops;
mod projections;
mod routing;
mod upload;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{any, delete, get, post};

use crate::state::AppState;
use crate::ws;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Multipart framing costs a little beyond the raw file size
    let body_limit = state.max_upload_bytes + 64 * 1024;

    Router::new()
        .route("/api/health", get(ops::health))
        .route("/api/upload", post(upload::ingest))
        .route("/api/upload/{file_id}/sample", get(upload::sample))
        .route("/api/projections", get(projections::list))
        .route("/api/routing/batch", post(routing::submit))
        .route("/api/routing/status/{job_id}", get(routing::status))
        .route("/api/routing/results/{job_id}", get(routing::results))
        .route("/api/routing/export/{job_id}", get(routing::export))
        .route("/api/routing/metadata/{job_id}", get(routing::metadata))
        .route("/api/routing/job/{job_id}", delete(routing::cancel))
        .route("/api/routing/job/{job_id}/cleanup", delete(routing::cleanup))
        .route("/ws", any(ws::upgrade))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
