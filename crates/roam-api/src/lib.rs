//! Roam HTTP API
//!
//! Thin boundary over the engine: REST endpoints for upload, job
//! submission, status, result download, and a WebSocket channel for live
//! progress. Handlers translate requests into registry and engine calls and
//! hold nothing but read snapshots.
//!
//! # Endpoints
//!
//! - `POST /api/upload` - ingest a tabular file (multipart, part `file`)
//! - `GET  /api/upload/{fileId}/sample` - first N rows
//! - `GET  /api/projections` - CRS catalog, filterable
//! - `POST /api/routing/batch` - submit a job
//! - `GET  /api/routing/status/{jobId}` - job snapshot
//! - `GET  /api/routing/results/{jobId}` - materialised outcomes
//! - `GET  /api/routing/export/{jobId}` - stream the feature collection
//! - `GET  /api/routing/metadata/{jobId}` - sibling metadata document
//! - `DELETE /api/routing/job/{jobId}` - cancel
//! - `DELETE /api/routing/job/{jobId}/cleanup` - purge a terminal job
//! - `GET  /api/health` - liveness
//! - `GET  /ws` - progress WebSocket

mod error;
mod routes;
mod state;
mod types;
mod ws;

pub use error::{ApiError, Result};
pub use routes::build_router;
pub use state::AppState;
pub use types::ApiResponse;
