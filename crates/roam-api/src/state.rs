//! Application state
//!
//! Shared state for API handlers. Everything is injected - the registry,
//! the broadcaster, the upload store, and the engine all live here rather
//! than in process globals.

use std::sync::Arc;
use std::time::Instant;

use roam_engine::Engine;
use roam_jobs::{Broadcaster, JobRegistry};
use roam_proj::CrsCatalog;
use roam_table::UploadStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Batch engine (validation + dispatcher scheduling)
    pub engine: Engine,
    /// Job records and terminal transitions
    pub registry: Arc<JobRegistry>,
    /// Progress event fan-out
    pub broadcaster: Arc<Broadcaster>,
    /// Ingested uploads
    pub uploads: Arc<UploadStore>,
    /// Reference system catalog
    pub catalog: Arc<CrsCatalog>,
    /// Upload size cap in bytes
    pub max_upload_bytes: usize,
    /// Server start, for uptime reporting
    pub started: Instant,
}

impl AppState {
    /// Assemble the application state
    pub fn new(
        engine: Engine,
        registry: Arc<JobRegistry>,
        broadcaster: Arc<Broadcaster>,
        uploads: Arc<UploadStore>,
        catalog: Arc<CrsCatalog>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            engine,
            registry,
            broadcaster,
            uploads,
            catalog,
            max_upload_bytes,
            started: Instant::now(),
        }
    }
}
