//! Engine facade
//!
//! Validates a submission against the upload and the CRS catalog, allocates
//! the job record, and schedules its dispatcher. Submission returns the job
//! identifier immediately; the dispatcher runs on its own task.

use std::sync::Arc;

use roam_jobs::{JobRegistry, RoutingConfig};
use roam_osrm::RoutingClient;
use roam_proj::{CrsCatalog, ProjTransformer};
use roam_table::UploadStore;

use crate::dispatcher::Dispatcher;
use crate::error::{EngineError, FieldError};
use crate::metrics::EngineMetrics;

/// The only export format the streamed sink produces
const SUPPORTED_FORMAT: &str = "geojson";

/// Front door of the batch engine
#[derive(Clone)]
pub struct Engine {
    registry: Arc<JobRegistry>,
    uploads: Arc<UploadStore>,
    catalog: Arc<CrsCatalog>,
    transformer: Arc<ProjTransformer>,
    client: RoutingClient,
    batch_size: usize,
    window_size: usize,
    metrics: Arc<EngineMetrics>,
}

impl Engine {
    /// Create an engine
    ///
    /// `batch_size` is the B-window (rows per slice), `window_size` the
    /// K-window (concurrent daemon requests, clamped to `batch_size`).
    pub fn new(
        registry: Arc<JobRegistry>,
        uploads: Arc<UploadStore>,
        catalog: Arc<CrsCatalog>,
        transformer: Arc<ProjTransformer>,
        client: RoutingClient,
        batch_size: usize,
        window_size: usize,
    ) -> Self {
        Self {
            registry,
            uploads,
            catalog,
            transformer,
            client,
            batch_size: batch_size.max(1),
            window_size: window_size.clamp(1, batch_size.max(1)),
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Validate a submission, create the job, and schedule its dispatcher
    ///
    /// The returned identifier is immediately queryable; the job completes
    /// (or fails) asynchronously.
    pub fn submit(&self, config: RoutingConfig) -> Result<String, EngineError> {
        let descriptor = self
            .uploads
            .get(&config.file_id)
            .map_err(|_| EngineError::UnknownUpload(config.file_id.clone()))?;

        let mut errors = Vec::new();

        for (field, column) in [
            ("originFields.x", &config.origin_fields.x),
            ("originFields.y", &config.origin_fields.y),
            ("destinationFields.x", &config.destination_fields.x),
            ("destinationFields.y", &config.destination_fields.y),
        ] {
            if !descriptor.has_column(column) {
                errors.push(FieldError::new(
                    field,
                    format!("column '{column}' not present in upload"),
                ));
            }
        }

        if self.catalog.get(&config.crs).is_none() {
            errors.push(FieldError::new(
                "crs",
                format!("unknown reference system '{}'", config.crs),
            ));
        }

        if let Some(format) = &config.output_format
            && format != SUPPORTED_FORMAT
        {
            errors.push(FieldError::new(
                "outputFormat",
                format!("unsupported output format '{format}', expected '{SUPPORTED_FORMAT}'"),
            ));
        }

        if !errors.is_empty() {
            return Err(EngineError::Validation(errors));
        }

        let (job_id, cancel) = self.registry.create(config, descriptor.row_count);

        let dispatcher = Dispatcher {
            registry: Arc::clone(&self.registry),
            uploads: Arc::clone(&self.uploads),
            catalog: Arc::clone(&self.catalog),
            transformer: Arc::clone(&self.transformer),
            client: self.client.clone(),
            batch_size: self.batch_size,
            window_size: self.window_size,
            metrics: Arc::clone(&self.metrics),
        };

        let id = job_id.clone();
        tokio::spawn(async move {
            dispatcher.run(id, cancel).await;
        });

        Ok(job_id)
    }

    /// The registry this engine feeds
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Engine-wide counters
    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
