//! The batch dispatcher
//!
//! One instance per job, consumed by its task. Drives the row pipeline in
//! B-windows, fans requests out in K-windows, folds outcomes back in row
//! order, and owns the job's terminal transition.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use roam_geometry::GeometryMode;
use roam_jobs::{JobRegistry, RoutingConfig};
use roam_osrm::{RouteOutcome, RouteRequest, RoutingClient};
use roam_output::{FeatureCollectionWriter, RouteFeature, RunTiming};
use roam_proj::{CrsCatalog, CrsDescriptor, ProjTransformer};
use roam_table::{RowIterator, TableRow, UploadDescriptor, UploadStore, parse_coordinate};
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::metrics::EngineMetrics;

pub(crate) struct Dispatcher {
    pub(crate) registry: Arc<JobRegistry>,
    pub(crate) uploads: Arc<UploadStore>,
    pub(crate) catalog: Arc<CrsCatalog>,
    pub(crate) transformer: Arc<ProjTransformer>,
    pub(crate) client: RoutingClient,
    pub(crate) batch_size: usize,
    pub(crate) window_size: usize,
    pub(crate) metrics: Arc<EngineMetrics>,
}

/// A row after local parsing and reprojection
enum PreparedRow {
    /// Ready for the routing daemon
    Route {
        index: u64,
        fields: HashMap<String, String>,
        request: RouteRequest,
    },
    /// Failed before any daemon call
    Failed { index: u64, reason: String },
}

impl Dispatcher {
    /// Drive the job to its terminal state
    pub(crate) async fn run(self, job_id: String, cancel: CancellationToken) {
        self.metrics.job_started();

        let config = match self.registry.snapshot(&job_id) {
            Ok(job) => job.configuration,
            // Record evicted before we even started; nothing to do
            Err(_) => return,
        };
        if self.registry.begin(&job_id).is_err() {
            return;
        }

        match self.initialise(&job_id, &config).await {
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "job initialisation failed");
                self.registry.fail(&job_id, e.to_string());
                self.metrics.job_failed();
            }
            Ok((descriptor, crs, mut rows, mut writer)) => {
                tracing::info!(
                    job_id = %job_id,
                    rows = descriptor.row_count,
                    crs = %crs.code,
                    batch_size = self.batch_size,
                    window_size = self.window_size,
                    "dispatch starting"
                );

                let mode = GeometryMode::from_policy(&config.geometry);
                let decimal_comma = descriptor.decimal_comma();

                let pumped = self
                    .pump(
                        &job_id,
                        &config,
                        &crs,
                        decimal_comma,
                        mode,
                        &mut rows,
                        &mut writer,
                        &cancel,
                    )
                    .await;

                match pumped {
                    Err(e) => {
                        tracing::error!(job_id = %job_id, error = %e, "job failed");
                        writer.abort().await;
                        self.registry.fail(&job_id, e.to_string());
                        self.metrics.job_failed();
                    }
                    Ok(()) if cancel.is_cancelled() => {
                        writer.abort().await;
                        // The registry reports the reason the signal carried
                        // ("cancelled by user" or a housekeeping timeout)
                        if self.registry.fail_cancelled(&job_id) {
                            tracing::info!(job_id = %job_id, "job cancelled");
                        }
                        self.metrics.job_failed();
                    }
                    Ok(()) => self.finish(&job_id, &config, writer).await,
                }
            }
        }
    }

    /// Open everything the pump needs; any failure here is job-fatal
    async fn initialise(
        &self,
        job_id: &str,
        config: &RoutingConfig,
    ) -> Result<
        (
            Arc<UploadDescriptor>,
            CrsDescriptor,
            RowIterator,
            FeatureCollectionWriter,
        ),
        DispatchError,
    > {
        let descriptor = self.uploads.get(&config.file_id)?;
        let crs = self
            .catalog
            .get(&config.crs)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownCrs(config.crs.clone()))?;

        // A proj4 definition that cannot compile would fail every row;
        // surface it before the first one.
        self.transformer.prepare(&crs)?;

        let rows = self.uploads.open_rows(&descriptor)?;
        let writer = FeatureCollectionWriter::open(self.registry.results_dir(), job_id).await?;
        Ok((descriptor, crs, rows, writer))
    }

    /// The B-window loop
    ///
    /// Returns `Ok(())` on iterator exhaustion or observed cancellation;
    /// `Err` only for job-fatal failures (iterator I/O, sink write).
    #[allow(clippy::too_many_arguments)]
    async fn pump(
        &self,
        job_id: &str,
        config: &RoutingConfig,
        crs: &CrsDescriptor,
        decimal_comma: bool,
        mode: GeometryMode,
        rows: &mut RowIterator,
        writer: &mut FeatureCollectionWriter,
        cancel: &CancellationToken,
    ) -> Result<(), DispatchError> {
        loop {
            // Collect one B-window, sampling cancellation between decodes
            let mut window = Vec::with_capacity(self.batch_size);
            while window.len() < self.batch_size && !cancel.is_cancelled() {
                match rows.next() {
                    Some(Ok(row)) => window.push(row),
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
            if window.is_empty() {
                return Ok(());
            }

            let mut prepared: Vec<PreparedRow> = window
                .into_iter()
                .map(|row| self.prepare_row(config, crs, decimal_comma, row))
                .collect();

            // Routable rows, by slot in `prepared`
            let routable: Vec<(usize, RouteRequest)> = prepared
                .iter()
                .enumerate()
                .filter_map(|(slot, row)| match row {
                    PreparedRow::Route { request, .. } => Some((slot, *request)),
                    PreparedRow::Failed { .. } => None,
                })
                .collect();

            // Fan out K at a time; requests within a window race, windows
            // themselves run in sequence
            let mut outcomes: Vec<Option<RouteOutcome>> = vec![None; prepared.len()];
            for chunk in routable.chunks(self.window_size) {
                // Once cancelled, no new window starts
                if cancel.is_cancelled() {
                    break;
                }
                let requests: Vec<RouteRequest> = chunk.iter().map(|(_, r)| *r).collect();
                let results = self.client.calculate_window(&requests, cancel).await;
                for ((slot, _), outcome) in chunk.iter().zip(results) {
                    outcomes[*slot] = Some(outcome);
                }
            }

            // Fold outcomes back in row order; only rows that actually
            // reached an outcome touch the counters
            let mut successful = 0u64;
            let mut failed = 0u64;
            for (slot, row) in prepared.drain(..).enumerate() {
                match row {
                    PreparedRow::Failed { index, reason } => {
                        tracing::debug!(
                            job_id = %job_id,
                            row = index,
                            reason = %reason,
                            "row failed before routing"
                        );
                        failed += 1;
                    }
                    PreparedRow::Route { index, fields, .. } => match outcomes[slot].take() {
                        // Cancellation struck before this row's window
                        None => {}
                        Some(Err(failure)) => {
                            tracing::debug!(
                                job_id = %job_id,
                                row = index,
                                reason = failure.reason(),
                                "route failed"
                            );
                            failed += 1;
                        }
                        Some(Ok(route)) => {
                            let feature = RouteFeature {
                                row_index: index,
                                fields,
                                distance: route.distance,
                                duration: route.duration,
                                line: mode.apply(route.line),
                            };
                            writer.write_feature(&feature).await?;
                            successful += 1;
                        }
                    },
                }
            }

            self.metrics.window(successful, failed);
            self.registry.record_window(job_id, successful, failed);

            if cancel.is_cancelled() {
                return Ok(());
            }
        }
    }

    /// Parse the four coordinate fields and reproject both endpoints
    fn prepare_row(
        &self,
        config: &RoutingConfig,
        crs: &CrsDescriptor,
        decimal_comma: bool,
        row: TableRow,
    ) -> PreparedRow {
        let (index, fields) = match row {
            TableRow::Malformed { index, reason } => {
                return PreparedRow::Failed { index, reason };
            }
            TableRow::Values { index, fields } => (index, fields),
        };

        let coordinate = |name: &str| {
            fields
                .get(name)
                .and_then(|raw| parse_coordinate(raw, decimal_comma))
        };

        let parsed = (
            coordinate(&config.origin_fields.x),
            coordinate(&config.origin_fields.y),
            coordinate(&config.destination_fields.x),
            coordinate(&config.destination_fields.y),
        );
        let (Some(ox), Some(oy), Some(dx), Some(dy)) = parsed else {
            return PreparedRow::Failed {
                index,
                reason: "missing or non-numeric coordinate".into(),
            };
        };

        let origin = match self.transformer.to_wgs84(ox, oy, crs) {
            Ok(point) => point,
            Err(e) => {
                return PreparedRow::Failed {
                    index,
                    reason: e.to_string(),
                };
            }
        };
        let destination = match self.transformer.to_wgs84(dx, dy, crs) {
            Ok(point) => point,
            Err(e) => {
                return PreparedRow::Failed {
                    index,
                    reason: e.to_string(),
                };
            }
        };

        PreparedRow::Route {
            index,
            fields,
            request: RouteRequest {
                origin,
                destination,
            },
        }
    }

    /// Close the sink and mark the job completed
    async fn finish(&self, job_id: &str, config: &RoutingConfig, writer: FeatureCollectionWriter) {
        let Ok(job) = self.registry.snapshot(job_id) else {
            writer.abort().await;
            return;
        };

        let timing = RunTiming {
            started_at: job.started_at.unwrap_or(job.created_at),
            completed_at: Utc::now(),
        };
        let configuration = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);
        let progress = job.progress;

        match writer
            .close(
                progress.total,
                progress.successful,
                progress.failed,
                timing,
                configuration,
            )
            .await
        {
            Ok(files) => {
                if self.registry.complete(job_id, files.clone()) {
                    tracing::info!(
                        job_id = %job_id,
                        successful = progress.successful,
                        failed = progress.failed,
                        "job completed"
                    );
                    self.metrics.job_completed();
                } else {
                    // The job somehow went terminal under us; a failed job
                    // leaves no result files behind.
                    let _ = tokio::fs::remove_file(&files.result_path).await;
                    let _ = tokio::fs::remove_file(&files.metadata_path).await;
                    self.metrics.job_failed();
                }
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "failed to close result file");
                self.registry.fail(job_id, format!("failed to finalise results: {e}"));
                self.metrics.job_failed();
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod dispatcher_test;
