//! Incremental feature collection writer

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::Result;
use crate::feature::RouteFeature;
use crate::{metadata_file_name, result_file_name};

const HEADER: &str = "{\"type\":\"FeatureCollection\",\"features\":[\n";
const FOOTER: &str = "\n]}\n";

/// Aggregate numbers for the metadata document
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Rows in the upload
    pub total: u64,
    /// Rows with a routed feature
    pub successful: u64,
    /// Rows that failed
    pub failed: u64,
    /// Sum of routed distances in metres
    pub total_distance: f64,
    /// Sum of routed durations in seconds
    pub total_duration: f64,
}

/// Job wall-clock timing for the metadata document
#[derive(Debug, Clone, Copy)]
pub struct RunTiming {
    /// When the dispatcher started
    pub started_at: DateTime<Utc>,
    /// When the job reached its terminal state
    pub completed_at: DateTime<Utc>,
}

/// Where a closed collection ended up
#[derive(Debug, Clone)]
pub struct ResultFiles {
    /// The feature collection
    pub result_path: PathBuf,
    /// The sibling metadata document
    pub metadata_path: PathBuf,
}

/// Streaming writer for one job's feature collection
///
/// Features are appended as they arrive; the collection only gains a valid
/// footer on [`close`](Self::close). A writer dropped or
/// [`abort`](Self::abort)ed leaves no partial file behind a valid footer.
pub struct FeatureCollectionWriter {
    writer: BufWriter<File>,
    job_id: String,
    result_path: PathBuf,
    metadata_path: PathBuf,
    features_written: u64,
    total_distance: f64,
    total_duration: f64,
}

impl FeatureCollectionWriter {
    /// Create the result file for a job and write the collection header
    pub async fn open(results_dir: &Path, job_id: &str) -> Result<Self> {
        tokio::fs::create_dir_all(results_dir).await?;

        let result_path = results_dir.join(result_file_name(job_id));
        let metadata_path = results_dir.join(metadata_file_name(job_id));

        let file = File::create(&result_path).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(HEADER.as_bytes()).await?;

        Ok(Self {
            writer,
            job_id: job_id.to_string(),
            result_path,
            metadata_path,
            features_written: 0,
            total_distance: 0.0,
            total_duration: 0.0,
        })
    }

    /// Append one feature
    pub async fn write_feature(&mut self, feature: &RouteFeature) -> Result<()> {
        let serialised = serde_json::to_vec(&feature.to_geojson())?;

        if self.features_written > 0 {
            self.writer.write_all(b",\n").await?;
        }
        self.writer.write_all(&serialised).await?;

        self.features_written += 1;
        self.total_distance += feature.distance;
        self.total_duration += feature.duration;
        Ok(())
    }

    /// Number of features appended so far
    pub fn features_written(&self) -> u64 {
        self.features_written
    }

    /// Cumulative distance and duration of written features
    pub fn totals(&self) -> (f64, f64) {
        (self.total_distance, self.total_duration)
    }

    /// Finish the collection and atomically write the sibling metadata
    ///
    /// `total`/`successful`/`failed` come from the job's final counters;
    /// `configuration` is the effective routing configuration, embedded
    /// verbatim. A failure during close deletes the partial result file
    /// before propagating - a collection is either whole or absent.
    pub async fn close(
        self,
        total: u64,
        successful: u64,
        failed: u64,
        timing: RunTiming,
        configuration: serde_json::Value,
    ) -> Result<ResultFiles> {
        let result_path = self.result_path.clone();
        match self
            .finalise(total, successful, failed, timing, configuration)
            .await
        {
            Ok(files) => Ok(files),
            Err(e) => {
                let _ = tokio::fs::remove_file(&result_path).await;
                Err(e)
            }
        }
    }

    async fn finalise(
        mut self,
        total: u64,
        successful: u64,
        failed: u64,
        timing: RunTiming,
        configuration: serde_json::Value,
    ) -> Result<ResultFiles> {
        self.writer.write_all(FOOTER.as_bytes()).await?;
        self.writer.flush().await?;
        self.writer.get_ref().sync_all().await?;

        let summary = RunSummary {
            total,
            successful,
            failed,
            total_distance: self.total_distance,
            total_duration: self.total_duration,
        };

        let duration_ms = (timing.completed_at - timing.started_at)
            .num_milliseconds()
            .max(0);

        let metadata = json!({
            "jobId": self.job_id,
            "generatedAt": Utc::now(),
            "summary": summary,
            "timing": {
                "startedAt": timing.started_at,
                "completedAt": timing.completed_at,
                "durationMs": duration_ms,
            },
            "configuration": configuration,
            "files": {
                "result": result_file_name(&self.job_id),
                "metadata": metadata_file_name(&self.job_id),
            },
        });

        // Write-then-rename keeps the metadata either absent or whole
        let tmp_path = self.metadata_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, serde_json::to_vec_pretty(&metadata)?).await?;
        tokio::fs::rename(&tmp_path, &self.metadata_path).await?;

        tracing::debug!(
            job_id = %self.job_id,
            features = self.features_written,
            path = %self.result_path.display(),
            "feature collection closed"
        );

        Ok(ResultFiles {
            result_path: self.result_path,
            metadata_path: self.metadata_path,
        })
    }

    /// Discard the collection: delete the partial result file
    ///
    /// Used on job failure and cancellation. The footer is never written, so
    /// even a racing reader cannot mistake the remains for a complete
    /// collection.
    pub async fn abort(self) {
        // Drop the buffered writer before unlinking
        let path = self.result_path.clone();
        drop(self.writer);
        if let Err(e) = tokio::fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to delete partial result file"
            );
        }
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
