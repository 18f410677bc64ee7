//! The job registry
//!
//! Single owner of all job records. Mutations go through short write-lock
//! sections; events are published after the lock is released. State only
//! moves forward: once a job is terminal its counters are frozen and no
//! later call can transition it again.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use roam_output::ResultFiles;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::broadcast::{Broadcaster, EventKind, JobEvent};
use crate::error::{JobError, Result};
use crate::model::{Job, JobStatus, RoutingConfig};

/// Terminal message for a user-initiated cancellation
const CANCELLED_BY_USER: &str = "cancelled by user";

/// Terminal message when housekeeping cancels an overrunning job
const TIMEOUT_EXCEEDED: &str = "job timeout exceeded";

/// Retention limits for the housekeeping loop
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Terminal job records kept in memory
    pub max_jobs_kept: usize,
    /// Result file pairs kept on disk
    pub max_results_kept: usize,
    /// Cancel jobs that process longer than this
    pub job_timeout: Option<Duration>,
    /// Delete files when a record is evicted
    pub immediate_cleanup: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_jobs_kept: 100,
            max_results_kept: 200,
            job_timeout: None,
            immediate_cleanup: false,
        }
    }
}

struct JobEntry {
    job: Job,
    cancel: CancellationToken,
    /// Why the signal was set, when it was not the user (e.g. a timeout)
    cancel_reason: Option<String>,
}

/// Owner of all live and retained job records
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobEntry>>,
    broadcaster: Arc<Broadcaster>,
    results_dir: PathBuf,
    retention: RetentionPolicy,
}

impl JobRegistry {
    /// Create a registry writing results under `results_dir`
    pub fn new(
        broadcaster: Arc<Broadcaster>,
        results_dir: impl Into<PathBuf>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            broadcaster,
            results_dir: results_dir.into(),
            retention,
        }
    }

    /// The broadcaster jobs publish through
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Where result files are written
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Allocate a new pending job
    ///
    /// Returns the fresh identifier and its cancellation token. The caller
    /// is responsible for scheduling a dispatcher; the identifier is valid
    /// immediately.
    pub fn create(&self, configuration: RoutingConfig, total: u64) -> (String, CancellationToken) {
        let id = Uuid::new_v4().simple().to_string();
        let cancel = CancellationToken::new();

        let job = Job {
            id: id.clone(),
            status: JobStatus::Pending,
            progress: crate::Progress {
                total,
                ..Default::default()
            },
            started_at: None,
            completed_at: None,
            configuration,
            error: None,
            result_path: None,
            metadata_path: None,
            created_at: Utc::now(),
        };

        self.jobs.write().insert(
            id.clone(),
            JobEntry {
                job,
                cancel: cancel.clone(),
                cancel_reason: None,
            },
        );

        tracing::info!(job_id = %id, total, "job created");
        (id, cancel)
    }

    /// Read snapshot of a job
    pub fn snapshot(&self, job_id: &str) -> Result<Job> {
        self.jobs
            .read()
            .get(job_id)
            .map(|entry| entry.job.clone())
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Mark a pending job as processing
    pub fn begin(&self, job_id: &str) -> Result<()> {
        let mut jobs = self.jobs.write();
        let entry = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        if entry.job.status == JobStatus::Pending {
            entry.job.status = JobStatus::Processing;
            entry.job.started_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Fold one dispatch window into the job's counters and publish a
    /// progress event
    ///
    /// Each row contributes one `processed` increment plus either
    /// `successful` or `failed`. Calls against a terminal job are ignored -
    /// frozen means frozen.
    pub fn record_window(&self, job_id: &str, successful: u64, failed: u64) {
        let event = {
            let mut jobs = self.jobs.write();
            let Some(entry) = jobs.get_mut(job_id) else {
                return;
            };
            if entry.job.status.is_terminal() {
                return;
            }
            entry.job.progress.successful += successful;
            entry.job.progress.failed += failed;
            entry.job.progress.processed += successful + failed;
            JobEvent {
                job_id: job_id.to_string(),
                kind: EventKind::Progress,
                progress: Some(entry.job.progress),
                status: Some(entry.job.status),
            }
        };
        self.broadcaster.publish(&event);
    }

    /// Transition a job to `completed`
    ///
    /// Returns false when the job was already terminal (the transition is
    /// forward-only and happens at most once).
    pub fn complete(&self, job_id: &str, files: ResultFiles) -> bool {
        self.finish(job_id, |job| {
            job.status = JobStatus::Completed;
            job.result_path = Some(files.result_path.clone());
            job.metadata_path = Some(files.metadata_path.clone());
            EventKind::Completed
        })
    }

    /// Terminal transition for a job whose cancellation signal fired
    ///
    /// Called by the dispatcher once it has drained. The message is the
    /// reason recorded when the signal was set; a plain user cancellation
    /// reports "cancelled by user".
    pub fn fail_cancelled(&self, job_id: &str) -> bool {
        let reason = self
            .jobs
            .read()
            .get(job_id)
            .and_then(|entry| entry.cancel_reason.clone())
            .unwrap_or_else(|| CANCELLED_BY_USER.to_string());
        self.fail(job_id, reason)
    }

    /// Transition a job to `failed` with a terminal error message
    pub fn fail(&self, job_id: &str, error: impl Into<String>) -> bool {
        let error = error.into();
        self.finish(job_id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(error.clone());
            EventKind::Failed
        })
    }

    fn finish(&self, job_id: &str, apply: impl FnOnce(&mut Job) -> EventKind) -> bool {
        let event = {
            let mut jobs = self.jobs.write();
            let Some(entry) = jobs.get_mut(job_id) else {
                return false;
            };
            if entry.job.status.is_terminal() {
                return false;
            }
            let kind = apply(&mut entry.job);
            entry.job.completed_at = Some(Utc::now());
            JobEvent {
                job_id: job_id.to_string(),
                kind,
                progress: Some(entry.job.progress),
                status: Some(entry.job.status),
            }
        };

        tracing::info!(job_id = %job_id, status = ?event.status, "job finished");
        self.broadcaster.publish(&event);
        true
    }

    /// Request cancellation of a job
    ///
    /// Returns true iff the signal was freshly set on a non-terminal job;
    /// idempotent otherwise.
    pub fn cancel(&self, job_id: &str) -> Result<bool> {
        let jobs = self.jobs.read();
        let entry = jobs
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        if entry.job.status.is_terminal() || entry.cancel.is_cancelled() {
            return Ok(false);
        }
        entry.cancel.cancel();
        tracing::info!(job_id = %job_id, "job cancellation requested");
        Ok(true)
    }

    /// Cancel every non-terminal job (graceful shutdown)
    pub fn cancel_all(&self) -> usize {
        let jobs = self.jobs.read();
        let mut cancelled = 0;
        for entry in jobs.values() {
            if !entry.job.status.is_terminal() && !entry.cancel.is_cancelled() {
                entry.cancel.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Purge a terminal job: delete its files and drop its record
    ///
    /// Returns true if a record was purged; false for an unknown (possibly
    /// already purged) identifier. A live job is an error. The original
    /// upload is untouched.
    pub fn cleanup(&self, job_id: &str) -> Result<bool> {
        let entry = {
            let mut jobs = self.jobs.write();
            match jobs.get(job_id).map(|e| e.job.status.is_terminal()) {
                None => return Ok(false),
                Some(false) => return Err(JobError::NotTerminal(job_id.to_string())),
                Some(true) => {}
            }
            let Some(entry) = jobs.remove(job_id) else {
                return Ok(false);
            };
            entry
        };

        self.broadcaster.drop_job(job_id);
        remove_job_files(&entry.job)?;
        tracing::info!(job_id = %job_id, "job purged");
        Ok(true)
    }

    /// Stat the job's result file, if it exists on disk
    pub fn result_file(&self, job_id: &str) -> Result<Option<(PathBuf, u64)>> {
        let snapshot = self.snapshot(job_id)?;
        let Some(path) = snapshot.result_path else {
            return Ok(None);
        };
        match std::fs::metadata(&path) {
            Ok(meta) => Ok(Some((path, meta.len()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(JobError::Io(e)),
        }
    }

    /// `(live, total)` job record counts
    pub fn job_counts(&self) -> (usize, usize) {
        let jobs = self.jobs.read();
        let live = jobs
            .values()
            .filter(|e| !e.job.status.is_terminal())
            .count();
        (live, jobs.len())
    }

    /// One housekeeping pass: job timeouts, record eviction, result pruning
    pub fn housekeep(&self) {
        self.enforce_job_timeout();
        self.evict_terminal_records();
        self.prune_result_files();
    }

    /// Run housekeeping every `interval` until `shutdown` fires
    pub fn spawn_housekeeping(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => registry.housekeep(),
                }
            }
        })
    }

    fn enforce_job_timeout(&self) {
        let Some(timeout) = self.retention.job_timeout else {
            return;
        };
        let now = Utc::now();
        let expired: Vec<(String, CancellationToken)> = {
            let mut jobs = self.jobs.write();
            jobs.values_mut()
                .filter(|e| e.job.status == JobStatus::Processing && !e.cancel.is_cancelled())
                .filter(|e| match e.job.started_at {
                    Some(started) => {
                        (now - started).num_seconds() >= timeout.as_secs() as i64
                    }
                    None => false,
                })
                .map(|e| {
                    e.cancel_reason = Some(TIMEOUT_EXCEEDED.to_string());
                    (e.job.id.clone(), e.cancel.clone())
                })
                .collect()
        };

        // Only the signal fires here; the dispatcher holds the exclusive
        // write reference for the run and performs the terminal transition
        // once it has drained, reporting the stored reason.
        for (job_id, token) in expired {
            tracing::warn!(job_id = %job_id, "job exceeded timeout, cancelling");
            token.cancel();
        }
    }

    fn evict_terminal_records(&self) {
        let evicted: Vec<JobEntry> = {
            let mut jobs = self.jobs.write();
            let mut terminal: Vec<(String, chrono::DateTime<Utc>)> = jobs
                .values()
                .filter(|e| e.job.status.is_terminal())
                .map(|e| (e.job.id.clone(), e.job.completed_at.unwrap_or(e.job.created_at)))
                .collect();
            if terminal.len() <= self.retention.max_jobs_kept {
                return;
            }
            // Oldest terminal jobs go first
            terminal.sort_by_key(|(_, finished)| *finished);
            let surplus = terminal.len() - self.retention.max_jobs_kept;
            terminal
                .into_iter()
                .take(surplus)
                .filter_map(|(id, _)| jobs.remove(&id))
                .collect()
        };

        for entry in evicted {
            tracing::debug!(job_id = %entry.job.id, "evicted terminal job record");
            self.broadcaster.drop_job(&entry.job.id);
            if self.retention.immediate_cleanup
                && let Err(e) = remove_job_files(&entry.job)
            {
                tracing::warn!(job_id = %entry.job.id, error = %e, "file cleanup failed");
            }
        }
    }

    fn prune_result_files(&self) {
        let Ok(dir) = std::fs::read_dir(&self.results_dir) else {
            return;
        };

        // A file referenced by a retained record still belongs to that
        // record - its path stays valid until the record itself goes.
        // Only orphans left behind by evicted jobs are candidates.
        let referenced: HashSet<PathBuf> = {
            let jobs = self.jobs.read();
            jobs.values()
                .filter_map(|e| e.job.result_path.clone())
                .collect()
        };

        let mut results: Vec<(PathBuf, std::time::SystemTime)> = dir
            .flatten()
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| {
                        name.starts_with("routing_results_") && name.ends_with(".geojson")
                    })
            })
            .filter(|entry| !referenced.contains(&entry.path()))
            .filter_map(|entry| {
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((entry.path(), modified))
            })
            .collect();

        if results.len() <= self.retention.max_results_kept {
            return;
        }

        // Newest survive
        results.sort_by_key(|(_, modified)| std::cmp::Reverse(*modified));
        for (path, _) in results.split_off(self.retention.max_results_kept) {
            tracing::debug!(path = %path.display(), "pruning old result file");
            let _ = std::fs::remove_file(&path);
            let metadata = metadata_sibling(&path);
            let _ = std::fs::remove_file(metadata);
        }
    }
}

/// Delete a job's result and metadata files, tolerating absence
fn remove_job_files(job: &Job) -> Result<()> {
    for path in [&job.result_path, &job.metadata_path].into_iter().flatten() {
        if let Err(e) = std::fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            return Err(JobError::Io(e));
        }
    }
    Ok(())
}

/// `routing_results_<id>.geojson` -> `routing_metadata_<id>.json`
fn metadata_sibling(result_path: &Path) -> PathBuf {
    let name = result_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let id = name
        .strip_prefix("routing_results_")
        .and_then(|n| n.strip_suffix(".geojson"))
        .unwrap_or_default();
    result_path.with_file_name(roam_output::metadata_file_name(id))
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
