//! Engine metrics
//!
//! Process-wide counters across all jobs. Shared through an Arc so the
//! health endpoint can snapshot them while dispatchers run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the batch engine
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Jobs whose dispatcher started
    pub jobs_started: AtomicU64,

    /// Jobs that reached `completed`
    pub jobs_completed: AtomicU64,

    /// Jobs that reached `failed` (cancellations included)
    pub jobs_failed: AtomicU64,

    /// Rows driven to any outcome
    pub rows_processed: AtomicU64,

    /// Rows with a routed feature
    pub routes_succeeded: AtomicU64,

    /// Rows that failed
    pub routes_failed: AtomicU64,
}

impl EngineMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            jobs_started: AtomicU64::new(0),
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            rows_processed: AtomicU64::new(0),
            routes_succeeded: AtomicU64::new(0),
            routes_failed: AtomicU64::new(0),
        }
    }

    /// Record a dispatcher start
    #[inline]
    pub fn job_started(&self) {
        self.jobs_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed job
    #[inline]
    pub fn job_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed job
    #[inline]
    pub fn job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one dispatch window's row outcomes
    #[inline]
    pub fn window(&self, successful: u64, failed: u64) {
        self.rows_processed
            .fetch_add(successful + failed, Ordering::Relaxed);
        self.routes_succeeded.fetch_add(successful, Ordering::Relaxed);
        self.routes_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            rows_processed: self.rows_processed.load(Ordering::Relaxed),
            routes_succeeded: self.routes_succeeded.load(Ordering::Relaxed),
            routes_failed: self.routes_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of engine metrics
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct EngineMetricsSnapshot {
    pub jobs_started: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub rows_processed: u64,
    pub routes_succeeded: u64,
    pub routes_failed: u64,
}
