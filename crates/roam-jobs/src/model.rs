//! Job data model

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use roam_geometry::GeometryPolicy;
use serde::{Deserialize, Serialize};

/// Job lifecycle state
///
/// Advances monotonically toward a terminal state; `Failed` covers both
/// errors and user cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, dispatcher not yet running
    Pending,
    /// Dispatcher is driving rows
    Processing,
    /// Every row reached an outcome and the collection closed
    Completed,
    /// Fatal error or cancellation
    Failed,
}

impl JobStatus {
    /// Whether this state admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Progress counters for one job
///
/// `total` is fixed at creation; the others only grow, and
/// `processed == successful + failed` at every observation point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Rows in the upload
    pub total: u64,
    /// Rows driven to any outcome
    pub processed: u64,
    /// Rows with a routed feature
    pub successful: u64,
    /// Rows that failed
    pub failed: u64,
}

/// Named x/y column pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldPair {
    /// Column holding the x coordinate
    pub x: String,
    /// Column holding the y coordinate
    pub y: String,
}

/// A routing job submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    /// Upload to route over
    pub file_id: String,

    /// Reference system of the upload's coordinates, e.g. "EPSG:25832"
    pub crs: String,

    /// Origin coordinate columns
    pub origin_fields: FieldPair,

    /// Destination coordinate columns
    pub destination_fields: FieldPair,

    /// Geometry post-processing policy
    #[serde(default)]
    pub geometry: GeometryPolicy,

    /// Output format tag; only "geojson" is supported
    #[serde(default)]
    pub output_format: Option<String>,
}

impl RoutingConfig {
    /// The four coordinate column names, origin first
    pub fn coordinate_columns(&self) -> [&str; 4] {
        [
            &self.origin_fields.x,
            &self.origin_fields.y,
            &self.destination_fields.x,
            &self.destination_fields.y,
        ]
    }
}

/// One job record, owned by the registry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Globally unique random identifier
    pub id: String,

    /// Lifecycle state
    pub status: JobStatus,

    /// Progress counters
    pub progress: Progress,

    /// Set when the dispatcher starts
    pub started_at: Option<DateTime<Utc>>,

    /// Set exactly at the terminal transition
    pub completed_at: Option<DateTime<Utc>>,

    /// Copy of the submission
    pub configuration: RoutingConfig,

    /// Terminal failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// On-disk feature collection, present once completed
    #[serde(skip)]
    pub result_path: Option<PathBuf>,

    /// Sibling metadata document
    #[serde(skip)]
    pub metadata_path: Option<PathBuf>,

    /// Record creation time, drives retention ordering
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}
