//! Streaming result output
//!
//! Writes each job's feature collection to disk incrementally - header,
//! features as they arrive, footer on close - so a million-row job never
//! holds more than one feature in memory. On successful close a sibling
//! metadata document is written atomically next to the collection.
//!
//! # Files
//!
//! ```text
//! <RESULTS_DIR>/routing_results_<jobId>.geojson
//! <RESULTS_DIR>/routing_metadata_<jobId>.json
//! ```

mod error;
mod feature;
mod writer;

pub use error::{OutputError, Result};
pub use feature::RouteFeature;
pub use writer::{FeatureCollectionWriter, ResultFiles, RunSummary, RunTiming};

/// Result file name for a job
pub fn result_file_name(job_id: &str) -> String {
    format!("routing_results_{job_id}.geojson")
}

/// Metadata file name for a job
pub fn metadata_file_name(job_id: &str) -> String {
    format!("routing_metadata_{job_id}.json")
}
