//! Submission validation tests

use std::sync::Arc;
use std::time::Duration;

use roam_geometry::GeometryPolicy;
use roam_jobs::{Broadcaster, FieldPair, JobRegistry, RetentionPolicy, RoutingConfig};
use roam_osrm::RoutingClient;
use roam_proj::{CrsCatalog, ProjTransformer};
use roam_table::UploadStore;
use tempfile::TempDir;

use super::*;
use crate::error::EngineError;

fn engine(dir: &TempDir) -> (Engine, Arc<UploadStore>) {
    let uploads = Arc::new(UploadStore::new(dir.path().join("uploads")).unwrap());
    let registry = Arc::new(JobRegistry::new(
        Arc::new(Broadcaster::new()),
        dir.path().join("results"),
        RetentionPolicy::default(),
    ));
    let client = RoutingClient::new(
        "http://127.0.0.1:1",
        Duration::from_millis(100),
        Duration::ZERO,
    )
    .unwrap();
    let engine = Engine::new(
        registry,
        Arc::clone(&uploads),
        Arc::new(CrsCatalog::builtin()),
        Arc::new(ProjTransformer::new()),
        client,
        100,
        50,
    );
    (engine, uploads)
}

fn config(file_id: &str) -> RoutingConfig {
    RoutingConfig {
        file_id: file_id.to_string(),
        crs: "EPSG:4326".into(),
        origin_fields: FieldPair {
            x: "ox".into(),
            y: "oy".into(),
        },
        destination_fields: FieldPair {
            x: "dx".into(),
            y: "dy".into(),
        },
        geometry: GeometryPolicy::default(),
        output_format: None,
    }
}

#[tokio::test]
async fn test_unknown_upload_is_not_found() {
    let dir = TempDir::new().unwrap();
    let (engine, _) = engine(&dir);

    let err = engine.submit(config("missing")).unwrap_err();
    assert!(matches!(err, EngineError::UnknownUpload(id) if id == "missing"));
}

#[tokio::test]
async fn test_missing_columns_are_reported_per_field() {
    let dir = TempDir::new().unwrap();
    let (engine, uploads) = engine(&dir);
    let upload = uploads.ingest("t.csv", b"ox,oy\n1,2\n").unwrap();

    let err = engine.submit(config(&upload.file_id)).unwrap_err();
    let EngineError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["destinationFields.x", "destinationFields.y"]);
}

#[tokio::test]
async fn test_unknown_crs_is_validation_error() {
    let dir = TempDir::new().unwrap();
    let (engine, uploads) = engine(&dir);
    let upload = uploads.ingest("t.csv", b"ox,oy,dx,dy\n1,2,3,4\n").unwrap();

    let mut bad = config(&upload.file_id);
    bad.crs = "EPSG:99999".into();

    let err = engine.submit(bad).unwrap_err();
    let EngineError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "crs");
}

#[tokio::test]
async fn test_unsupported_output_format() {
    let dir = TempDir::new().unwrap();
    let (engine, uploads) = engine(&dir);
    let upload = uploads.ingest("t.csv", b"ox,oy,dx,dy\n1,2,3,4\n").unwrap();

    let mut bad = config(&upload.file_id);
    bad.output_format = Some("geopackage".into());

    let err = engine.submit(bad).unwrap_err();
    let EngineError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert_eq!(errors[0].field, "outputFormat");
}

#[tokio::test]
async fn test_geojson_format_accepted() {
    let dir = TempDir::new().unwrap();
    let (engine, uploads) = engine(&dir);
    let upload = uploads.ingest("t.csv", b"ox,oy,dx,dy\n1,2,3,4\n").unwrap();

    let mut ok = config(&upload.file_id);
    ok.output_format = Some("geojson".into());

    let job_id = engine.submit(ok).unwrap();
    // Identifier is live before the dispatcher finishes
    let job = engine.registry().snapshot(&job_id).unwrap();
    assert_eq!(job.progress.total, 1);
}

#[tokio::test]
async fn test_submission_returns_before_completion() {
    let dir = TempDir::new().unwrap();
    let (engine, uploads) = engine(&dir);
    let upload = uploads.ingest("t.csv", b"ox,oy,dx,dy\n1,2,3,4\n").unwrap();

    let job_id = engine.submit(config(&upload.file_id)).unwrap();
    // The identifier resolves immediately, whatever state the job is in
    let job = engine.registry().snapshot(&job_id).unwrap();
    assert_eq!(job.progress.total, 1);
}
