//! End-to-end API tests: real server, real engine, mock routing daemon

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use roam_api::{AppState, build_router};
use roam_engine::Engine;
use roam_jobs::{Broadcaster, JobRegistry, RetentionPolicy};
use roam_osrm::RoutingClient;
use roam_proj::{CrsCatalog, ProjTransformer};
use roam_table::UploadStore;
use tempfile::TempDir;

/// Mock OSRM daemon answering every request with the same short route
async fn spawn_daemon() -> String {
    let router = Router::new().route(
        "/route/v1/driving/{coords}",
        get(|| async {
            r#"{"code":"Ok","routes":[{"distance":1500.0,"duration":120.0,"geometry":{"type":"LineString","coordinates":[[2.35,48.85],[2.32,48.86],[2.29,48.87]]}}]}"#
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

struct TestServer {
    base_url: String,
    http: reqwest::Client,
    registry: Arc<JobRegistry>,
    _dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with_retention(RetentionPolicy::default()).await
    }

    async fn start_with_retention(retention: RetentionPolicy) -> Self {
        let daemon = spawn_daemon().await;
        let dir = TempDir::new().unwrap();

        let uploads = Arc::new(UploadStore::new(dir.path().join("uploads")).unwrap());
        let broadcaster = Arc::new(Broadcaster::new());
        let registry = Arc::new(JobRegistry::new(
            Arc::clone(&broadcaster),
            dir.path().join("results"),
            retention,
        ));
        let client = RoutingClient::new(&daemon, Duration::from_secs(2), Duration::ZERO).unwrap();
        let catalog = Arc::new(CrsCatalog::builtin());
        let engine = Engine::new(
            Arc::clone(&registry),
            Arc::clone(&uploads),
            Arc::clone(&catalog),
            Arc::new(ProjTransformer::new()),
            client,
            100,
            50,
        );

        let state = AppState::new(
            engine,
            Arc::clone(&registry),
            broadcaster,
            uploads,
            catalog,
            50 * 1024 * 1024,
        );
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            http: reqwest::Client::new(),
            registry,
            _dir: dir,
        }
    }

    async fn upload(&self, name: &str, content: &'static [u8]) -> serde_json::Value {
        let part = reqwest::multipart::Part::bytes(content).file_name(name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.http
            .post(format!("{}/api/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> (reqwest::StatusCode, serde_json::Value) {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn submit(&self, file_id: &str) -> String {
        let body = serde_json::json!({
            "fileId": file_id,
            "crs": "EPSG:4326",
            "originFields": {"x": "ox", "y": "oy"},
            "destinationFields": {"x": "dx", "y": "dy"},
        });
        let response: serde_json::Value = self
            .http
            .post(format!("{}/api/routing/batch", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(response["success"], true);
        response["data"]["jobId"].as_str().unwrap().to_string()
    }

    async fn await_completed(&self, job_id: &str) -> serde_json::Value {
        for _ in 0..500 {
            let (_, body) = self
                .get_json(&format!("/api/routing/status/{job_id}"))
                .await;
            let status = body["data"]["status"].as_str().unwrap().to_string();
            if status == "completed" || status == "failed" {
                return body["data"].clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never finished");
    }
}

const CSV: &[u8] = b"ox,oy,dx,dy,name\n2.35,48.85,2.29,48.87,paris\n4.83,45.76,4.87,45.75,lyon\n";

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let (status, body) = server.get_json("/api/health").await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["jobs"]["live"], 0);
}

#[tokio::test]
async fn test_upload_and_sample() {
    let server = TestServer::start().await;

    let response = server.upload("trips.csv", CSV).await;
    assert_eq!(response["success"], true);
    let data = &response["data"];
    assert_eq!(data["originalName"], "trips.csv");
    assert_eq!(data["rowCount"], 2);
    assert_eq!(data["separator"], ",");
    assert_eq!(data["columns"][0], "ox");

    let file_id = data["fileId"].as_str().unwrap();
    let (status, body) = server
        .get_json(&format!("/api/upload/{file_id}/sample?limit=1"))
        .await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["data"]["totalRows"], 2);
    assert_eq!(body["data"]["sample"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["sample"][0]["name"], "paris");
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let server = TestServer::start().await;
    let form = reqwest::multipart::Form::new().text("other", "x");
    let response = server
        .http
        .post(format!("{}/api/upload", server.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_projections_catalog() {
    let server = TestServer::start().await;

    let (_, body) = server.get_json("/api/projections").await;
    assert!(body["data"].as_array().unwrap().len() >= 10);

    let (_, filtered) = server.get_json("/api/projections?search=lambert").await;
    let entries = filtered["data"].as_array().unwrap();
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|d| {
        d["name"]
            .as_str()
            .unwrap()
            .to_lowercase()
            .contains("lambert")
    }));
}

#[tokio::test]
async fn test_full_job_flow() {
    let server = TestServer::start().await;

    let upload = server.upload("trips.csv", CSV).await;
    let file_id = upload["data"]["fileId"].as_str().unwrap();

    let job_id = server.submit(file_id).await;
    let job = server.await_completed(&job_id).await;

    assert_eq!(job["status"], "completed");
    assert_eq!(job["progress"]["total"], 2);
    assert_eq!(job["progress"]["successful"], 2);

    // Materialised results
    let (_, results) = server
        .get_json(&format!("/api/routing/results/{job_id}"))
        .await;
    let features = results["data"]["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["properties"]["name"], "paris");
    assert_eq!(features[0]["properties"]["rowIndex"], 0);
    assert_eq!(features[1]["properties"]["rowIndex"], 1);

    // Streamed export with stat-derived length
    let response = server
        .http
        .get(format!("{}/api/routing/export/{job_id}", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/geo+json"
    );
    let expected_len: u64 = response.headers()["content-length"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let bytes = response.bytes().await.unwrap();
    assert_eq!(bytes.len() as u64, expected_len);
    let collection: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(collection["features"].as_array().unwrap().len(), 2);

    // Metadata document
    let (_, metadata) = server
        .get_json(&format!("/api/routing/metadata/{job_id}"))
        .await;
    assert_eq!(metadata["jobId"], job_id);
    assert_eq!(metadata["summary"]["successful"], 2);
    assert_eq!(metadata["summary"]["totalDistance"], 3000.0);
}

#[tokio::test]
async fn test_results_requires_completion() {
    let server = TestServer::start().await;
    let upload = server.upload("trips.csv", CSV).await;
    let file_id = upload["data"]["fileId"].as_str().unwrap();
    let job_id = server.submit(file_id).await;

    // Poke immediately; either the job is still running (400) or it already
    // completed (200) - both are contract-conforming, but a still-running
    // job must yield the precondition error.
    let (status, body) = server
        .get_json(&format!("/api/routing/results/{job_id}"))
        .await;
    if status == reqwest::StatusCode::BAD_REQUEST {
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("not completed"));
    }
    server.await_completed(&job_id).await;
}

#[tokio::test]
async fn test_unknown_ids_are_404() {
    let server = TestServer::start().await;

    let (status, body) = server.get_json("/api/routing/status/nope").await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = server.get_json("/api/upload/nope/sample").await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors_are_field_level() {
    let server = TestServer::start().await;
    let upload = server.upload("trips.csv", CSV).await;
    let file_id = upload["data"]["fileId"].as_str().unwrap();

    let body = serde_json::json!({
        "fileId": file_id,
        "crs": "EPSG:99999",
        "originFields": {"x": "ox", "y": "oy"},
        "destinationFields": {"x": "missing", "y": "dy"},
    });
    let response = server
        .http
        .post(format!("{}/api/routing/batch", server.base_url))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "VALIDATION_ERROR");
    let errors = body["errors"].as_array().unwrap();
    let fields: Vec<&str> = errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert!(fields.contains(&"crs"));
    assert!(fields.contains(&"destinationFields.x"));
}

#[tokio::test]
async fn test_export_survives_housekeeping() {
    // A retention pass must never orphan a retained job's files, and even
    // if the stream path is unavailable the download falls back to an
    // in-memory collection
    let server = TestServer::start_with_retention(RetentionPolicy {
        max_results_kept: 0,
        ..Default::default()
    })
    .await;

    let upload = server.upload("trips.csv", CSV).await;
    let file_id = upload["data"]["fileId"].as_str().unwrap();
    let job_id = server.submit(file_id).await;
    server.await_completed(&job_id).await;

    server.registry.housekeep();

    let response = server
        .http
        .get(format!("{}/api/routing/export/{job_id}", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let collection: serde_json::Value = response.json().await.unwrap();
    assert_eq!(collection["features"].as_array().unwrap().len(), 2);

    // The materialised endpoint keeps working too
    let (status, results) = server
        .get_json(&format!("/api/routing/results/{job_id}"))
        .await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(results["data"]["features"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cancel_and_cleanup() {
    let server = TestServer::start().await;
    let upload = server.upload("trips.csv", CSV).await;
    let file_id = upload["data"]["fileId"].as_str().unwrap();
    let job_id = server.submit(file_id).await;
    server.await_completed(&job_id).await;

    // Cancel after terminal: success, but nothing freshly cancelled
    let response: serde_json::Value = server
        .http
        .delete(format!("{}/api/routing/job/{job_id}", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["cancelled"], false);

    // Cleanup purges record and files
    let response: serde_json::Value = server
        .http
        .delete(format!(
            "{}/api/routing/job/{job_id}/cleanup",
            server.base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response["data"]["purged"], true);

    let (status, _) = server
        .get_json(&format!("/api/routing/status/{job_id}"))
        .await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);

    // Idempotent second cleanup
    let response: serde_json::Value = server
        .http
        .delete(format!(
            "{}/api/routing/job/{job_id}/cleanup",
            server.base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response["data"]["purged"], false);
}
