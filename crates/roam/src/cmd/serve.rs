//! The serve command
//!
//! Wires the whole system together: upload store, CRS catalog, projection
//! transformer, routing client, job registry, engine, and the axum router.
//! Graceful shutdown cancels every non-terminal job and lets dispatchers
//! drain before the process exits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use roam_api::{AppState, build_router};
use roam_config::Config;
use roam_engine::Engine;
use roam_jobs::{Broadcaster, JobRegistry, RetentionPolicy};
use roam_osrm::RoutingClient;
use roam_proj::{CrsCatalog, ProjTransformer};
use roam_table::UploadStore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// How long dispatchers get to observe cancellation on shutdown
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Bind host (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn run(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    std::fs::create_dir_all(&config.paths.results_dir)
        .with_context(|| format!("creating {}", config.paths.results_dir.display()))?;

    let broadcaster = Arc::new(Broadcaster::new());
    let registry = Arc::new(JobRegistry::new(
        Arc::clone(&broadcaster),
        &config.paths.results_dir,
        RetentionPolicy {
            max_jobs_kept: config.housekeeping.max_jobs_kept,
            max_results_kept: config.housekeeping.max_results_kept,
            job_timeout: config.housekeeping.job_timeout(),
            immediate_cleanup: config.housekeeping.immediate_cleanup,
        },
    ));
    let uploads = Arc::new(UploadStore::new(&config.paths.upload_dir)?);
    let catalog = Arc::new(CrsCatalog::builtin());
    let transformer = Arc::new(ProjTransformer::new());

    let client = RoutingClient::new(
        &config.osrm.url,
        config.osrm.timeout(),
        config.osrm.request_delay(),
    )?;

    let engine = Engine::new(
        Arc::clone(&registry),
        Arc::clone(&uploads),
        Arc::clone(&catalog),
        transformer,
        client,
        config.engine.batch_size,
        config.osrm.max_concurrent,
    );

    let state = AppState::new(
        engine,
        Arc::clone(&registry),
        broadcaster,
        uploads,
        catalog,
        config.server.max_upload_bytes,
    );
    let app = build_router(state);

    let shutdown = CancellationToken::new();
    let housekeeping =
        registry.spawn_housekeeping(config.housekeeping.cleanup_interval(), shutdown.clone());

    let bind_address = config.server.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;

    tracing::info!(
        address = %bind_address,
        osrm = %config.osrm.url,
        results_dir = %config.paths.results_dir.display(),
        batch_size = config.engine.batch_size,
        max_concurrent = config.osrm.max_concurrent,
        "roam server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&registry), shutdown.clone()))
        .await
        .context("server error")?;

    shutdown.cancel();
    let _ = housekeeping.await;
    tracing::info!("shutdown complete");
    Ok(())
}

/// Wait for ctrl-c, then cancel all running jobs and give their
/// dispatchers a moment to drain
async fn shutdown_signal(registry: Arc<JobRegistry>, shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");

    let cancelled = registry.cancel_all();
    if cancelled > 0 {
        tracing::info!(cancelled, "cancelled running jobs");
        tokio::time::sleep(DRAIN_GRACE).await;
    }
    shutdown.cancel();
}
