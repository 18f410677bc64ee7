//! Roam - batch origin/destination routing
//!
//! # Usage
//!
//! ```bash
//! # Run the server (default)
//! roam
//! roam serve --config roam.toml --port 8080
//!
//! # Validate configuration and exit
//! roam check --config roam.toml
//! ```
//!
//! Configuration precedence: defaults < TOML file < environment
//! (`OSRM_URL`, `RESULTS_DIR`, `BATCH_SIZE`, ...). Exit code is non-zero on
//! bind failure or fatal configuration errors.

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use roam_config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Batch origin/destination routing server
#[derive(Parser, Debug)]
#[command(name = "roam")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server (default when no subcommand is given)
    Serve(cmd::serve::ServeArgs),

    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Check) => {
            // Config::load already validated; reaching here means it passed
            println!("configuration OK");
            Ok(())
        }
        Some(Command::Serve(args)) => {
            let _guard = init_logging(&config, cli.log_level.as_deref())?;
            cmd::serve::run(args, config).await
        }
        None => {
            let _guard = init_logging(&config, cli.log_level.as_deref())?;
            cmd::serve::run(cmd::serve::ServeArgs::default(), config).await
        }
    }
}

/// Initialize the tracing subscriber
///
/// Console always; a daily-rolling file under the configured log directory
/// when `log.to_file` is set. The returned guard must stay alive for the
/// file writer to flush.
fn init_logging(config: &Config, cli_level: Option<&str>) -> Result<Option<WorkerGuard>> {
    let level = cli_level.unwrap_or(config.log.level.as_str());
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let console = fmt::layer().with_target(true).with_thread_ids(false);

    if config.log.to_file {
        std::fs::create_dir_all(&config.paths.log_dir)?;
        let appender = tracing_appender::rolling::daily(&config.paths.log_dir, "roam.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(console)
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .with(filter)
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(console)
            .with(filter)
            .init();
        Ok(None)
    }
}
