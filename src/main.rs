//! CLI entry point: scores one year/month partition of trip records.

use anyhow::Result;
use clap::Parser;
use ride_duration_batch::{JobConfig, run_job};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ride_duration_batch")]
#[command(about = "Prediction of taxi ride duration", long_about = None)]
struct Cli {
    /// Year of the trip dataset (e.g. 2023)
    year: i32,

    /// Month of the trip dataset (1-12)
    month: i32,

    /// Model artifact holding the vectorizer and regression
    #[arg(long, env = "MODEL_PATH")]
    model_path: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Keep the guard alive so buffered JSON lines are flushed on exit
    let _file_guard = init_logging();

    let cli = Cli::parse();

    let mut config = JobConfig::from_env();
    if let Some(path) = cli.model_path {
        config = config.with_model_path(path);
    }

    let predictions = run_job(&config, cli.year, cli.month).await?;
    info!(rows = predictions.len(), "Done");

    Ok(())
}

/// Colored stderr plus a daily-rolling JSON log file.
fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ride_duration.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ride_duration.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info")));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::try_from_env("RUST_LOG_JSON").unwrap_or_else(|_| EnvFilter::new("debug")),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}
