//! Video Detect CLI - batch object detection over uploaded videos
//!
//! Command-line interface for the detection pipeline: run a batch pass
//! in the foreground, serve the HTTP trigger surface, or probe a
//! running instance.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::healthcheck::HealthcheckCommand;
use commands::run::RunCommand;
use commands::serve::ServeCommand;

#[derive(Parser)]
#[command(
    name = "video-detect",
    version,
    about = "Batch object detection over uploaded videos",
    long_about = "Scans an input bucket for uploaded videos that have no detection\n\
                  document yet, runs each one through a YOLOv8 model in frame\n\
                  batches, and commits two artifacts per video: a per-frame JSON\n\
                  detection document and an annotated copy of the video.\n\n\
                  Storage is S3-compatible and configured through the environment\n\
                  (MINIO_ENDPOINT, MINIO_ACCESS_KEY, MINIO_SECRET_KEY, and the\n\
                  VIDEO_INPUT_BUCKET / VIDEO_RESULTS_BUCKET / VIDEO_ANNOTATED_BUCKET\n\
                  location names).",
    after_help = "EXAMPLES:\n  \
                  # Process every pending upload once, in the foreground\n  \
                  video-detect run\n\n  \
                  # Only look for people and cars, in batches of 16 frames\n  \
                  video-detect run --classes 0,2 --batch-size 16\n\n  \
                  # Keep the summary for later inspection\n  \
                  video-detect run --summary-out summary.json\n\n  \
                  # Serve the HTTP trigger surface\n  \
                  video-detect serve --port 8080\n\n  \
                  # Probe a running instance\n  \
                  video-detect healthcheck --url http://localhost:8080"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one detection run in the foreground and print its summary
    Run(RunCommand),

    /// Start the HTTP surface for triggering and observing runs
    Serve(ServeCommand),

    /// Probe a running service's health endpoint
    Healthcheck(HealthcheckCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run(cmd) => cmd.execute().await,
        Commands::Serve(cmd) => cmd.execute().await,
        Commands::Healthcheck(cmd) => cmd.execute().await,
    }
}
