//! CLI entry point for the parallel downloader.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use parallel_downloader::{DownloadOrchestrator, HttpClient};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = args.to_configuration()?;
    let client = HttpClient::new(config.http_settings())?;
    let orchestrator = DownloadOrchestrator::new(Arc::new(client));

    let summary = orchestrator.run(&config).await?;

    info!(
        path = %summary.output_path.display(),
        total_size = summary.total_size,
        chunks = summary.chunk_count,
        "download complete"
    );

    Ok(())
}
