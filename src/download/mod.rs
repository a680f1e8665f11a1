//! Parallel ranged download pipeline.
//!
//! A single remote file is fetched as a set of byte ranges requested
//! concurrently and reassembled in order.
//!
//! # Pipeline
//!
//! - [`probe`] - metadata-only request establishing the resource size
//! - [`plan`] - pure partition of the size into bounded-size ranges
//! - [`fetch`] - one ranged GET per chunk, failures returned as values
//! - [`ParallelCoordinator`] - one task per range, join barrier, results by index
//! - [`assemble`] - ordered write of every chunk to the destination
//! - [`DownloadOrchestrator`] - sequences the above for one configuration
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use parallel_downloader::DownloadConfiguration;
//! use parallel_downloader::download::{DownloadOrchestrator, HttpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DownloadConfiguration::new(Some("https://example.com/big.iso"))?
//!     .with_output_path("big.iso");
//! let client = HttpClient::new(config.http_settings())?;
//! let summary = DownloadOrchestrator::new(Arc::new(client)).run(&config).await?;
//! println!("{} bytes in {} chunks", summary.bytes_written, summary.chunk_count);
//! # Ok(())
//! # }
//! ```

mod assemble;
mod client;
mod constants;
mod coordinator;
mod error;
mod fetch;
mod orchestrator;
mod plan;
mod probe;
mod retry;
mod transport;

#[cfg(test)]
mod test_support;

pub use assemble::{AssemblyReport, assemble};
pub use client::{HttpClient, HttpSettings};
pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CHUNK_COUNT, DEFAULT_CHUNK_SIZE_BYTES, DEFAULT_OUTPUT_FILE,
    MAX_CHUNK_COUNT, READ_TIMEOUT_SECS,
};
pub use coordinator::ParallelCoordinator;
pub use error::{ChunkFailure, DownloadError, FetchFailure, TransferError};
pub use fetch::{ChunkOutcome, ChunkResult, fetch};
pub use orchestrator::{DownloadOrchestrator, DownloadSummary, RunFailure, TransferState};
pub use plan::{ByteRange, TransferPlan, plan};
pub use probe::{ProbeOutcome, probe};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error,
    classify_failure, fetch_with_retry,
};
pub use transport::{ProbeResponse, RangeResponse, Transport};
