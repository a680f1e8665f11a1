//! End-to-end sequencing of a parallel download.
//!
//! ```text
//! Idle -> Probing -> Planning -> Fetching -> Assembling -> Done
//!            |                      |            |
//!            +----------------------+------------+--> Failed
//! ```
//!
//! The destination is opened only in `Assembling`, which is entered only
//! after every chunk has been fetched.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::assemble::assemble;
use super::coordinator::ParallelCoordinator;
use super::error::TransferError;
use super::plan::plan;
use super::probe::probe;
use super::transport::Transport;
use crate::config::DownloadConfiguration;

/// Phase of a download run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Not started.
    Idle,
    /// Establishing the resource size.
    Probing,
    /// Partitioning the resource into ranges.
    Planning,
    /// Fetching all ranges concurrently.
    Fetching,
    /// Writing chunks to the destination.
    Assembling,
    /// Destination written completely.
    Done,
    /// Run aborted.
    Failed,
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::Planning => "planning",
            Self::Fetching => "fetching",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Destination path.
    pub output_path: PathBuf,
    /// Probed resource size.
    pub total_size: u64,
    /// Number of ranges actually fetched.
    pub chunk_count: usize,
    /// Bytes written to the destination.
    pub bytes_written: u64,
}

/// A failed run together with the phase it failed in.
#[derive(Debug, thiserror::Error)]
#[error("download failed while {phase}: {source}")]
pub struct RunFailure {
    /// Phase that was active when the run failed.
    pub phase: TransferState,
    /// Underlying error.
    #[source]
    pub source: TransferError,
}

/// Sequences probe, plan, fetch and assembly for one configuration.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for DownloadOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOrchestrator").finish_non_exhaustive()
    }
}

impl DownloadOrchestrator {
    /// Creates an orchestrator issuing requests through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Runs the whole transfer described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] whose `phase` is `Probing`, `Fetching` or
    /// `Assembling`. Probe failures occur before any content request; fetch
    /// failures occur before the destination is opened.
    #[instrument(skip(self, config), fields(source = %config.source_url, output = %config.output_path.display()))]
    pub async fn run(&self, config: &DownloadConfiguration) -> Result<DownloadSummary, RunFailure> {
        let mut state = TransferState::Idle;
        let url = config.source_url.as_str();

        advance(&mut state, TransferState::Probing);
        info!(url, "downloading from URL");
        let probed = probe(self.transport.as_ref(), url)
            .await
            .map_err(|e| fail(state, e))?;
        info!(total_size = probed.total_size, "file size");

        advance(&mut state, TransferState::Planning);
        let plan = plan(
            probed.total_size,
            config.requested_chunk_count,
            config.chunk_size_bytes,
        );

        advance(&mut state, TransferState::Fetching);
        let coordinator =
            ParallelCoordinator::new(Arc::clone(&self.transport), config.retry_policy());
        let results = coordinator
            .run_all(url, &plan)
            .await
            .map_err(|e| fail(state, e))?;

        advance(&mut state, TransferState::Assembling);
        let report = assemble(&config.output_path, plan.chunk_count(), results)
            .await
            .map_err(|e| fail(state, e))?;

        advance(&mut state, TransferState::Done);
        info!(
            path = %report.path.display(),
            bytes = report.bytes_written,
            chunks = report.chunks,
            "all done"
        );

        Ok(DownloadSummary {
            output_path: report.path,
            total_size: plan.total_size(),
            chunk_count: plan.chunk_count(),
            bytes_written: report.bytes_written,
        })
    }
}

fn advance(state: &mut TransferState, next: TransferState) {
    debug!(from = %state, to = %next, "transfer state changed");
    *state = next;
}

fn fail(phase: TransferState, source: TransferError) -> RunFailure {
    debug!(from = %phase, to = %TransferState::Failed, "transfer state changed");
    warn!(phase = %phase, error = %source, "transfer failed");
    RunFailure { phase, source }
}
