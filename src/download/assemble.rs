//! Ordered reassembly of fetched chunks into the destination file.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};

use super::error::{ChunkFailure, TransferError};
use super::fetch::{ChunkOutcome, ChunkResult};

/// Summary of a completed assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Destination path.
    pub path: PathBuf,
    /// Number of chunks written.
    pub chunks: usize,
    /// Total bytes written.
    pub bytes_written: u64,
}

/// Writes `results` to `output_path` in ascending index order.
///
/// `results` may arrive in any order. The set must hold exactly the indices
/// `0..expected_chunks`, each once, and every outcome must be fetched; this
/// is checked before the destination is touched. Any existing file is
/// truncated.
///
/// # Errors
///
/// - [`TransferError::IncompleteChunks`] if indices are missing, duplicated
///   or outside the plan
/// - [`TransferError::ChunkFetchFailure`] if a failed outcome is present
/// - [`TransferError::WriteFailure`] if the file cannot be created or written;
///   the destination may then hold a partial file
#[instrument(skip(results), fields(path = %output_path.display(), chunks = results.len()))]
pub async fn assemble(
    output_path: &Path,
    expected_chunks: usize,
    mut results: Vec<ChunkResult>,
) -> Result<AssemblyReport, TransferError> {
    results.sort_by_key(|r| r.index);
    let chunks = into_ordered_bodies(results, expected_chunks)?;

    let file = File::create(output_path)
        .await
        .map_err(|e| TransferError::write_failure(output_path, e))?;
    let mut writer = BufWriter::new(file);
    let mut bytes_written: u64 = 0;

    for (index, bytes) in chunks.iter().enumerate() {
        writer
            .write_all(bytes)
            .await
            .map_err(|e| TransferError::write_failure(output_path, e))?;
        bytes_written += bytes.len() as u64;
        info!(chunk = index + 1, path = %output_path.display(), "writing chunk to file");
    }

    // Ensure all data is flushed to disk
    writer
        .flush()
        .await
        .map_err(|e| TransferError::write_failure(output_path, e))?;

    debug!(bytes_written, "assembly complete");
    Ok(AssemblyReport {
        path: output_path.to_path_buf(),
        chunks: chunks.len(),
        bytes_written,
    })
}

/// Checks index-sorted results against `0..expected_chunks` and extracts
/// their bodies.
fn into_ordered_bodies(
    results: Vec<ChunkResult>,
    expected_chunks: usize,
) -> Result<Vec<bytes::Bytes>, TransferError> {
    let mut irregular = Vec::new();
    let mut failures = Vec::new();
    let mut bodies = Vec::with_capacity(expected_chunks);
    let mut expected = 0usize;

    for result in results {
        if result.index < expected || result.index >= expected_chunks {
            irregular.push(result.index);
            continue;
        }
        irregular.extend(expected..result.index);
        expected = result.index + 1;
        match result.outcome {
            ChunkOutcome::Fetched(bytes) => bodies.push(bytes),
            ChunkOutcome::Failed(reason) => failures.push(ChunkFailure {
                index: result.index,
                reason,
            }),
        }
    }

    irregular.extend(expected..expected_chunks);

    if !failures.is_empty() {
        return Err(TransferError::ChunkFetchFailure { failures });
    }
    if !irregular.is_empty() {
        irregular.sort_unstable();
        irregular.dedup();
        return Err(TransferError::IncompleteChunks { indices: irregular });
    }
    Ok(bodies)
}
