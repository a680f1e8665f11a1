//! Error types for the download module.
//!
//! [`DownloadError`] describes a single failed HTTP exchange. [`FetchFailure`]
//! explains why one chunk could not be accepted, and [`TransferError`] is the
//! run-level taxonomy surfaced to the user.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a single HTTP request.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present (for 429 responses).
        retry_after: Option<String>,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

/// Reason a single chunk fetch was rejected.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// The request itself failed.
    #[error(transparent)]
    Transport(#[from] DownloadError),

    /// The server answered with a success status that cannot satisfy the range.
    #[error("unexpected HTTP {status} for bytes {start}-{end}")]
    UnexpectedStatus {
        /// Status returned by the server.
        status: u16,
        /// Requested first byte.
        start: u64,
        /// Requested last byte.
        end: u64,
    },

    /// The `Content-Range` header names a different span than requested.
    #[error("server returned range {actual}, expected bytes {start}-{end}")]
    RangeMismatch {
        /// Requested first byte.
        start: u64,
        /// Requested last byte.
        end: u64,
        /// Raw `Content-Range` value received.
        actual: String,
    },

    /// Body length differs from the requested span length.
    #[error("expected {expected} bytes, received {actual}")]
    LengthMismatch {
        /// Requested span length.
        expected: u64,
        /// Bytes actually received.
        actual: u64,
    },

    /// `Content-Range` reports a total size other than the probed one.
    #[error("resource size changed since probe: expected {expected} bytes, server reports {actual}")]
    SizeChanged {
        /// Size established by the probe.
        expected: u64,
        /// Total reported by the server.
        actual: u64,
    },

    /// The fetch task panicked or was aborted before producing a result.
    #[error("fetch task did not complete: {0}")]
    TaskAborted(String),
}

/// A failed chunk together with its plan index.
#[derive(Debug)]
pub struct ChunkFailure {
    /// Index of the failed range in the plan.
    pub index: usize,
    /// Why the fetch was rejected.
    pub reason: FetchFailure,
}

impl fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk {}: {}", self.index, self.reason)
    }
}

/// Run-level failures of a parallel download.
#[derive(Debug, Error)]
pub enum TransferError {
    /// No source URL was supplied.
    #[error("Please specify source URL with parameter --source (source URL).")]
    MissingSource,

    /// The source could not be parsed or uses an unsupported scheme.
    #[error("invalid source {url}: {reason}")]
    InvalidSource {
        /// The rejected source string.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The probe could not establish a usable size for the source.
    #[error("file size unavailable for {url}: {reason}")]
    SizeUnavailable {
        /// The probed URL.
        url: String,
        /// Status, transport error, or missing header description.
        reason: String,
    },

    /// One or more chunk fetches failed; nothing was written.
    #[error("{} of the chunk fetches failed (indices {:?}): {}", .failures.len(), failed_indices(.failures), describe(.failures))]
    ChunkFetchFailure {
        /// Every failed chunk, ascending by index.
        failures: Vec<ChunkFailure>,
    },

    /// The assembler was handed a result set with gaps or duplicates.
    #[error("cannot assemble: chunk indices {indices:?} are missing or duplicated")]
    IncompleteChunks {
        /// Offending indices.
        indices: Vec<usize>,
    },

    /// The destination could not be created or written.
    #[error("failed to write {path}: {source}")]
    WriteFailure {
        /// Destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    /// Creates a size-unavailable error.
    pub fn size_unavailable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SizeUnavailable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a write failure.
    pub fn write_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Indices of failed chunks, if this is a fetch failure.
    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        match self {
            Self::ChunkFetchFailure { failures } => failed_indices(failures),
            _ => Vec::new(),
        }
    }
}

fn failed_indices(failures: &[ChunkFailure]) -> Vec<usize> {
    failures.iter().map(|f| f.index).collect()
}

fn describe(failures: &[ChunkFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the
// url or path the source error does not carry.
