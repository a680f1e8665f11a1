//! Immutable run configuration.
//!
//! A [`DownloadConfiguration`] is resolved once, before any network activity,
//! and is never mutated while the transfer runs.

use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::download::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CHUNK_COUNT, DEFAULT_CHUNK_SIZE_BYTES, DEFAULT_MAX_RETRIES,
    DEFAULT_OUTPUT_FILE, HttpSettings, READ_TIMEOUT_SECS, RetryPolicy, TransferError,
};

/// Snapshot of everything a download run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfiguration {
    /// Resource to download (http or https).
    pub source_url: Url,
    /// Destination file.
    pub output_path: PathBuf,
    /// Requested chunk count; bounds simultaneous range requests.
    pub requested_chunk_count: NonZeroUsize,
    /// Target size of each range in bytes.
    pub chunk_size_bytes: NonZeroU64,
    /// Trace request and response headers.
    pub verbose: bool,
    /// Retries per chunk after the first attempt.
    pub max_retries: u32,
    /// HTTP connect timeout.
    pub connect_timeout: Duration,
    /// HTTP whole-request timeout.
    pub read_timeout: Duration,
}

impl DownloadConfiguration {
    /// Validates `source` and builds a configuration with default settings.
    ///
    /// # Errors
    ///
    /// - [`TransferError::MissingSource`] if `source` is `None` or blank
    /// - [`TransferError::InvalidSource`] if it is not an absolute http(s) URL
    pub fn new(source: Option<&str>) -> Result<Self, TransferError> {
        let source_url = parse_source(source)?;
        Ok(Self {
            source_url,
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            requested_chunk_count: NonZeroUsize::new(DEFAULT_CHUNK_COUNT)
                .unwrap_or(NonZeroUsize::MIN),
            chunk_size_bytes: NonZeroU64::new(DEFAULT_CHUNK_SIZE_BYTES).unwrap_or(NonZeroU64::MIN),
            verbose: false,
            max_retries: DEFAULT_MAX_RETRIES,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        })
    }

    /// Sets the destination path.
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Sets the requested chunk count.
    #[must_use]
    pub fn with_chunk_count(mut self, count: NonZeroUsize) -> Self {
        self.requested_chunk_count = count;
        self
    }

    /// Sets the target chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, size: NonZeroU64) -> Self {
        self.chunk_size_bytes = size;
        self
    }

    /// Enables header tracing.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the per-chunk retry count.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets connect and whole-request timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    /// HTTP client settings derived from this configuration.
    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            trace_headers: self.verbose,
        }
    }

    /// Retry policy derived from this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_retries.saturating_add(1))
    }
}

fn parse_source(source: Option<&str>) -> Result<Url, TransferError> {
    let raw = source
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(TransferError::MissingSource)?;

    let url = Url::parse(raw).map_err(|e| TransferError::InvalidSource {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TransferError::InvalidSource {
            url: raw.to_string(),
            reason: format!("unsupported scheme `{other}`; only http and https are supported"),
        }),
    }
}
