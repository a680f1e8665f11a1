//! CLI argument definitions using clap derive macros.

use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use parallel_downloader::download::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CHUNK_COUNT, DEFAULT_CHUNK_SIZE_BYTES, DEFAULT_MAX_RETRIES,
    DEFAULT_OUTPUT_FILE, MAX_CHUNK_COUNT, READ_TIMEOUT_SECS,
};
use parallel_downloader::{DownloadConfiguration, TransferError};

/// Download a single file over HTTP using concurrent byte-range requests.
///
/// The file is split into chunks that are fetched in parallel and written
/// to the output file in their original order.
#[derive(Parser, Debug)]
#[command(name = "downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Source URL to download (http or https)
    #[arg(long)]
    pub source: Option<String>,

    /// Destination file, relative to the working directory
    #[arg(long = "output_file", default_value = DEFAULT_OUTPUT_FILE)]
    pub output_file: PathBuf,

    /// Maximum number of chunks fetched at the same time (1-100)
    #[arg(long, default_value_t = DEFAULT_CHUNK_COUNT as u16, value_parser = clap::value_parser!(u16).range(1..=MAX_CHUNK_COUNT as i64))]
    pub chunks: u16,

    /// Target chunk size in bytes
    #[arg(long = "chunk_size", default_value_t = DEFAULT_CHUNK_SIZE_BYTES, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: u64,

    /// Increase output verbosity (-v for debug with header tracing, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Retry attempts per chunk for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub retries: u8,

    /// HTTP connect timeout in seconds
    #[arg(long = "connect-timeout", default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds (per chunk)
    #[arg(long = "read-timeout", default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout: u64,
}

impl Args {
    /// Resolves the immutable run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::MissingSource`] or
    /// [`TransferError::InvalidSource`] when `--source` is absent or unusable.
    pub fn to_configuration(&self) -> Result<DownloadConfiguration, TransferError> {
        let mut config = DownloadConfiguration::new(self.source.as_deref())?
            .with_output_path(self.output_file.clone())
            .with_verbose(self.verbose > 0)
            .with_max_retries(u32::from(self.retries))
            .with_timeouts(
                Duration::from_secs(self.connect_timeout),
                Duration::from_secs(self.read_timeout),
            );
        // Zero is rejected by the value parsers.
        if let Some(count) = NonZeroUsize::new(usize::from(self.chunks)) {
            config = config.with_chunk_count(count);
        }
        if let Some(size) = NonZeroU64::new(self.chunk_size) {
            config = config.with_chunk_size(size);
        }
        Ok(config)
    }
}
