//! Constants for the download module (timeouts, chunk defaults).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large chunks).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of chunks requested (also the default fetch concurrency).
pub const DEFAULT_CHUNK_COUNT: usize = 4;

/// Default chunk size in bytes (1 MiB).
pub const DEFAULT_CHUNK_SIZE_BYTES: u64 = 1_048_576;

/// Upper bound on requested chunk count, i.e. simultaneous range requests.
pub const MAX_CHUNK_COUNT: usize = 100;

/// Default destination path, relative to the working directory.
pub const DEFAULT_OUTPUT_FILE: &str = "output";
