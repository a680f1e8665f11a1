//! Optional retry with exponential backoff around chunk fetches.
//!
//! The core pipeline performs a single attempt per chunk. A [`RetryPolicy`]
//! with more than one attempt wraps [`fetch`](super::fetch::fetch) so that
//! transient failures are retried; each fetch is idempotent, so retrying
//! never changes what is assembled.
//!
//! # Example
//!
//! ```
//! use parallel_downloader::download::{DownloadError, FailureType, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::with_max_attempts(3);
//! let error = DownloadError::http_status("https://example.com/file.iso", 503);
//! assert_eq!(classify_error(&error), FailureType::Transient);
//!
//! match policy.should_retry(FailureType::Transient, 1) {
//!     RetryDecision::Retry { attempt, .. } => assert_eq!(attempt, 2),
//!     RetryDecision::DoNotRetry { .. } => unreachable!(),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::error::{DownloadError, FetchFailure};
use super::fetch::{ChunkOutcome, ChunkResult, fetch};
use super::plan::ByteRange;
use super::transport::Transport;

/// Default maximum retry attempts beyond the first.
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// Default base delay for exponential backoff (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, 5xx server errors, truncated body.
    Transient,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, server ignoring the Range header.
    Permanent,

    /// Server rate limiting (HTTP 429).
    RateLimited,
}

/// Decision on whether to retry a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt-1), max_delay) + jitter
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    /// Single attempt, no retries.
    fn default() -> Self {
        Self::with_max_attempts(DEFAULT_MAX_RETRIES + 1)
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(
            max_attempts,
            DEFAULT_BASE_DELAY,
            DEFAULT_MAX_DELAY,
            DEFAULT_BACKOFF_MULTIPLIER,
        )
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * f64::from(self.backoff_multiplier).powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
        Duration::from_millis(capped_ms as u64) + Duration::from_millis(jitter_ms)
    }
}

/// Classifies a transport error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout | Transient |
/// | Network (TLS/certificate) | Permanent |
/// | Network (other) | Transient |
/// | HTTP 408, 5xx | Transient |
/// | HTTP 429 | RateLimited |
/// | Other HTTP statuses | Permanent |
/// | InvalidUrl | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
        DownloadError::Timeout { .. } => FailureType::Transient,
        DownloadError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        DownloadError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

/// Classifies a chunk failure for retry decisions.
///
/// A truncated body is transient; a server that answers with the wrong span
/// or status will answer the same way again.
#[must_use]
pub fn classify_failure(failure: &FetchFailure) -> FailureType {
    match failure {
        FetchFailure::Transport(error) => classify_error(error),
        FetchFailure::LengthMismatch { .. } => FailureType::Transient,
        FetchFailure::UnexpectedStatus { .. }
        | FetchFailure::RangeMismatch { .. }
        | FetchFailure::SizeChanged { .. }
        | FetchFailure::TaskAborted(_) => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient,
        429 => FailureType::RateLimited,
        500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

fn is_tls_error(error: &reqwest::Error) -> bool {
    let error_string = error.to_string().to_lowercase();
    error_string.contains("certificate")
        || error_string.contains("tls")
        || error_string.contains("ssl")
        || error_string.contains("handshake")
}

/// Fetches `range`, retrying transient failures according to `policy`.
///
/// Returns the result of the last attempt.
#[instrument(skip(transport, policy), fields(chunk = range.index))]
pub async fn fetch_with_retry(
    transport: &dyn Transport,
    url: &str,
    range: ByteRange,
    total_size: u64,
    policy: &RetryPolicy,
) -> ChunkResult {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let result = fetch(transport, url, range, total_size).await;
        let ChunkOutcome::Failed(reason) = &result.outcome else {
            return result;
        };

        match policy.should_retry(classify_failure(reason), attempt) {
            RetryDecision::Retry { delay, attempt: next } => {
                debug!(next_attempt = next, delay_ms = delay.as_millis(), error = %reason, "retrying chunk");
                tokio::time::sleep(delay).await;
            }
            RetryDecision::DoNotRetry { reason: why } => {
                debug!(attempt, why = %why, "giving up on chunk");
                return result;
            }
        }
    }
}
