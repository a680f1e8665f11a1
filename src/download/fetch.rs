//! Single ranged fetch of one planned chunk.
//!
//! [`fetch`] never returns an error: a rejected chunk is a [`ChunkResult`]
//! carrying [`ChunkOutcome::Failed`], so the coordinator can collect every
//! outcome before deciding the run's fate.

use bytes::Bytes;
use tracing::{debug, instrument, warn};

use super::error::FetchFailure;
use super::plan::ByteRange;
use super::transport::{RangeResponse, Transport};

/// Outcome of fetching one chunk.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// Body covering exactly the requested range.
    Fetched(Bytes),
    /// The chunk could not be obtained.
    Failed(FetchFailure),
}

/// Result for one planned range, keyed by its index.
#[derive(Debug)]
pub struct ChunkResult {
    /// Index of the range in the plan.
    pub index: usize,
    /// Fetched bytes or failure reason.
    pub outcome: ChunkOutcome,
}

impl ChunkResult {
    /// Builds a successful result.
    #[must_use]
    pub fn fetched(index: usize, bytes: Bytes) -> Self {
        Self {
            index,
            outcome: ChunkOutcome::Fetched(bytes),
        }
    }

    /// Builds a failed result.
    #[must_use]
    pub fn failed(index: usize, reason: FetchFailure) -> Self {
        Self {
            index,
            outcome: ChunkOutcome::Failed(reason),
        }
    }

    /// Returns true if the chunk was fetched.
    #[must_use]
    pub fn is_fetched(&self) -> bool {
        matches!(self.outcome, ChunkOutcome::Fetched(_))
    }
}

/// Fetches `range` of `url`.
///
/// `total_size` is the probed resource length; a `200` response is accepted
/// only when the range spans the whole resource.
#[instrument(skip(transport), fields(chunk = range.index, start = range.start, end = range.end))]
pub async fn fetch(
    transport: &dyn Transport,
    url: &str,
    range: ByteRange,
    total_size: u64,
) -> ChunkResult {
    let outcome = match transport.get_range(url, range).await {
        Ok(response) => match validate(&response, range, total_size) {
            Ok(()) => {
                debug!(bytes = response.body.len(), "chunk fetched");
                ChunkOutcome::Fetched(response.body)
            }
            Err(reason) => ChunkOutcome::Failed(reason),
        },
        Err(e) => ChunkOutcome::Failed(FetchFailure::Transport(e)),
    };

    if let ChunkOutcome::Failed(reason) = &outcome {
        warn!(error = %reason, "chunk fetch failed");
    }
    ChunkResult {
        index: range.index,
        outcome,
    }
}

fn validate(response: &RangeResponse, range: ByteRange, total_size: u64) -> Result<(), FetchFailure> {
    match response.status {
        206 => {
            if let Some(raw) = response.content_range.as_deref() {
                let Some((_, _, total)) = parse_content_range(raw)
                    .filter(|&(start, end, _)| (start, end) == (range.start, range.end))
                else {
                    return Err(FetchFailure::RangeMismatch {
                        start: range.start,
                        end: range.end,
                        actual: raw.to_string(),
                    });
                };
                // The resource changed after it was probed.
                if let Some(actual) = total.filter(|&t| t != total_size) {
                    return Err(FetchFailure::SizeChanged {
                        expected: total_size,
                        actual,
                    });
                }
            }
        }
        // A full-content answer is only valid when the full content was asked for.
        200 if range.start == 0 && range.end + 1 == total_size => {}
        status => {
            return Err(FetchFailure::UnexpectedStatus {
                status,
                start: range.start,
                end: range.end,
            });
        }
    }

    let actual = response.body.len() as u64;
    if actual != range.len() {
        return Err(FetchFailure::LengthMismatch {
            expected: range.len(),
            actual,
        });
    }
    Ok(())
}

/// Parses `bytes <start>-<end>/<total|*>` into `(start, end, total)`.
///
/// `total` is `None` when the server sends `*`.
fn parse_content_range(value: &str) -> Option<(u64, u64, Option<u64>)> {
    let spec = value.trim().strip_prefix("bytes")?.trim_start();
    let (span, total) = spec.split_once('/')?;
    let (start, end) = span.split_once('-')?;
    let total = match total.trim() {
        "*" => None,
        digits => Some(digits.parse().ok()?),
    };
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?, total))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::error::DownloadError;
    use crate::download::test_support::{MemoryTransport, patterned_body};

    fn range(index: usize, start: u64, end: u64) -> ByteRange {
        ByteRange { index, start, end }
    }

    fn response(status: u16, content_range: Option<&str>, body: &[u8]) -> RangeResponse {
        RangeResponse {
            status,
            content_range: content_range.map(ToString::to_string),
            body: Bytes::copy_from_slice(body),
        }
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("bytes 0-99/1000"), Some((0, 99, Some(1000))));
        assert_eq!(parse_content_range("bytes 100-199/*"), Some((100, 199, None)));
        assert_eq!(parse_content_range("bytes */1000"), None);
        assert_eq!(parse_content_range("bytes 0-1/abc"), None);
        assert_eq!(parse_content_range("items 0-1/2"), None);
    }

    #[test]
    fn test_validate_rejects_total_differing_from_probed_size() {
        let r = range(0, 0, 3);
        let err = validate(&response(206, Some("bytes 0-3/999999"), b"abcd"), r, 10).unwrap_err();
        assert!(matches!(
            err,
            FetchFailure::SizeChanged {
                expected: 10,
                actual: 999_999
            }
        ));
    }

    #[test]
    fn test_validate_accepts_unknown_total() {
        let r = range(0, 0, 3);
        assert!(validate(&response(206, Some("bytes 0-3/*"), b"abcd"), r, 10).is_ok());
    }

    #[test]
    fn test_validate_accepts_matching_partial_content() {
        let r = range(1, 4, 7);
        assert!(validate(&response(206, Some("bytes 4-7/10"), b"abcd"), r, 10).is_ok());
        assert!(validate(&response(206, None, b"abcd"), r, 10).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_content_range() {
        let r = range(1, 4, 7);
        let err = validate(&response(206, Some("bytes 0-3/10"), b"abcd"), r, 10).unwrap_err();
        assert!(matches!(err, FetchFailure::RangeMismatch { .. }));
    }

    #[test]
    fn test_validate_rejects_short_body() {
        let r = range(0, 0, 7);
        let err = validate(&response(206, Some("bytes 0-7/10"), b"abc"), r, 10).unwrap_err();
        assert!(matches!(
            err,
            FetchFailure::LengthMismatch {
                expected: 8,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_validate_full_content_only_for_whole_resource() {
        let whole = range(0, 0, 3);
        assert!(validate(&response(200, None, b"abcd"), whole, 4).is_ok());

        let partial = range(0, 0, 1);
        let err = validate(&response(200, None, b"abcd"), partial, 4).unwrap_err();
        assert!(matches!(err, FetchFailure::UnexpectedStatus { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_fetch_returns_range_bytes() {
        let body = patterned_body(1000);
        let transport = MemoryTransport::new(body.clone());
        let result = fetch(&transport, "https://example.com/f", range(2, 200, 299), 1000).await;
        assert_eq!(result.index, 2);
        match result.outcome {
            ChunkOutcome::Fetched(bytes) => assert_eq!(&bytes[..], &body[200..300]),
            ChunkOutcome::Failed(reason) => panic!("unexpected failure: {reason}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_transport_error_is_failed_outcome() {
        let transport = MemoryTransport::new(patterned_body(100)).with_failing_chunks(&[0]);
        let result = fetch(&transport, "https://example.com/f", range(0, 0, 49), 100).await;
        assert!(!result.is_fetched());
        assert!(matches!(
            result.outcome,
            ChunkOutcome::Failed(FetchFailure::Transport(DownloadError::Timeout { .. }))
        ));
    }

    #[tokio::test]
    async fn test_fetch_rejects_server_ignoring_range() {
        let transport = MemoryTransport::new(patterned_body(100)).ignoring_ranges();
        let result = fetch(&transport, "https://example.com/f", range(1, 50, 99), 100).await;
        assert!(matches!(
            result.outcome,
            ChunkOutcome::Failed(FetchFailure::UnexpectedStatus { status: 200, .. })
        ));
    }
}
