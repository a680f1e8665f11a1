//! Contract between the transfer pipeline and an HTTP implementation.
//!
//! The pipeline only needs two exchanges: a metadata-only request and a
//! ranged GET. [`HttpClient`](super::HttpClient) provides both over reqwest;
//! tests substitute in-memory implementations.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::DownloadError;
use super::plan::ByteRange;

/// Metadata returned by a metadata-only request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    /// Final status code after redirects.
    pub status: u16,
    /// Declared `Content-Length`, if present and numeric.
    pub content_length: Option<u64>,
    /// Whether the server advertised `Accept-Ranges: bytes`.
    pub accepts_ranges: bool,
}

/// Response to a ranged GET with a successful (2xx) status.
#[derive(Debug, Clone)]
pub struct RangeResponse {
    /// Status code (typically 206, or 200 if the range was ignored).
    pub status: u16,
    /// Raw `Content-Range` header, if any.
    pub content_range: Option<String>,
    /// Complete response body.
    pub body: Bytes,
}

/// HTTP capability consumed by the prober and fetcher.
///
/// Implementations follow redirects and own their timeouts. Non-2xx
/// responses to [`get_range`](Transport::get_range) are reported as
/// [`DownloadError::HttpStatus`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a metadata-only request for `url`.
    async fn head(&self, url: &str) -> Result<ProbeResponse, DownloadError>;

    /// Issues a GET for `url` constrained to `range`.
    async fn get_range(&self, url: &str, range: ByteRange) -> Result<RangeResponse, DownloadError>;
}
