//! reqwest-backed implementation of [`Transport`].
//!
//! This module provides the `HttpClient` struct which issues the probe and
//! ranged requests with timeout configuration and error mapping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, HeaderMap, RANGE, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::plan::ByteRange;
use super::transport::{ProbeResponse, RangeResponse, Transport};
use crate::user_agent;

/// Settings for building an [`HttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout (headers and body).
    pub read_timeout: Duration,
    /// Log request and response headers of every exchange.
    pub trace_headers: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            trace_headers: false,
        }
    }
}

/// HTTP client for probing and ranged fetches.
///
/// Created once per run and shared by every fetch task, taking advantage of
/// connection pooling. Redirects are followed (reqwest default policy).
/// Response bodies are not decompressed, so ranged bodies stay byte-exact.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    trace_headers: bool,
}

impl HttpClient {
    /// Builds a client from `settings`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend or system
    /// configuration cannot be initialised.
    pub fn new(settings: HttpSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self {
            client,
            trace_headers: settings.trace_headers,
        })
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let request = request.build().map_err(|e| DownloadError::network(url, e))?;
        if self.trace_headers {
            debug!(
                method = %request.method(),
                url = %request.url(),
                headers = ?request.headers(),
                "sending request"
            );
        }

        let response = self.client.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        if self.trace_headers {
            debug!(
                status = response.status().as_u16(),
                final_url = %response.url(),
                headers = ?response.headers(),
                "received response"
            );
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(level = "debug", skip(self))]
    async fn head(&self, url: &str) -> Result<ProbeResponse, DownloadError> {
        let response = self.send(self.client.head(url), url).await?;
        let headers = response.headers();
        Ok(ProbeResponse {
            status: response.status().as_u16(),
            content_length: parse_content_length(headers),
            accepts_ranges: headers
                .get(ACCEPT_RANGES)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("bytes")),
        })
    }

    #[instrument(level = "debug", skip(self), fields(chunk = range.index))]
    async fn get_range(&self, url: &str, range: ByteRange) -> Result<RangeResponse, DownloadError> {
        let request = self.client.get(url).header(RANGE, range.header_value());
        let response = self.send(request, url).await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
            return Err(DownloadError::http_status_with_retry_after(
                url,
                status.as_u16(),
                retry_after,
            ));
        }

        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        Ok(RangeResponse {
            status: status.as_u16(),
            content_range,
            body,
        })
    }
}

/// Reads `Content-Length` from the header map rather than the body size hint,
/// which is zero for HEAD responses.
fn parse_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_content_length_numeric() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10485760"));
        assert_eq!(parse_content_length(&headers), Some(10_485_760));
    }

    #[test]
    fn test_parse_content_length_missing_or_invalid() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_content_length(&headers), None);
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("-1"));
        assert_eq!(parse_content_length(&headers), None);
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("abc"));
        assert_eq!(parse_content_length(&headers), None);
    }

    #[test]
    fn test_default_settings_use_module_timeouts() {
        let settings = HttpSettings::default();
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
        assert_eq!(settings.read_timeout, Duration::from_secs(300));
        assert!(!settings.trace_headers);
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_request() {
        let client = HttpClient::new(HttpSettings::default()).unwrap();
        let result = client.head("not a url").await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }
}
