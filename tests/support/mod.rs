//! Shared helpers for integration tests: a wiremock responder that honours
//! `Range` headers the way a real file server does.

#![allow(dead_code)]

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves `body` with byte-range support.
///
/// - `Range: bytes=a-b` → 206 with the slice and `Content-Range`
/// - no `Range` header → 200 with the whole body
/// - range beyond the body → 416
/// - any range whose start is listed in `failing_starts` → 500
pub struct RangeResponder {
    body: Vec<u8>,
    failing_starts: Vec<u64>,
}

impl RangeResponder {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            failing_starts: Vec::new(),
        }
    }

    pub fn failing_at(mut self, starts: &[u64]) -> Self {
        self.failing_starts = starts.to_vec();
        self
    }
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Some(raw) = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
        else {
            return ResponseTemplate::new(200).set_body_bytes(self.body.clone());
        };

        let Some((start, end)) = parse_range(raw) else {
            return ResponseTemplate::new(400);
        };
        if self.failing_starts.contains(&start) {
            return ResponseTemplate::new(500);
        }

        let len = self.body.len() as u64;
        if start >= len || start > end {
            return ResponseTemplate::new(416)
                .insert_header("Content-Range", format!("bytes */{len}"));
        }
        let end = end.min(len - 1);
        let slice = self.body[start as usize..=end as usize].to_vec();
        ResponseTemplate::new(206)
            .insert_header("Content-Range", format!("bytes {start}-{end}/{len}"))
            .set_body_bytes(slice)
    }
}

fn parse_range(raw: &str) -> Option<(u64, u64)> {
    let (start, end) = raw.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// Deterministic test payload of `len` bytes.
pub fn patterned_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

/// Mounts a HEAD endpoint advertising `body`'s length and range support.
pub async fn mount_head(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Accept-Ranges", "bytes")
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

/// Mounts HEAD and ranged GET endpoints serving `body` at `route`.
pub async fn mount_file(server: &MockServer, route: &str, body: &[u8]) {
    mount_head(server, route, body).await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(RangeResponder::new(body.to_vec()))
        .mount(server)
        .await;
}

/// Range headers of every GET the server received, in arrival order.
pub async fn received_ranges(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .map(|r| {
            r.headers
                .get("range")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}
