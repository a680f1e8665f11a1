//! In-memory [`Transport`] for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::error::DownloadError;
use super::plan::ByteRange;
use super::transport::{ProbeResponse, RangeResponse, Transport};

/// Serves a fixed body, honouring ranges, with configurable faults.
#[derive(Debug)]
pub(crate) struct MemoryTransport {
    body: Bytes,
    head_status: u16,
    content_length: bool,
    failing_head: bool,
    failing_indices: Vec<usize>,
    ignore_range: bool,
    reverse_completion: bool,
    in_flight: AtomicUsize,
    pub(crate) peak_in_flight: AtomicUsize,
    pub(crate) head_calls: AtomicUsize,
    pub(crate) get_calls: AtomicUsize,
}

impl MemoryTransport {
    pub(crate) fn new(body: Vec<u8>) -> Self {
        Self {
            body: Bytes::from(body),
            head_status: 200,
            content_length: true,
            failing_head: false,
            failing_indices: Vec::new(),
            ignore_range: false,
            reverse_completion: false,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            head_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_head_status(mut self, status: u16) -> Self {
        self.head_status = status;
        self
    }

    pub(crate) fn without_content_length(mut self) -> Self {
        self.content_length = false;
        self
    }

    pub(crate) fn with_failing_head(mut self) -> Self {
        self.failing_head = true;
        self
    }

    /// Ranges with these indices time out.
    pub(crate) fn with_failing_chunks(mut self, indices: &[usize]) -> Self {
        self.failing_indices = indices.to_vec();
        self
    }

    /// Answers every GET with 200 and the whole body.
    pub(crate) fn ignoring_ranges(mut self) -> Self {
        self.ignore_range = true;
        self
    }

    /// Later ranges finish before earlier ones.
    pub(crate) fn with_reverse_completion(mut self) -> Self {
        self.reverse_completion = true;
        self
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn head(&self, url: &str) -> Result<ProbeResponse, DownloadError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_head {
            return Err(DownloadError::timeout(url));
        }
        Ok(ProbeResponse {
            status: self.head_status,
            content_length: self.content_length.then_some(self.body.len() as u64),
            accepts_ranges: true,
        })
    }

    async fn get_range(&self, url: &str, range: ByteRange) -> Result<RangeResponse, DownloadError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay_ms = if self.reverse_completion {
            50u64.saturating_sub(range.index as u64 * 5)
        } else {
            5
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_indices.contains(&range.index) {
            return Err(DownloadError::timeout(url));
        }
        if self.ignore_range {
            return Ok(RangeResponse {
                status: 200,
                content_range: None,
                body: self.body.clone(),
            });
        }

        let start = usize::try_from(range.start).unwrap_or(usize::MAX);
        let end = usize::try_from(range.end).unwrap_or(usize::MAX);
        if start >= self.body.len() {
            return Err(DownloadError::http_status(url, 416));
        }
        let end = end.min(self.body.len() - 1);
        Ok(RangeResponse {
            status: 206,
            content_range: Some(format!("bytes {start}-{end}/{}", self.body.len())),
            body: self.body.slice(start..=end),
        })
    }
}

/// Deterministic test payload of `len` bytes.
pub(crate) fn patterned_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
