//! Size probing of the remote resource.

use tracing::{debug, instrument, warn};

use super::error::TransferError;
use super::transport::Transport;

/// Size information established by a successful probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Transferable length of the resource in bytes.
    pub total_size: u64,
    /// Whether the server advertised byte-range support.
    pub accepts_ranges: bool,
}

/// Returns true for statuses whose metadata describes the final resource.
fn is_usable_status(status: u16) -> bool {
    status == 200 || (301..=308).contains(&status)
}

/// Issues a metadata-only request for `url` and derives the total size.
///
/// No retry is attempted here.
///
/// # Errors
///
/// Returns [`TransferError::SizeUnavailable`] if the request fails, the
/// status is neither 200 nor 301-308, or no `Content-Length` is declared.
#[instrument(skip(transport))]
pub async fn probe(transport: &dyn Transport, url: &str) -> Result<ProbeOutcome, TransferError> {
    let response = transport
        .head(url)
        .await
        .map_err(|e| TransferError::size_unavailable(url, e.to_string()))?;

    if !is_usable_status(response.status) {
        return Err(TransferError::size_unavailable(
            url,
            format!("server responded with HTTP {}", response.status),
        ));
    }

    let Some(total_size) = response.content_length else {
        return Err(TransferError::size_unavailable(
            url,
            "no Content-Length in response",
        ));
    };

    if !response.accepts_ranges {
        warn!(url, "server does not advertise byte-range support");
    }
    debug!(total_size, accepts_ranges = response.accepts_ranges, "probe complete");

    Ok(ProbeOutcome {
        total_size,
        accepts_ranges: response.accepts_ranges,
    })
}
