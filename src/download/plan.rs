//! Partitioning of a resource into bounded-size byte ranges.
//!
//! Planning is pure: the same inputs always produce the same [`TransferPlan`].
//! The plan always covers `[0, total_size)` exactly once. The requested chunk
//! count bounds how many ranges are fetched at the same time, not how many
//! ranges exist, so a chunk count/size pair too small for the file is extended
//! rather than silently transferring a prefix.

use std::num::{NonZeroU64, NonZeroUsize};

use tracing::{debug, warn};

/// One inclusive byte span of the source resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Position of this range in the plan (0-based).
    pub index: usize,
    /// First byte, inclusive.
    pub start: u64,
    /// Last byte, inclusive.
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by this range.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false: a range covers at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the HTTP `Range` request header.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Ordered, non-overlapping partition of a resource into byte ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    total_size: u64,
    chunk_size: u64,
    ranges: Vec<ByteRange>,
    max_in_flight: usize,
}

impl TransferPlan {
    /// Total size of the resource in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Target size of each range; only the last may be shorter.
    #[must_use]
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Ranges in ascending offset order.
    #[must_use]
    pub fn ranges(&self) -> &[ByteRange] {
        &self.ranges
    }

    /// Actual number of chunks (may differ from the requested count).
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.ranges.len()
    }

    /// Maximum number of ranges fetched simultaneously.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

/// Computes the transfer plan for a resource of `total_size` bytes.
///
/// Range `i` starts at `i * chunk_size`. When fewer than `chunk_size` bytes
/// remain, the range is clamped to end at `total_size - 1` and planning stops.
/// A zero-length resource yields a plan with no ranges.
#[must_use]
pub fn plan(
    total_size: u64,
    requested_chunk_count: NonZeroUsize,
    chunk_size_bytes: NonZeroU64,
) -> TransferPlan {
    let chunk_size = chunk_size_bytes.get();
    let mut ranges = Vec::new();
    let mut index = 0usize;

    loop {
        let start = index as u64 * chunk_size;
        if start >= total_size {
            break;
        }
        let remaining = total_size - start;
        if remaining < chunk_size {
            ranges.push(ByteRange {
                index,
                start,
                end: start + remaining - 1,
            });
            break;
        }
        ranges.push(ByteRange {
            index,
            start,
            end: start + chunk_size - 1,
        });
        index += 1;
    }

    let requested = requested_chunk_count.get();
    if ranges.len() > requested {
        warn!(
            requested,
            planned = ranges.len(),
            chunk_size,
            total_size,
            "requested chunks do not cover the file; extending plan"
        );
    }
    let max_in_flight = requested.min(ranges.len());

    debug!(
        total_size,
        chunk_size,
        chunks = ranges.len(),
        max_in_flight,
        "transfer planned"
    );

    TransferPlan {
        total_size,
        chunk_size,
        ranges,
        max_in_flight,
    }
}
