//! Parallel Downloader Library
//!
//! Downloads a single remote file over HTTP by splitting it into byte ranges,
//! fetching the ranges concurrently, and reassembling them in order.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Immutable run configuration
//! - [`download`] - Probe, plan, concurrent fetch and ordered assembly

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
mod user_agent;

// Re-export commonly used types
pub use config::DownloadConfiguration;
pub use download::{
    ByteRange, ChunkResult, DownloadError, DownloadOrchestrator, DownloadSummary, HttpClient,
    ParallelCoordinator, RetryPolicy, RunFailure, TransferError, TransferPlan, TransferState,
};
