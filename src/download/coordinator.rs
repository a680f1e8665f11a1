//! Concurrent dispatch of chunk fetches with a join barrier.
//!
//! # Concurrency Model
//!
//! - Each planned range gets its own Tokio task, spawned up front
//! - A semaphore permit is acquired inside the task before its request starts,
//!   capping simultaneous requests at [`TransferPlan::max_in_flight`]
//! - Task handles live in a vector aligned with range indices, so each result
//!   lands in the slot of the range it serves
//! - Every task is awaited, success or failure, before the coordinator returns

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::error::{ChunkFailure, FetchFailure, TransferError};
use super::fetch::{ChunkOutcome, ChunkResult};
use super::plan::TransferPlan;
use super::retry::{RetryPolicy, fetch_with_retry};
use super::transport::Transport;

/// Runs every fetch of a [`TransferPlan`] concurrently.
#[derive(Clone)]
pub struct ParallelCoordinator {
    transport: Arc<dyn Transport>,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for ParallelCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelCoordinator")
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl ParallelCoordinator {
    /// Creates a coordinator issuing requests through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, retry_policy: RetryPolicy) -> Self {
        Self {
            transport,
            retry_policy,
        }
    }

    /// Fetches every range in `plan` and returns the results in index order.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::ChunkFetchFailure`] naming every failed index
    /// once all tasks have settled.
    #[instrument(skip(self, plan), fields(chunks = plan.chunk_count(), max_in_flight = plan.max_in_flight()))]
    pub async fn run_all(
        &self,
        url: &str,
        plan: &TransferPlan,
    ) -> Result<Vec<ChunkResult>, TransferError> {
        let semaphore = Arc::new(Semaphore::new(plan.max_in_flight()));
        let url: Arc<str> = Arc::from(url);
        let total_size = plan.total_size();

        let handles: Vec<JoinHandle<ChunkResult>> = plan
            .ranges()
            .iter()
            .map(|&range| {
                info!(chunk = range.index + 1, size = range.len(), "chunk planned");
                let transport = Arc::clone(&self.transport);
                let semaphore = Arc::clone(&semaphore);
                let url = Arc::clone(&url);
                let policy = self.retry_policy.clone();
                tokio::spawn(async move {
                    // Permit is dropped when this block exits (RAII)
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return ChunkResult::failed(
                            range.index,
                            FetchFailure::TaskAborted("semaphore closed".to_string()),
                        );
                    };
                    fetch_with_retry(transport.as_ref(), &url, range, total_size, &policy).await
                })
            })
            .collect();

        debug!(task_count = handles.len(), "waiting for chunk fetches to settle");

        let mut results = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(chunk = index, error = %e, "fetch task panicked");
                    ChunkResult::failed(index, FetchFailure::TaskAborted(e.to_string()))
                }
            };
            results.push(result);
        }

        let failures = collect_failures(&mut results);
        if !failures.is_empty() {
            warn!(failed = failures.len(), "chunk fetches failed");
            return Err(TransferError::ChunkFetchFailure { failures });
        }

        debug!(chunks = results.len(), "all chunk fetches succeeded");
        Ok(results)
    }
}

/// Moves failed outcomes out of `results`, keeping index order.
fn collect_failures(results: &mut Vec<ChunkResult>) -> Vec<ChunkFailure> {
    let (failed, fetched): (Vec<_>, Vec<_>) = std::mem::take(results)
        .into_iter()
        .partition(|r| !r.is_fetched());
    *results = fetched;
    failed
        .into_iter()
        .filter_map(|r| match r.outcome {
            ChunkOutcome::Failed(reason) => Some(ChunkFailure {
                index: r.index,
                reason,
            }),
            ChunkOutcome::Fetched(_) => None,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::{NonZeroU64, NonZeroUsize};
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::download::plan::plan;
    use crate::download::test_support::{MemoryTransport, patterned_body};

    fn make_plan(total: u64, chunks: usize, size: u64) -> TransferPlan {
        plan(
            total,
            NonZeroUsize::new(chunks).unwrap(),
            NonZeroU64::new(size).unwrap(),
        )
    }

    fn coordinator(transport: &Arc<MemoryTransport>) -> ParallelCoordinator {
        let transport: Arc<dyn Transport> = transport.clone();
        ParallelCoordinator::new(transport, RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_run_all_returns_results_in_index_order() {
        let body = patterned_body(1000);
        let transport = Arc::new(MemoryTransport::new(body.clone()).with_reverse_completion());
        let plan = make_plan(1000, 8, 125);

        let results = coordinator(&transport)
            .run_all("https://example.com/f", &plan)
            .await
            .unwrap();

        assert_eq!(results.len(), 8);
        let mut joined = Vec::new();
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.index, i);
            let ChunkOutcome::Fetched(bytes) = &result.outcome else {
                panic!("chunk {i} failed");
            };
            joined.extend_from_slice(bytes);
        }
        assert_eq!(joined, body);
    }

    #[tokio::test]
    async fn test_run_all_reports_failed_index_after_all_settle() {
        let transport = Arc::new(MemoryTransport::new(patterned_body(400)).with_failing_chunks(&[2]));
        let plan = make_plan(400, 4, 100);

        let err = coordinator(&transport)
            .run_all("https://example.com/f", &plan)
            .await
            .unwrap_err();

        assert_eq!(err.failed_indices(), vec![2]);
        assert_eq!(transport.get_calls(), 4, "every sibling must still run");
    }

    #[tokio::test]
    async fn test_run_all_reports_every_failed_index() {
        let transport =
            Arc::new(MemoryTransport::new(patterned_body(500)).with_failing_chunks(&[4, 0]));
        let plan = make_plan(500, 5, 100);

        let err = coordinator(&transport)
            .run_all("https://example.com/f", &plan)
            .await
            .unwrap_err();

        assert_eq!(err.failed_indices(), vec![0, 4]);
    }

    #[tokio::test]
    async fn test_run_all_respects_concurrency_ceiling() {
        let transport = Arc::new(MemoryTransport::new(patterned_body(1000)));
        let plan = make_plan(1000, 3, 50);
        assert_eq!(plan.chunk_count(), 20);

        let results = coordinator(&transport)
            .run_all("https://example.com/f", &plan)
            .await
            .unwrap();

        assert_eq!(results.len(), 20);
        let peak = transport.peak_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight {peak} exceeded ceiling");
    }

    #[tokio::test]
    async fn test_run_all_empty_plan_issues_no_requests() {
        let transport = Arc::new(MemoryTransport::new(Vec::new()));
        let plan = make_plan(0, 4, 100);

        let results = coordinator(&transport)
            .run_all("https://example.com/f", &plan)
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(transport.get_calls(), 0);
    }
}
