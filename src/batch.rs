//! Batch orchestration: fan out one unit of work per target, collect exactly
//! one [`BatchOutcome`] per operation, in input order.

use crate::admission::PlatformGates;
use crate::error::{BatchError, ProviderError};
use crate::models::{BatchOutcome, BatchStatus, BatchTarget, Platform, WorkReport};
use crate::retry::RetryPolicy;
use futures::future::{join_all, BoxFuture};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Gate + retry wrapper applied to every collaborator call. Cloning is cheap
/// and clones share the same per-platform gates.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    gates: PlatformGates,
    retry: RetryPolicy,
}

impl CallPolicy {
    pub fn new(gates: PlatformGates, retry: RetryPolicy) -> Self {
        Self { gates, retry }
    }

    pub fn gates(&self) -> &PlatformGates {
        &self.gates
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run one collaborator call against `platform`. A gate permit is held for
    /// each attempt only, never while backing off.
    pub async fn call<T, F, Fut>(&self, platform: Platform, label: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let gates = &self.gates;
        self.retry
            .run(label, || {
                let attempt = op();
                async move {
                    let _permit = gates.acquire(platform).await;
                    attempt.await
                }
            })
            .await
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(PlatformGates::new(2), RetryPolicy::default())
    }
}

/// A unit of reconciliation-plus-write for one target.
pub struct BatchOperation {
    target: BatchTarget,
    work: BoxFuture<'static, Result<WorkReport, BatchError>>,
}

impl BatchOperation {
    pub fn new<F>(target: BatchTarget, work: F) -> Self
    where
        F: Future<Output = Result<WorkReport, BatchError>> + Send + 'static,
    {
        Self { target, work: Box::pin(work) }
    }

    pub fn target(&self) -> &BatchTarget {
        &self.target
    }
}

/// Schedules batch operations. Owns only the per-operation timeout and the
/// cancellation signal; playlist data flows through the operations.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    timeout: Duration,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, cancel: CancellationToken::new() }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Bound a single step that is not itself a batch operation (listing a
    /// platform, say) by the same timeout and cancellation signal.
    pub async fn guard<T, F>(&self, work: F) -> Result<T, BatchError>
    where
        F: Future<Output = Result<T, BatchError>>,
    {
        execute(work, self.timeout, self.cancel.clone()).await
    }

    /// Run every operation concurrently, each isolated in its own task.
    ///
    /// Always returns exactly one outcome per operation, index-aligned with
    /// `operations`. Timeouts, cancellation and panics become `Failed`
    /// outcomes; they never affect sibling operations.
    pub async fn run_batch(&self, operations: Vec<BatchOperation>) -> Vec<BatchOutcome> {
        let batch_id = Uuid::new_v4();
        let total = operations.len();
        info!(%batch_id, total, "starting batch");

        let (targets, handles): (Vec<_>, Vec<_>) = operations
            .into_iter()
            .enumerate()
            .map(|(index, op)| {
                let span = info_span!("batch_op", %batch_id, index, op = %op.target);
                let task = execute(op.work, self.timeout, self.cancel.clone()).instrument(span);
                (op.target, tokio::spawn(task))
            })
            .unzip();

        let joined = join_all(handles).await;

        let outcomes: Vec<BatchOutcome> = targets
            .into_iter()
            .zip(joined)
            .map(|(target, joined)| {
                let result = joined.unwrap_or_else(|e| Err(BatchError::Aborted(e.to_string())));
                let outcome = BatchOutcome::from_result(target, result);
                log_outcome(&outcome);
                outcome
            })
            .collect();

        let ok = outcomes.iter().filter(|o| o.is_success()).count();
        info!(%batch_id, total, ok, failed_or_partial = total - ok, "batch finished");
        outcomes
    }
}

async fn execute<T, F>(work: F, timeout: Duration, cancel: CancellationToken) -> Result<T, BatchError>
where
    F: Future<Output = Result<T, BatchError>>,
{
    if cancel.is_cancelled() {
        return Err(BatchError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BatchError::Cancelled),
        res = tokio::time::timeout(timeout, work) => res.unwrap_or(Err(BatchError::Timeout(timeout))),
    }
}

fn log_outcome(outcome: &BatchOutcome) {
    let op = outcome.target();
    match (outcome.status(), outcome.error()) {
        (BatchStatus::Success, _) => {
            let tracks = outcome.playlist().map(|p| p.len()).unwrap_or(0);
            info!(%op, tracks, "operation succeeded");
        }
        (BatchStatus::Partial, Some(e)) => warn!(%op, "operation partially succeeded: {}", e),
        (_, Some(e)) => error!(%op, "operation failed: {}", e),
        (_, None) => error!(%op, "operation failed"),
    }
}
