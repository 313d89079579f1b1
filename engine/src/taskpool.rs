use crate::cleanup::{Batch, DeletionTask, OutcomeReporter, Outcome, ResourceName, TaskState};
use crate::common::{DeleteRateLimiter, ProviderError};
use crate::provider::ResourceProvider;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Bounded pool of deletion tasks.
///
/// A counting semaphore gates admission: the dispatcher takes a permit before
/// spawning each task and the task hands it back when it terminates, so at most
/// `limit` deletions are in flight. When every permit is out the dispatcher
/// waits; running tasks never wait on each other.
pub struct TaskPool {
    semaphore: Arc<Semaphore>,
    limit: usize,
    cancel_token: CancellationToken,
    task_timeout: Option<Duration>,
    rate_limiter: Option<DeleteRateLimiter>,
}

/// Shared per-batch context handed to each spawned task
#[derive(Clone)]
struct TaskContext {
    provider: Arc<dyn ResourceProvider>,
    reporter: Arc<OutcomeReporter>,
    cancel_token: CancellationToken,
    task_timeout: Option<Duration>,
    rate_limiter: Option<DeleteRateLimiter>,
    results: flume::Sender<(ResourceName, Outcome)>,
}

impl TaskPool {
    pub fn new(limit: usize, cancel_token: CancellationToken) -> TaskPool {
        let limit = limit.max(1);
        TaskPool {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            cancel_token,
            task_timeout: None,
            rate_limiter: None,
        }
    }

    pub fn with_task_timeout(mut self, task_timeout: Option<Duration>) -> Self {
        self.task_timeout = task_timeout;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Option<DeleteRateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of tasks currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    /// Delete every name in `batch` and wait until all dispatched tasks have
    /// reached a terminal state.
    ///
    /// Returns one `(name, outcome)` per dispatched task, in completion order.
    /// When the cancel token fires, admission stops; names that were never
    /// admitted are not part of the result.
    pub async fn run(
        &self,
        batch: &Batch,
        provider: Arc<dyn ResourceProvider>,
        reporter: Arc<OutcomeReporter>,
    ) -> Vec<(ResourceName, Outcome)> {
        let (tx, rx) = flume::unbounded();
        let context = TaskContext {
            provider,
            reporter,
            cancel_token: self.cancel_token.clone(),
            task_timeout: self.task_timeout,
            rate_limiter: self.rate_limiter.clone(),
            results: tx,
        };

        let mut dispatched = 0usize;
        for name in batch.names() {
            let mut task = DeletionTask::new(name.clone());

            let permit = tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    task.transition(TaskState::Cancelled);
                    log::info!(
                        "Batch {}: admission stopped after {dispatched} of {} tasks",
                        batch.number(),
                        batch.len()
                    );
                    break;
                }
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        log::error!("Task pool semaphore closed, stopping dispatch");
                        break;
                    }
                },
            };

            task.transition(TaskState::InFlight);
            dispatched += 1;

            let context = context.clone();
            tokio::spawn(async move {
                // Declared after the slot so the permit is returned before the
                // slot's result sender is dropped
                let mut slot = CompletionSlot::new(task, context);
                let _permit = permit;
                let outcome = slot.execute().await;
                slot.complete(outcome);
            });
        }

        // Only the spawned tasks hold senders now; the channel closes once the
        // last of them has reported.
        drop(context);

        let mut results = Vec::with_capacity(dispatched);
        while let Ok(result) = rx.recv_async().await {
            results.push(result);
        }

        log::debug!(
            "Batch {}: {} of {} tasks reached a terminal state",
            batch.number(),
            results.len(),
            dispatched
        );
        results
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.semaphore.close();
    }
}

/// Reports exactly one outcome for its task.
///
/// If the task is torn down before reporting (runtime shutdown, a panic
/// outside the guarded provider call) the drop handler records a failure so the
/// recorded total still matches the dispatched total.
struct CompletionSlot {
    task: Option<DeletionTask>,
    context: TaskContext,
}

impl CompletionSlot {
    fn new(task: DeletionTask, context: TaskContext) -> Self {
        Self {
            task: Some(task),
            context,
        }
    }

    async fn execute(&self) -> Outcome {
        let Some(task) = self.task.as_ref() else {
            return Outcome::Cancelled;
        };
        let name = task.name();

        tokio::select! {
            biased;
            () = self.context.cancel_token.cancelled() => Outcome::Cancelled,
            result = delete_guarded(&self.context, name) => Outcome::from(result),
        }
    }

    fn complete(&mut self, outcome: Outcome) {
        let Some(task) = self.task.take() else {
            return;
        };
        let name = task.finish(&outcome);
        self.context.reporter.record(&name, &outcome);
        // The receiver outlives every task of the batch
        let _ = self.context.results.send((name, outcome));
    }
}

impl Drop for CompletionSlot {
    fn drop(&mut self) {
        if self.task.is_some() {
            log::error!("Deletion task ended without reporting an outcome");
            self.complete(Outcome::Failed(ProviderError::panicked(
                "task terminated before reporting an outcome",
            )));
        }
    }
}

async fn delete_guarded(context: &TaskContext, name: &ResourceName) -> Result<(), ProviderError> {
    if let Some(limiter) = &context.rate_limiter {
        limiter.acquire().await;
    }

    let call = AssertUnwindSafe(context.provider.delete_one(name)).catch_unwind();
    let result = match context.task_timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => {
                return Err(ProviderError::timeout(format!(
                    "deletion of {name} did not finish within {limit:?}"
                )));
            }
        },
        None => call.await,
    };

    result.unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        log::error!("Provider panicked while deleting {name}: {reason}");
        Err(ProviderError::panicked(reason))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "provider call panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::MemorySink;
    use crate::common::ProviderErrorKind;
    use crate::provider::InMemoryProvider;

    fn batch_of(count: usize) -> (Batch, Vec<String>) {
        let names: Vec<String> = (0..count).map(|i| format!("res-{i:03}")).collect();
        let batch = Batch::new(1, 1, names.iter().map(|n| n.as_str().into()).collect());
        (batch, names)
    }

    fn reporter() -> Arc<OutcomeReporter> {
        Arc::new(OutcomeReporter::new(Arc::new(MemorySink::default())))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_limit_under_slow_provider() {
        let (batch, names) = batch_of(30);
        let provider = Arc::new(
            InMemoryProvider::new(names).with_delete_latency(Duration::from_millis(20)),
        );
        let pool = TaskPool::new(4, CancellationToken::new());

        let results = pool.run(&batch, provider.clone(), reporter()).await;

        assert_eq!(results.len(), 30);
        assert!(results.iter().all(|(_, outcome)| outcome.is_success()));
        assert!(provider.peak_in_flight() <= 4);
        assert!(provider.peak_in_flight() >= 2);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn panicking_delete_is_isolated() {
        let (batch, names) = batch_of(5);
        let provider = Arc::new(InMemoryProvider::new(names).panic_on_delete_of("res-002"));
        let pool = TaskPool::new(2, CancellationToken::new());
        let reporter = reporter();

        let results = pool.run(&batch, provider, reporter.clone()).await;

        assert_eq!(results.len(), 5);
        let (_, outcome) = results
            .iter()
            .find(|(name, _)| name == "res-002")
            .unwrap();
        assert_eq!(outcome.error().unwrap().kind, ProviderErrorKind::Panicked);

        let summary = reporter.summarize();
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn returned_outcomes_match_recorded_outcomes() {
        let (batch, names) = batch_of(12);
        let provider = Arc::new(
            InMemoryProvider::new(names)
                .panic_on_delete_of("res-004")
                .fail_deletion_of("res-007", ProviderErrorKind::Throttled),
        );
        let pool = TaskPool::new(3, CancellationToken::new());
        let reporter = reporter();

        let results = pool.run(&batch, provider, reporter.clone()).await;

        assert_eq!(results.len(), batch.len());
        assert_eq!(reporter.attempted(), results.len());
        let failed: Vec<&ResourceName> = results
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(name, _)| name)
            .collect();
        assert_eq!(failed.len(), reporter.summarize().failed);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_delete_times_out() {
        let (batch, names) = batch_of(2);
        let provider = Arc::new(
            InMemoryProvider::new(names).with_delete_latency(Duration::from_millis(500)),
        );
        let pool = TaskPool::new(2, CancellationToken::new())
            .with_task_timeout(Some(Duration::from_millis(20)));

        let results = pool.run(&batch, provider, reporter()).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, outcome)| {
            outcome.error().map(|e| e.kind) == Some(ProviderErrorKind::Timeout)
        }));
    }

    #[tokio::test]
    async fn cancelled_before_dispatch_admits_nothing() {
        let (batch, names) = batch_of(3);
        let provider = Arc::new(InMemoryProvider::new(names));
        let token = CancellationToken::new();
        token.cancel();
        let pool = TaskPool::new(2, token);

        let results = pool.run(&batch, provider.clone(), reporter()).await;

        assert!(results.is_empty());
        assert_eq!(provider.delete_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_abandons_in_flight_tasks() {
        let (batch, names) = batch_of(6);
        let provider = Arc::new(
            InMemoryProvider::new(names).with_delete_latency(Duration::from_secs(30)),
        );
        let token = CancellationToken::new();
        let pool = TaskPool::new(2, token.clone());
        let reporter = reporter();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let results = pool.run(&batch, provider, reporter.clone()).await;
        canceller.await.unwrap();

        // Two tasks were in flight when the token fired; the rest never started
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, o)| *o == Outcome::Cancelled));
        let summary = reporter.summarize();
        assert_eq!(summary.cancelled, 2);
        assert!(summary.reconciles());
    }

    #[test]
    fn panic_message_extracts_strings() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(boxed.as_ref()), "owned message");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "provider call panicked");
    }
}
