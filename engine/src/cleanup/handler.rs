use super::batcher::Batcher;
use super::lister::ResourceLister;
use super::reporter::{ConsoleSink, ConsoleStream, OutcomeReporter, ProgressSink, RunSummary};
use super::resource_guard::ArtifactGuard;
use super::types::{CleanupConfig, FilterCriterion, ResourceName};
use crate::common::{DeleteRateLimiter, SweepError};
use crate::provider::ResourceProvider;
use crate::taskpool::TaskPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Phases of a cleanup run, logged as the run moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Listing,
    EmptyExit,
    Batching,
    Deleting { batch: usize, of: usize },
    Reporting,
    Teardown,
    Done,
}

fn enter(phase: RunPhase) {
    log::debug!("Cleanup run phase: {phase:?}");
}

type TeardownHook = Arc<dyn Fn() + Send + Sync>;

/// Coordinates a cleanup run: list, batch, delete batch by batch, report,
/// tear down.
///
/// # Examples
///
/// ```no_run
/// use engine::cleanup::{CleanupConfig, FilterCriterion, Sweeper};
/// use engine::provider::InMemoryProvider;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Arc::new(InMemoryProvider::new(["/aws/lambda/LMA-a", "/aws/lambda/b"]));
/// let sweeper = Sweeper::new(provider, CleanupConfig::default())?;
///
/// let summary = sweeper.run(&FilterCriterion::new("lma")?).await?;
/// assert_eq!(summary.succeeded, 1);
/// # Ok(())
/// # }
/// ```
pub struct Sweeper {
    provider: Arc<dyn ResourceProvider>,
    config: CleanupConfig,
    rate_limiter: Option<DeleteRateLimiter>,
    sink: Arc<dyn ProgressSink>,
    cancel_token: CancellationToken,
    teardown_hook: Option<TeardownHook>,
}

impl Sweeper {
    /// Create a sweeper, validating the configuration before anything touches
    /// the provider
    pub fn new(
        provider: Arc<dyn ResourceProvider>,
        config: CleanupConfig,
    ) -> Result<Self, SweepError> {
        config.validate()?;
        let rate_limiter = config
            .max_deletes_per_second()
            .map(DeleteRateLimiter::per_second)
            .transpose()?;

        Ok(Self {
            provider,
            config,
            rate_limiter,
            sink: Arc::new(ConsoleSink::new(ConsoleStream::Stdout)),
            cancel_token: CancellationToken::new(),
            teardown_hook: None,
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    /// Register a callback that runs every time a run's teardown completes
    pub fn on_teardown<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.teardown_hook = Some(Arc::new(hook));
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn provider_name(&self) -> String {
        self.provider.describe()
    }

    /// List and batch the resources matching `filter` without deleting
    /// anything.
    ///
    /// The returned plan owns the run's artifacts; dropping it without calling
    /// [`SweepPlan::execute`] still runs the teardown.
    pub async fn plan(&self, filter: &FilterCriterion) -> Result<SweepPlan<'_>, SweepError> {
        enter(RunPhase::Init);
        let batcher = Batcher::new(self.config.batch_size())?;
        let mut guard = ArtifactGuard::new(self.teardown_cleanup());

        enter(RunPhase::Listing);
        let listing = ResourceLister::new(self.provider.clone())
            .list(filter)
            .await
            .map_err(SweepError::Listing)?;

        let total_batches = batcher.batch_count(listing.matched.len());
        if let Some(artifacts) = guard.get_mut() {
            artifacts.listing = listing.matched;
            if !artifacts.listing.is_empty() {
                enter(RunPhase::Batching);
                artifacts.pending_batches = batcher.partition(artifacts.listing.clone()).into();
            }
        }

        Ok(SweepPlan {
            sweeper: self,
            filter: filter.clone(),
            total_listed: listing.total_listed,
            total_batches,
            guard,
        })
    }

    /// Plan and execute in one step
    pub async fn run(&self, filter: &FilterCriterion) -> Result<RunSummary, SweepError> {
        let plan = self.plan(filter).await?;
        Ok(plan.execute().await)
    }

    fn teardown_cleanup(&self) -> Option<Box<dyn FnOnce() + Send>> {
        let hook = self.teardown_hook.clone();
        Some(Box::new(move || {
            enter(RunPhase::Teardown);
            if let Some(hook) = hook {
                hook();
            }
            enter(RunPhase::Done);
        }))
    }

    fn task_pool(&self) -> TaskPool {
        TaskPool::new(self.config.concurrency_limit(), self.cancel_token.clone())
            .with_task_timeout(self.config.task_timeout())
            .with_rate_limiter(self.rate_limiter.clone())
    }
}

/// Resources selected for deletion, ready to execute.
pub struct SweepPlan<'a> {
    sweeper: &'a Sweeper,
    filter: FilterCriterion,
    total_listed: usize,
    total_batches: usize,
    guard: ArtifactGuard,
}

impl SweepPlan<'_> {
    /// Names that will be deleted, in provider order
    pub fn matched(&self) -> &[ResourceName] {
        self.guard
            .get()
            .map(|artifacts| artifacts.listing.as_slice())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.matched().is_empty()
    }

    pub fn total_listed(&self) -> usize {
        self.total_listed
    }

    pub fn total_batches(&self) -> usize {
        self.total_batches
    }

    /// Delete every planned resource, one batch at a time.
    ///
    /// Never fails: per-resource failures are recorded in the summary. The
    /// plan's artifacts are released when this returns.
    pub async fn execute(mut self) -> RunSummary {
        let sweeper = self.sweeper;
        let reporter = Arc::new(OutcomeReporter::new(sweeper.sink.clone()));
        reporter.discovered(self.total_listed, self.matched().len(), self.total_batches);

        if self.is_empty() {
            enter(RunPhase::EmptyExit);
            reporter.nothing_to_do(self.filter.as_str());
            return reporter.summarize();
        }

        let pool = sweeper.task_pool();
        let cancel_token = sweeper.cancel_token.clone();
        log::info!(
            "Deleting {} resources in {} batches (concurrency limit {})",
            self.matched().len(),
            self.total_batches,
            pool.limit()
        );

        while let Some(batch) = self
            .guard
            .get_mut()
            .and_then(|artifacts| artifacts.pending_batches.pop_front())
        {
            if cancel_token.is_cancelled() {
                break;
            }

            enter(RunPhase::Deleting {
                batch: batch.number(),
                of: batch.total(),
            });
            reporter.batch_started(&batch);
            let recorded_before = reporter.attempted();
            let results = pool
                .run(&batch, sweeper.provider.clone(), reporter.clone())
                .await;
            let recorded = reporter.attempted() - recorded_before;
            if recorded != results.len() {
                log::error!(
                    "Batch {}: {} tasks finished but {recorded} outcomes were recorded",
                    batch.number(),
                    results.len()
                );
            }
            reporter.batch_completed(&batch);

            if !batch.is_last() {
                let pause = sweeper.config.batch_pause();
                if !pause.is_zero() {
                    tokio::select! {
                        () = cancel_token.cancelled() => {}
                        () = tokio::time::sleep(pause) => {}
                    }
                }
            }
        }

        enter(RunPhase::Reporting);
        if cancel_token.is_cancelled() {
            reporter.cancelled();
        }
        reporter.finish();
        reporter.summarize()
    }
}
