//! Cleanup runs: listing, batching, deletion and reporting.
//!
//! - `types`: resource names, filter, batches, outcomes and configuration
//! - `lister`: full listing plus client-side filtering
//! - `batcher`: fixed-size partitioning into progress checkpoints
//! - `reporter`: outcome recording, progress lines and the run summary
//! - `resource_guard`: RAII ownership of the run's transient artifacts
//! - `handler`: the coordinator that drives a run end to end

pub mod batcher;
pub mod handler;
pub mod lister;
pub mod reporter;
pub mod resource_guard;
pub mod types;

pub use batcher::{Batcher, partition};
pub use handler::{RunPhase, SweepPlan, Sweeper};
pub use lister::{Listing, ResourceLister, apply_filter};
pub use reporter::{
    ConsoleSink, ConsoleStream, FailedResource, MemorySink, OutcomeReporter, ProgressSink,
    RunSummary,
};
pub use resource_guard::{ArtifactGuard, RunArtifacts};
pub use types::{
    Batch, CleanupConfig, DeletionTask, FilterCriterion, Outcome, ResourceName, TaskState,
};
