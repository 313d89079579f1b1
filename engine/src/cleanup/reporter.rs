use super::types::{Batch, Outcome, ResourceName};
use crate::common::ProviderErrorKind;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Destination for operator-facing progress lines.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Which standard stream a [`ConsoleSink`] writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

/// Writes progress lines to stdout or stderr
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    stream: ConsoleStream,
}

impl ConsoleSink {
    pub fn new(stream: ConsoleStream) -> Self {
        Self { stream }
    }
}

impl ProgressSink for ConsoleSink {
    fn emit(&self, line: &str) {
        // A closed pipe must not take the run down with it
        let _ = match self.stream {
            ConsoleStream::Stdout => writeln!(std::io::stdout().lock(), "{line}"),
            ConsoleStream::Stderr => writeln!(std::io::stderr().lock(), "{line}"),
        };
    }
}

/// Keeps progress lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }
}

impl ProgressSink for MemorySink {
    fn emit(&self, line: &str) {
        lock(&self.lines).push(line.to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A resource whose deletion failed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedResource {
    pub name: ResourceName,
    pub kind: ProviderErrorKind,
    pub message: String,
}

/// Aggregate result of a cleanup run.
///
/// Counts always reconcile: `succeeded + failed + cancelled == total_attempted`,
/// and on an uncancelled run `total_attempted == total_discovered`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Resources returned by the provider before filtering
    pub total_listed: usize,
    /// Resources matching the filter
    pub total_discovered: usize,
    /// Deletion tasks dispatched
    pub total_attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub batches_processed: usize,
    pub total_batches: usize,
    /// Failed resources in the order their outcomes were recorded
    pub failed_resources: Vec<FailedResource>,
    pub cancelled_resources: Vec<ResourceName>,
}

impl RunSummary {
    /// Matching resources that were never dispatched (run cancelled)
    pub fn not_attempted(&self) -> usize {
        self.total_discovered.saturating_sub(self.total_attempted)
    }

    pub fn reconciles(&self) -> bool {
        self.succeeded + self.failed + self.cancelled == self.total_attempted
            && self.failed == self.failed_resources.len()
            && self.cancelled == self.cancelled_resources.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.succeeded == self.total_discovered && self.failed == 0 && self.cancelled == 0
    }

    pub fn failed_names(&self) -> Vec<ResourceName> {
        self.failed_resources.iter().map(|f| f.name.clone()).collect()
    }
}

/// Records deletion outcomes and emits progress lines as they happen.
///
/// `record` is called from worker tasks as they complete, so the summary sits
/// behind a mutex; it is the only state shared between tasks.
pub struct OutcomeReporter {
    summary: Mutex<RunSummary>,
    sink: Arc<dyn ProgressSink>,
}

impl OutcomeReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            summary: Mutex::new(RunSummary::default()),
            sink,
        }
    }

    pub fn discovered(&self, total_listed: usize, total_discovered: usize, total_batches: usize) {
        let mut summary = lock(&self.summary);
        summary.total_listed = total_listed;
        summary.total_discovered = total_discovered;
        summary.total_batches = total_batches;
    }

    pub fn nothing_to_do(&self, filter: &str) {
        self.sink
            .emit(&format!("No resources found matching '{filter}'. Nothing to do."));
    }

    pub fn batch_started(&self, batch: &Batch) {
        self.sink.emit(&format!(
            "Processing batch {}/{} ({} resources)...",
            batch.number(),
            batch.total(),
            batch.len()
        ));
    }

    /// Record the terminal outcome of one task.
    ///
    /// The progress line is emitted under the summary lock, so printed lines
    /// follow the recorded order.
    pub fn record(&self, name: &ResourceName, outcome: &Outcome) {
        let mut summary = lock(&self.summary);
        summary.total_attempted += 1;
        let line = match outcome {
            Outcome::Succeeded => {
                summary.succeeded += 1;
                format!("✓ Deleted: {name}")
            }
            Outcome::Failed(error) => {
                summary.failed += 1;
                summary.failed_resources.push(FailedResource {
                    name: name.clone(),
                    kind: error.kind,
                    message: error.message.clone(),
                });
                format!("✗ Failed to delete {name}: {error}")
            }
            Outcome::Cancelled => {
                summary.cancelled += 1;
                summary.cancelled_resources.push(name.clone());
                format!("⊘ Cancelled: {name}")
            }
        };

        log::debug!("{line}");
        self.sink.emit(&line);
    }

    /// Outcomes recorded so far
    pub fn attempted(&self) -> usize {
        lock(&self.summary).total_attempted
    }

    pub fn batch_completed(&self, batch: &Batch) {
        let line = {
            let mut summary = lock(&self.summary);
            summary.batches_processed += 1;
            format!(
                "Batch {} complete: {} total deleted, {} total failed",
                batch.number(),
                summary.succeeded,
                summary.failed
            )
        };
        log::info!("{line}");
        self.sink.emit(&line);
    }

    pub fn cancelled(&self) {
        let summary = lock(&self.summary);
        let line = format!(
            "Cancellation requested: {} of {} resources were not attempted",
            summary.not_attempted(),
            summary.total_discovered
        );
        drop(summary);
        log::warn!("{line}");
        self.sink.emit(&line);
    }

    /// Emit the final counts line
    pub fn finish(&self) {
        let summary = self.summarize();
        let mut line = format!(
            "Final results: {} deleted, {} failed",
            summary.succeeded, summary.failed
        );
        if summary.cancelled > 0 || summary.not_attempted() > 0 {
            line.push_str(&format!(
                ", {} cancelled, {} not attempted",
                summary.cancelled,
                summary.not_attempted()
            ));
        }
        log::info!("{line} (of {} matching)", summary.total_discovered);
        self.sink.emit(&line);

        if !summary.failed_resources.is_empty() {
            self.sink.emit("Failed resources:");
            for failed in &summary.failed_resources {
                self.sink
                    .emit(&format!("  {} ({}): {}", failed.name, failed.kind, failed.message));
            }
        }
    }

    pub fn summarize(&self) -> RunSummary {
        lock(&self.summary).clone()
    }
}
