//! Types and data structures for cleanup runs.
//!
//! This module defines the values that flow through a run: resource names,
//! the name filter, batches, per-task state and outcomes, and the cleanup
//! configuration with its defaults.

use crate::common::{ConfigError, ProviderError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 500;
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 60;

/// Opaque identifier of a remotely managed resource.
///
/// The engine assumes no structure: names are compared, displayed and handed
/// back to the provider verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ResourceName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for ResourceName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl PartialEq<str> for ResourceName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ResourceName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Case-insensitive substring predicate over resource names.
///
/// # Examples
///
/// ```no_run
/// use engine::cleanup::{FilterCriterion, ResourceName};
///
/// let filter = FilterCriterion::new("lma").unwrap();
/// assert!(filter.matches(&ResourceName::from("/aws/lambda/LMA-stack-fn")));
/// assert!(!filter.matches(&ResourceName::from("/aws/lambda/other")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriterion {
    substring: String,
    folded: String,
}

impl FilterCriterion {
    /// Build a filter from a substring. Blank substrings are rejected so that a
    /// missing filter can never turn into "delete everything".
    pub fn new(substring: impl Into<String>) -> Result<Self, ConfigError> {
        let substring = substring.into();
        if substring.trim().is_empty() {
            return Err(ConfigError::EmptyFilter);
        }

        let folded = substring.to_lowercase();
        Ok(Self { substring, folded })
    }

    pub fn matches(&self, name: &ResourceName) -> bool {
        name.as_str().to_lowercase().contains(&self.folded)
    }

    pub fn as_str(&self) -> &str {
        &self.substring
    }
}

impl std::fmt::Display for FilterCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.substring)
    }
}

/// One progress checkpoint worth of resource names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    number: usize,
    total: usize,
    names: Vec<ResourceName>,
}

impl Batch {
    pub(crate) fn new(number: usize, total: usize, names: Vec<ResourceName>) -> Self {
        Self {
            number,
            total,
            names,
        }
    }

    /// 1-based position of this batch in the run
    pub fn number(&self) -> usize {
        self.number
    }

    /// Total number of batches in the run
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn names(&self) -> &[ResourceName] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_last(&self) -> bool {
        self.number == self.total
    }
}

/// Terminal result of one deletion task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(ProviderError),
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }

    pub fn error(&self) -> Option<&ProviderError> {
        match self {
            Outcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

impl From<Result<(), ProviderError>> for Outcome {
    fn from(result: Result<(), ProviderError>) -> Self {
        match result {
            Ok(()) => Outcome::Succeeded,
            Err(error) => Outcome::Failed(error),
        }
    }
}

/// Lifecycle of a deletion task. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    InFlight,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: TaskState) -> bool {
        match (self, next) {
            (TaskState::Pending, TaskState::InFlight) => true,
            // Cancellation may reach a task before it is admitted
            (TaskState::Pending, TaskState::Cancelled) => true,
            (TaskState::InFlight, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl From<&Outcome> for TaskState {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => TaskState::Succeeded,
            Outcome::Failed(_) => TaskState::Failed,
            Outcome::Cancelled => TaskState::Cancelled,
        }
    }
}

/// A unit of work bound to exactly one resource name.
#[derive(Debug)]
pub struct DeletionTask {
    name: ResourceName,
    state: TaskState,
}

impl DeletionTask {
    pub fn new(name: ResourceName) -> Self {
        Self {
            name,
            state: TaskState::Pending,
        }
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Move to `next`, returning `false` (and leaving the state untouched) when
    /// the transition would go backwards or leave a terminal state.
    pub fn transition(&mut self, next: TaskState) -> bool {
        if !self.state.can_transition_to(next) {
            log::warn!(
                "Ignoring task transition {:?} -> {:?} for {}",
                self.state,
                next,
                self.name
            );
            return false;
        }
        self.state = next;
        true
    }

    /// Settle the task with its outcome and hand back the name for reporting.
    pub fn finish(mut self, outcome: &Outcome) -> ResourceName {
        self.transition(TaskState::from(outcome));
        self.name
    }
}

/// Configuration for cleanup runs.
///
/// Every field is optional so that partially specified configuration files and
/// environment overrides deserialize cleanly; accessors fall back to defaults.
///
/// # Examples
///
/// ```no_run
/// use engine::cleanup::CleanupConfig;
///
/// let config = CleanupConfig::default().with_batch_size(100).with_concurrency_limit(4);
/// assert_eq!(config.batch_size(), 100);
/// assert_eq!(config.concurrency_limit(), 4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupConfig {
    /// Maximum resources per progress checkpoint (default: 50)
    batch_size: Option<usize>,
    /// Maximum simultaneous deletions (default: 10)
    concurrency_limit: Option<usize>,
    /// Courtesy pause between batches in milliseconds (default: 500)
    batch_pause_ms: Option<u64>,
    /// Per-deletion timeout in seconds, 0 disables it (default: 60)
    task_timeout_secs: Option<u64>,
    /// Optional ceiling on deletes started per second
    max_deletes_per_second: Option<u32>,
}

impl CleanupConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_concurrency_limit(mut self, concurrency_limit: usize) -> Self {
        self.concurrency_limit = Some(concurrency_limit);
        self
    }

    pub fn with_batch_pause_ms(mut self, batch_pause_ms: u64) -> Self {
        self.batch_pause_ms = Some(batch_pause_ms);
        self
    }

    pub fn with_task_timeout_secs(mut self, task_timeout_secs: u64) -> Self {
        self.task_timeout_secs = Some(task_timeout_secs);
        self
    }

    pub fn with_max_deletes_per_second(mut self, max_deletes_per_second: u32) -> Self {
        self.max_deletes_per_second = Some(max_deletes_per_second);
        self
    }

    /// Overlay the values set in `other` on top of this configuration
    pub fn merge(mut self, other: &CleanupConfig) -> Self {
        self.batch_size = other.batch_size.or(self.batch_size);
        self.concurrency_limit = other.concurrency_limit.or(self.concurrency_limit);
        self.batch_pause_ms = other.batch_pause_ms.or(self.batch_pause_ms);
        self.task_timeout_secs = other.task_timeout_secs.or(self.task_timeout_secs);
        self.max_deletes_per_second = other.max_deletes_per_second.or(self.max_deletes_per_second);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit.unwrap_or(DEFAULT_CONCURRENCY_LIMIT)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms.unwrap_or(DEFAULT_BATCH_PAUSE_MS))
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        match self.task_timeout_secs.unwrap_or(DEFAULT_TASK_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn max_deletes_per_second(&self) -> Option<u32> {
        self.max_deletes_per_second
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size() == 0 {
            return Err(ConfigError::BatchSize { configured: 0 });
        }
        if self.concurrency_limit() == 0 {
            return Err(ConfigError::ConcurrencyLimit { configured: 0 });
        }
        if let Some(0) = self.max_deletes_per_second {
            return Err(ConfigError::DeleteRate { configured: 0 });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_case_insensitive() {
        let filter = FilterCriterion::new("LmA").unwrap();
        assert!(filter.matches(&"/aws/lambda/lma-prod".into()));
        assert!(filter.matches(&"SLMAX".into()));
        assert!(!filter.matches(&"/aws/lambda/l-m-a".into()));
    }

    #[test]
    fn blank_filter_is_rejected() {
        assert_eq!(FilterCriterion::new("  ").unwrap_err(), ConfigError::EmptyFilter);
        assert_eq!(FilterCriterion::new("").unwrap_err(), ConfigError::EmptyFilter);
    }

    #[test]
    fn config_defaults() {
        let config = CleanupConfig::default();
        assert_eq!(config.batch_size(), 50);
        assert_eq!(config.concurrency_limit(), 10);
        assert_eq!(config.batch_pause(), Duration::from_millis(500));
        assert_eq!(config.task_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.max_deletes_per_second(), None);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = CleanupConfig::default().with_task_timeout_secs(0);
        assert_eq!(config.task_timeout(), None);
    }

    #[test]
    fn validate_rejects_zero_limits() {
        assert_eq!(
            CleanupConfig::default().with_batch_size(0).validate(),
            Err(ConfigError::BatchSize { configured: 0 })
        );
        assert_eq!(
            CleanupConfig::default().with_concurrency_limit(0).validate(),
            Err(ConfigError::ConcurrencyLimit { configured: 0 })
        );
        assert_eq!(
            CleanupConfig::default()
                .with_max_deletes_per_second(0)
                .validate(),
            Err(ConfigError::DeleteRate { configured: 0 })
        );
    }

    #[test]
    fn merge_prefers_values_set_in_overlay() {
        let base = CleanupConfig::default()
            .with_batch_size(25)
            .with_concurrency_limit(5);
        let overlay = CleanupConfig::default().with_concurrency_limit(2);

        let merged = base.merge(&overlay);
        assert_eq!(merged.batch_size(), 25);
        assert_eq!(merged.concurrency_limit(), 2);
    }

    #[test]
    fn task_transitions_are_one_way() {
        let mut task = DeletionTask::new("a".into());
        assert!(task.transition(TaskState::InFlight));
        assert!(!task.transition(TaskState::Pending));
        assert!(task.transition(TaskState::Failed));
        assert!(!task.transition(TaskState::Succeeded));
        assert_eq!(task.state(), TaskState::Failed);
    }

    #[test]
    fn pending_task_can_only_be_cancelled_or_started() {
        assert!(TaskState::Pending.can_transition_to(TaskState::Cancelled));
        assert!(!TaskState::Pending.can_transition_to(TaskState::Succeeded));
    }
}
