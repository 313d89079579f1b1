use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failed provider call.
///
/// Providers map their native error codes onto these kinds so that the
/// outcome of every deletion names *why* it failed, not only *that* it failed.
/// The engine itself never branches on the kind: every kind is recorded as a
/// failed outcome and the run carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The resource does not exist (already deleted, never existed).
    NotFound,
    /// Credentials lack permission for the call.
    PermissionDenied,
    /// The provider rejected the call because of rate limits.
    Throttled,
    /// The call did not finish within the configured time.
    Timeout,
    /// Network or connection level failure.
    Transport,
    /// The provider call panicked inside a worker.
    Panicked,
    /// Anything the provider could not classify.
    Other,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::NotFound => "not found",
            ProviderErrorKind::PermissionDenied => "permission denied",
            ProviderErrorKind::Throttled => "throttled",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Transport => "transport",
            ProviderErrorKind::Panicked => "panicked",
            ProviderErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a [`ResourceProvider`](crate::provider::ResourceProvider).
///
/// Fatal when it comes out of a listing call (no resources are known), isolated
/// to a single resource when it comes out of a deletion call.
///
/// # Examples
///
/// ```no_run
/// use engine::common::{ProviderError, ProviderErrorKind};
///
/// let error = ProviderError::not_found("log group /aws/lambda/gone does not exist");
/// assert_eq!(error.kind, ProviderErrorKind::NotFound);
/// println!("{error}"); // "not found: log group /aws/lambda/gone does not exist"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::PermissionDenied, message)
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Throttled, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message)
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Panicked, message)
    }
}

/// Invalid cleanup settings. Raised before any provider call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid batch_size: {configured} (must be at least 1)")]
    BatchSize { configured: usize },

    #[error("Invalid concurrency_limit: {configured} (must be at least 1)")]
    ConcurrencyLimit { configured: usize },

    #[error("Invalid max_deletes_per_second: {configured} (must be at least 1)")]
    DeleteRate { configured: u32 },

    #[error("Filter must contain at least one non-whitespace character")]
    EmptyFilter,
}

/// Errors that end a cleanup run before any deletion is attempted.
///
/// Per-resource deletion failures never surface here; they are recorded in the
/// [`RunSummary`](crate::cleanup::RunSummary) instead.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Listing resources failed: {0}")]
    Listing(ProviderError),
}

impl SweepError {
    /// Whether the run failed because of invalid settings.
    pub fn is_config(&self) -> bool {
        matches!(self, SweepError::Config(_))
    }
}
