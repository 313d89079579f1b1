//! Remote resource providers.
//!
//! The engine only ever talks to a provider through [`ResourceProvider`]:
//! one call that lists every resource name and one call that deletes a single
//! resource by name. What the resources are (log groups, images, stack
//! artifacts) is the provider's business.

use crate::cleanup::ResourceName;
use crate::common::ProviderError;
use async_trait::async_trait;

#[cfg(feature = "cloudwatch")]
pub mod cloudwatch_logs;
pub mod memory;

#[cfg(feature = "cloudwatch")]
pub use cloudwatch_logs::CloudWatchLogsProvider;
pub use memory::InMemoryProvider;

/// Capability surface of a remote resource provider.
///
/// Implementations must be safe to share across worker tasks. `delete_one`
/// must tolerate names that no longer exist by returning an error (typically
/// [`ProviderErrorKind::NotFound`](crate::common::ProviderErrorKind::NotFound)),
/// never by panicking.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Short human-readable provider name used in logs and reports
    fn describe(&self) -> String;

    /// List every resource name the provider knows about, unfiltered
    async fn list_all(&self) -> Result<Vec<ResourceName>, ProviderError>;

    /// Delete a single resource
    async fn delete_one(&self, name: &ResourceName) -> Result<(), ProviderError>;
}
