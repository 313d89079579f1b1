//! # Sweeper Engine
//!
//! Bounded-concurrency bulk deletion of remotely managed resources.
//! Given a provider that can list resource names and delete one resource by
//! name, the engine deletes every resource whose name matches a filter while
//! keeping at most N deletions in flight, reporting progress batch by batch and
//! isolating each failure to the resource it belongs to.
//!
//! ## Modules
//!
//! - [`cleanup`] - Listing, batching, run coordination and outcome reporting
//! - [`provider`] - Provider capability trait and its implementations
//! - [`taskpool`] - Semaphore-bounded pool that runs deletion tasks
//! - [`common`] - Error types and the delete rate limiter

pub mod cleanup;
pub mod common;
pub mod provider;
pub mod taskpool;

pub use cleanup::{CleanupConfig, FilterCriterion, ResourceName, RunSummary, Sweeper};
pub use common::{ConfigError, ProviderError, ProviderErrorKind, SweepError};
pub use provider::ResourceProvider;
