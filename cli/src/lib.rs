//! # Sweeper CLI
//!
//! Operator front end for the sweeper engine: loads layered configuration,
//! installs the logger, asks for confirmation and maps the run's outcome onto
//! a process exit code.
//!
//! Exit codes: `0` everything matching was deleted (or nothing matched, or the
//! operator declined), `1` some deletions failed or were cancelled, `2`
//! configuration error, `3` the provider could not list resources.

pub mod app;
pub mod args;
pub mod config;
pub mod error;
pub mod logger;
pub mod prompt;
pub mod report;

pub use error::{AppError, RunStatus};
