use crate::config::{ConfigLoadError, ConfigValidationError};
use std::path::PathBuf;
use std::process::ExitCode;
use sweeper_engine::{RunSummary, SweepError};
use thiserror::Error;

/// How a run ended, as seen by the calling shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Everything matching was deleted, nothing matched, or the operator declined
    Success,
    /// At least one deletion failed or was cancelled
    Incomplete,
    /// Configuration rejected before any provider call
    ConfigError,
    /// The provider could not list resources
    ListingFailed,
}

impl RunStatus {
    pub fn code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Incomplete => 1,
            RunStatus::ConfigError => 2,
            RunStatus::ListingFailed => 3,
        }
    }

    pub fn from_summary(summary: &RunSummary) -> Self {
        if summary.is_complete_success() {
            RunStatus::Success
        } else {
            RunStatus::Incomplete
        }
    }
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        ExitCode::from(status.code())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    ConfigLoad(#[from] ConfigLoadError),

    #[error("{}", .0.user_message())]
    ConfigValidation(#[from] ConfigValidationError),

    #[error(transparent)]
    Sweep(#[from] SweepError),

    #[error("Failed to read names file {path}: {source}")]
    NamesFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write report {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[from] serde_json::Error),

    #[error("Failed to read confirmation: {0}")]
    Prompt(std::io::Error),
}

impl AppError {
    pub fn status(&self) -> RunStatus {
        match self {
            AppError::ConfigLoad(_) | AppError::ConfigValidation(_) | AppError::NamesFile { .. } => {
                RunStatus::ConfigError
            }
            AppError::Sweep(e) if e.is_config() => RunStatus::ConfigError,
            AppError::Sweep(_) => RunStatus::ListingFailed,
            AppError::ReportWrite { .. } | AppError::ReportSerialize(_) | AppError::Prompt(_) => {
                RunStatus::Incomplete
            }
        }
    }
}
