use sweeper_engine::ConfigError;

/// Configuration could not be loaded from file or environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error(
        "Configuration loading failed: {0}. Please check your config file and SWEEPER__* environment variables."
    )]
    Load(config::ConfigError),

    #[error("Failed to deserialize config: {0}")]
    Deserialize(config::ConfigError),
}

/// Configuration loaded but unusable
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("No filter configured. Pass --filter or set `filter` in the config file.")]
    MissingFilter,

    #[error("--source file needs a names file. Pass --names-file or set `names_file`.")]
    MissingNamesFile,

    #[error(transparent)]
    Cleanup(#[from] ConfigError),
}

impl ConfigValidationError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigValidationError::Cleanup(ConfigError::BatchSize { configured }) => format!(
                "Batch size must be at least 1 (configured: {configured}).\n\
                Update cleanup.batch_size in the config file or pass --batch-size."
            ),
            ConfigValidationError::Cleanup(ConfigError::ConcurrencyLimit { configured }) => format!(
                "Concurrency limit must be at least 1 (configured: {configured}).\n\
                Update cleanup.concurrency_limit in the config file or pass --concurrency."
            ),
            other => other.to_string(),
        }
    }
}
