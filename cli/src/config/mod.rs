use crate::args::{Cli, SourceKind};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use sweeper_engine::{CleanupConfig, FilterCriterion};

pub mod validation;

pub use validation::{ConfigLoadError, ConfigValidationError};

/// Prefix of environment overrides, e.g. `SWEEPER__CLEANUP__BATCH_SIZE=25`
pub const ENV_PREFIX: &str = "SWEEPER";
const CONFIG_FILE_NAME: &str = "sweeper.toml";

/// Everything the CLI can be configured with, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    filter: Option<String>,
    source: Option<SourceKind>,
    region: Option<String>,
    names_file: Option<PathBuf>,
    #[serde(default)]
    cleanup: CleanupConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl AppConfig {
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn source(&self) -> SourceKind {
        self.source.unwrap_or(SourceKind::Cloudwatch)
    }

    pub fn cleanup(&self) -> &CleanupConfig {
        &self.cleanup
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Overlay command-line flags, which win over file and environment values
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(filter) = &cli.filter {
            self.filter = Some(filter.clone());
        }
        if let Some(source) = cli.source {
            self.source = Some(source);
        }
        if let Some(region) = &cli.region {
            self.region = Some(region.clone());
        }
        if let Some(names_file) = &cli.names_file {
            self.names_file = Some(names_file.clone());
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = Some(level.clone());
        }

        let mut overrides = CleanupConfig::default();
        if let Some(batch_size) = cli.batch_size {
            overrides = overrides.with_batch_size(batch_size);
        }
        if let Some(concurrency) = cli.concurrency {
            overrides = overrides.with_concurrency_limit(concurrency);
        }
        if let Some(pause) = cli.batch_pause_ms {
            overrides = overrides.with_batch_pause_ms(pause);
        }
        if let Some(timeout) = cli.task_timeout_secs {
            overrides = overrides.with_task_timeout_secs(timeout);
        }
        if let Some(rate) = cli.max_deletes_per_second {
            overrides = overrides.with_max_deletes_per_second(rate);
        }
        self.cleanup = self.cleanup.clone().merge(&overrides);
    }

    /// Turn the loaded values into settings a run can start from
    pub fn validate(&self) -> Result<RunSettings, ConfigValidationError> {
        let filter = self
            .filter
            .clone()
            .ok_or(ConfigValidationError::MissingFilter)?;
        let filter = FilterCriterion::new(filter)?;
        self.cleanup.validate()?;

        let source = match self.source() {
            SourceKind::Cloudwatch => ResourceSource::CloudWatch {
                region: self.region.clone(),
            },
            SourceKind::File => ResourceSource::File(
                self.names_file
                    .clone()
                    .ok_or(ConfigValidationError::MissingNamesFile)?,
            ),
        };

        Ok(RunSettings {
            filter,
            source,
            cleanup: self.cleanup.clone(),
        })
    }
}

/// Where a run reads names from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    CloudWatch { region: Option<String> },
    File(PathBuf),
}

/// Validated settings for a single run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub filter: FilterCriterion,
    pub source: ResourceSource,
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    level: Option<String>,
    file: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("warn")
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }
}

/// Load configuration from file and environment.
///
/// An explicit path must exist. Without one, the user config directory and
/// then `./sweeper.toml` are read if present, the latter taking precedence.
/// Environment variables (`.env` included) override both.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigLoadError> {
    dotenv::dotenv().ok();

    let mut builder = Config::builder();
    match explicit {
        Some(path) => {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        None => {
            for path in default_config_paths() {
                log::debug!("Looking for configuration in {}", path.display());
                builder =
                    builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
            }
        }
    }

    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(ConfigLoadError::Load)?;

    config
        .try_deserialize::<AppConfig>()
        .map_err(ConfigLoadError::Deserialize)
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(mut dir) = dirs::config_dir() {
        dir.push("sweeper");
        dir.push("config.toml");
        paths.push(dir);
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}
