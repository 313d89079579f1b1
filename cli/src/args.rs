use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// Where resource names come from and where deletions go
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// CloudWatch Logs log groups in the configured AWS account and region
    Cloudwatch,
    /// Names read from a file, deletions simulated in memory (rehearsal)
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Progress lines and final counts on stdout
    Text,
    /// Progress lines on stderr, JSON report on stdout
    Json,
}

/// Delete every resource whose name contains a substring, with bounded
/// concurrency and per-resource failure reporting.
#[derive(Debug, Clone, Parser)]
#[command(name = "sweeper", version, about)]
pub struct Cli {
    /// Case-insensitive substring resource names must contain
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Resource source
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// File with one resource name per line (for --source file)
    #[arg(long)]
    pub names_file: Option<PathBuf>,

    /// AWS region (for --source cloudwatch)
    #[arg(long)]
    pub region: Option<String>,

    /// Maximum resources per progress checkpoint [default: 50]
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Maximum simultaneous deletions [default: 10]
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Pause between batches in milliseconds [default: 500]
    #[arg(long)]
    pub batch_pause_ms: Option<u64>,

    /// Per-deletion timeout in seconds, 0 disables it [default: 60]
    #[arg(long)]
    pub task_timeout_secs: Option<u64>,

    /// Ceiling on deletes started per second
    #[arg(long)]
    pub max_deletes_per_second: Option<u32>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// List matching resources and exit without deleting
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Configuration file [default: ./sweeper.toml, then the user config dir]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,
}
