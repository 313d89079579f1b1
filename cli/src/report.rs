use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use sweeper_engine::{ResourceName, RunSummary};
use uuid::Uuid;

/// Structured record of one run, written with `--report` or printed with
/// `--format json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub run_id: Uuid,
    pub provider: String,
    pub filter: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub exit_code: u8,
    /// Names that would be deleted; only set on dry runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned: Option<Vec<ResourceName>>,
    pub summary: RunSummary,
}

impl SweepReport {
    pub fn new(provider: String, filter: String, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            provider,
            filter,
            dry_run: false,
            started_at,
            finished_at: Utc::now(),
            exit_code: 0,
            planned: None,
            summary: RunSummary::default(),
        }
    }

    pub fn with_summary(mut self, summary: RunSummary, exit_code: u8) -> Self {
        self.summary = summary;
        self.exit_code = exit_code;
        self.finished_at = Utc::now();
        self
    }

    pub fn with_planned(mut self, planned: Vec<ResourceName>) -> Self {
        self.dry_run = true;
        self.planned = Some(planned);
        self
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn write_report(path: &Path, report: &SweepReport) -> Result<(), AppError> {
    let json = report.to_json()?;
    std::fs::write(path, json).map_err(|source| AppError::ReportWrite {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_report_lists_planned_names() {
        let report = SweepReport::new("memory".into(), "lma".into(), Utc::now())
            .with_planned(vec!["a".into(), "b".into()]);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["dry_run"], true);
        assert_eq!(json["planned"], serde_json::json!(["a", "b"]));
        assert_eq!(json["summary"]["succeeded"], 0);
    }

    #[test]
    fn planned_is_omitted_on_real_runs() {
        let summary = RunSummary {
            total_discovered: 1,
            total_attempted: 1,
            succeeded: 1,
            ..RunSummary::default()
        };
        let report =
            SweepReport::new("memory".into(), "lma".into(), Utc::now()).with_summary(summary, 0);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert!(json.get("planned").is_none());
        assert_eq!(json["summary"]["succeeded"], 1);
        assert!(report.finished_at >= report.started_at);
    }
}
