use crate::error::CliError;
use engine_core::stats::RunSummary;
use engine_runtime::registry::ImportOutcome;
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Completed,
    Aborted,
}

/// What the CLI reports for one import run.
#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub summary: RunSummary,
}

impl ImportReport {
    pub fn from_outcome(outcome: &ImportOutcome) -> Self {
        match outcome {
            Ok(stats) => ImportReport {
                status: ImportStatus::Completed,
                error: None,
                summary: stats.to_summary(),
            },
            Err(aborted) => ImportReport {
                status: ImportStatus::Aborted,
                error: Some(aborted.to_string()),
                summary: aborted.summary(),
            },
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, ImportStatus::Aborted)
    }
}

fn generate_report_json(reports: &BTreeMap<String, ImportReport>) -> Result<String, CliError> {
    let json = serde_json::to_string_pretty(reports)?;
    Ok(json)
}

pub async fn write_report(
    reports: &BTreeMap<String, ImportReport>,
    path: &Path,
) -> Result<(), CliError> {
    let report_json = generate_report_json(reports)?;
    tokio::fs::write(path, report_json).await?;
    Ok(())
}

pub fn print_report(reports: &BTreeMap<String, ImportReport>) -> Result<(), CliError> {
    let report_json = generate_report_json(reports)?;
    println!("{report_json}");
    Ok(())
}
