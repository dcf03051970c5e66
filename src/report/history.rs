//! JSON export of the evaluation history
//!
//! Written next to the text report as `<report>.history.json`, holding every
//! evaluation record of the run, the tuning tables and the comparison result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::evaluation::{ComparisonReport, EvaluationRecord};
use crate::training::TuningResult;

/// Run metadata
#[derive(Debug, Clone, Serialize)]
pub struct HistoryMetadata<'a, C: Serialize> {
    pub timestamp: String,
    pub cardiomine_version: &'static str,
    pub input_file: &'a str,
    pub config: &'a C,
}

/// Tuning table of one classifier family
#[derive(Debug, Clone, Serialize)]
pub struct TuningEntry<'a> {
    pub family: &'a str,
    #[serde(flatten)]
    pub result: &'a TuningResult,
}

/// Complete history document
#[derive(Debug, Clone, Serialize)]
pub struct HistoryExport<'a, C: Serialize> {
    pub metadata: HistoryMetadata<'a, C>,
    pub evaluations: &'a [EvaluationRecord],
    pub tuning: Vec<TuningEntry<'a>>,
    pub comparison: &'a ComparisonReport,
}

impl<'a, C: Serialize> HistoryExport<'a, C> {
    pub fn new(
        input_file: &'a str,
        config: &'a C,
        evaluations: &'a [EvaluationRecord],
        tuning: Vec<TuningEntry<'a>>,
        comparison: &'a ComparisonReport,
    ) -> Self {
        Self {
            metadata: HistoryMetadata {
                timestamp: Utc::now().to_rfc3339(),
                cardiomine_version: env!("CARGO_PKG_VERSION"),
                input_file,
                config,
            },
            evaluations,
            tuning,
            comparison,
        }
    }
}

/// `<report>.history.json`
pub fn history_path(report: &Path) -> PathBuf {
    let mut name = report.as_os_str().to_owned();
    name.push(".history.json");
    PathBuf::from(name)
}

/// Export the history document to a JSON file
pub fn export_history<C: Serialize>(export: &HistoryExport<'_, C>, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(export)
        .context("Failed to serialize evaluation history to JSON")?;

    std::fs::write(output_path, json).with_context(|| {
        format!(
            "Failed to write evaluation history to {}",
            output_path.display()
        )
    })?;

    Ok(())
}
