//! Cumulative text report
//!
//! Every section is rendered to a string first and then appended to the
//! report file through a short-lived buffered handle, so the file is closed
//! after each section even when a write fails. Re-running against the same
//! path appends new sections below the old ones.

use std::fmt::{self, Write as _};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::evaluation::compare::{auc_grade, ComparedMetric, ComparisonReport, StageComparison};
use crate::evaluation::evaluator::EvaluationRecord;
use crate::evaluation::metrics::{ConfusionMatrix, Metrics};
use crate::report::summary::CleaningSummary;
use crate::training::tuner::{CandidateOutcome, TuningResult};

const RULE_WIDTH: usize = 70;

fn rule(c: char) -> String {
    c.to_string().repeat(RULE_WIDTH)
}

/// Run a section builder against a fresh string
fn render(build: impl FnOnce(&mut String) -> fmt::Result) -> String {
    let mut out = String::new();
    build(&mut out).map(|()| out).unwrap_or_default()
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}

/// Appends rendered sections to the report file
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `text` to the report, creating the file and its directory if needed.
    pub fn append_section(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PipelineError::io(&self.path, e))?;
        let mut out = BufWriter::new(file);
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| PipelineError::io(&self.path, e))
    }

    pub fn write_run_header(&self, input: &str, timestamp: &str, settings: &[(&str, String)]) -> Result<()> {
        self.append_section(&format_run_header(input, timestamp, settings))
    }

    pub fn write_cleaning(&self, summary: &CleaningSummary) -> Result<()> {
        self.append_section(&format_cleaning(summary))
    }

    pub fn write_tuning(&self, family: &str, result: &TuningResult) -> Result<()> {
        self.append_section(&format_tuning(family, result))
    }

    pub fn write_evaluation(&self, record: &EvaluationRecord) -> Result<()> {
        self.append_section(&format_evaluation(record))
    }

    pub fn write_comparison(&self, history: &[EvaluationRecord], report: &ComparisonReport) -> Result<()> {
        self.append_section(&format_comparison(history, report))
    }

    pub fn write_stage_comparison(&self, comparison: &StageComparison<'_>) -> Result<()> {
        self.append_section(&format_stage_comparison(comparison))
    }
}

/// Opening block of one pipeline run
pub fn format_run_header(input: &str, timestamp: &str, settings: &[(&str, String)]) -> String {
    render(|out| run_header_section(out, input, timestamp, settings))
}

fn run_header_section(
    out: &mut String,
    input: &str,
    timestamp: &str,
    settings: &[(&str, String)],
) -> fmt::Result {
    writeln!(out, "{}", rule('#'))?;
    writeln!(out, "CARDIOMINE EVALUATION RUN")?;
    writeln!(out, "Started: {}", timestamp)?;
    writeln!(out, "Input:   {}", input)?;
    if !settings.is_empty() {
        writeln!(out)?;
        for (key, value) in settings {
            writeln!(out, "  {:<24} {}", key, value)?;
        }
    }
    writeln!(out, "{}", rule('#'))?;
    writeln!(out)?;
    Ok(())
}

/// Instances, attributes and missing values before and after cleaning
pub fn format_cleaning(summary: &CleaningSummary) -> String {
    render(|out| cleaning_section(out, summary))
}

fn cleaning_section(out: &mut String, summary: &CleaningSummary) -> fmt::Result {
    writeln!(out, "{}", rule('='))?;
    writeln!(out, "DATA CLEANING SUMMARY")?;
    writeln!(out, "{}", rule('='))?;
    writeln!(out, "{:<20} {:>10} {:>10}", "", "Before", "After")?;
    let rows = [
        ("Instances", summary.before.instances, summary.after.instances),
        ("Attributes", summary.before.attributes, summary.after.attributes),
        ("Missing values", summary.before.missing, summary.after.missing),
    ];
    for (name, before, after) in rows {
        writeln!(out, "{:<20} {:>10} {:>10}", name, before, after)?;
    }
    writeln!(out)?;
    for imputed in &summary.imputed {
        writeln!(
            out,
            "Imputed {} value(s) of {} ({})",
            imputed.filled, imputed.name, imputed.replacement
        )?;
    }
    writeln!(out, "Duplicates removed: {}", summary.duplicates_removed)?;
    writeln!(out, "Outlier rows removed: {}", summary.outliers_removed())?;
    if !summary.features.created.is_empty() {
        writeln!(out, "Derived features: {}", summary.features.created.join(", "))?;
    }
    for skipped in &summary.features.skipped {
        writeln!(out, "Skipped feature {}: {}", skipped.name, skipped.reason)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Candidate table of one grid search
pub fn format_tuning(family: &str, result: &TuningResult) -> String {
    render(|out| tuning_section(out, family, result))
}

fn tuning_section(out: &mut String, family: &str, result: &TuningResult) -> fmt::Result {
    writeln!(out, "{}", rule('='))?;
    writeln!(
        out,
        "HYPERPARAMETER TUNING: {} ({}-fold CV, seed {})",
        family, result.folds, result.seed
    )?;
    writeln!(out, "{}", rule('='))?;
    for (index, candidate) in result.candidates.iter().enumerate() {
        let marker = if result.best == Some(index) { "*" } else { " " };
        match &candidate.outcome {
            CandidateOutcome::Scored {
                weighted_f1,
                accuracy,
            } => {
                writeln!(
                    out,
                    "{} {:<40} F1 = {:.4}  Accuracy = {:.2}%",
                    marker,
                    candidate.configuration.to_string(),
                    weighted_f1,
                    accuracy * 100.0
                )?;
            }
            CandidateOutcome::Failed { reason } => {
                writeln!(
                    out,
                    "{} {:<40} FAILED: {}",
                    marker,
                    candidate.configuration.to_string(),
                    reason
                )?;
            }
        }
    }
    writeln!(out)?;
    match result.best_score() {
        Some(score) => {
            writeln!(out, "Best configuration: {} (F1 = {:.4})", result.configuration, score)?;
        }
        None => {
            writeln!(
                out,
                "No candidate scored; using default configuration: {}",
                result.configuration
            )?;
        }
    }
    writeln!(out)?;
    Ok(())
}

/// Full metrics block of one evaluation record
pub fn format_evaluation(record: &EvaluationRecord) -> String {
    render(|out| evaluation_section(out, record))
}

fn evaluation_section(out: &mut String, record: &EvaluationRecord) -> fmt::Result {
    let metrics = &record.metrics;
    writeln!(out, "{}", rule('='))?;
    writeln!(out, "Model: {}", record.label)?;
    writeln!(out, "Learner: {}", record.learner)?;
    writeln!(
        out,
        "Data: {} ({} instances, {} attributes), {}-fold CV, seed {}",
        record.dataset.relation,
        record.dataset.instances,
        record.dataset.attributes,
        record.folds,
        record.seed
    )?;
    writeln!(out, "{}", rule('='))?;
    writeln!(out)?;

    writeln!(out, "Overall Performance:")?;
    writeln!(out, "  Accuracy:           {:.2}%", metrics.accuracy * 100.0)?;
    writeln!(out, "  Weighted Precision: {:.4}", metrics.weighted_precision)?;
    writeln!(out, "  Weighted Recall:    {:.4}", metrics.weighted_recall)?;
    writeln!(out, "  Weighted F1-Score:  {:.4}", metrics.weighted_f1)?;
    writeln!(out, "  Runtime:            {:.3} seconds", record.runtime.as_secs_f64())?;
    writeln!(out)?;

    positive_section(out, metrics)?;
    confusion_matrix_section(out, &record.confusion)?;
    class_details_section(out, metrics)?;

    writeln!(out, "Additional Metrics:")?;
    writeln!(out, "  Kappa Statistic:         {:.4}", metrics.kappa)?;
    writeln!(out, "  Mean Absolute Error:     {:.4}", metrics.mean_absolute_error)?;
    writeln!(out, "  Root Mean Squared Error: {:.4}", metrics.root_mean_squared_error)?;
    writeln!(out)?;
    Ok(())
}

fn positive_section(out: &mut String, metrics: &Metrics) -> fmt::Result {
    match &metrics.positive {
        Some(positive) => {
            writeln!(out, "Disease Class Metrics (Class {}):", positive.label)?;
            writeln!(out, "  Precision:            {:.4}", positive.precision)?;
            writeln!(out, "  Recall (Sensitivity): {:.4}", positive.recall)?;
            writeln!(out, "  F1-Score:             {:.4}", positive.f1)?;
            match positive.auc {
                Some(auc) => {
                    writeln!(out, "  AUC-ROC:              {:.4} ({})", auc, auc_grade(auc))?;
                }
                None => {
                    writeln!(out, "  AUC-ROC:              not available")?;
                }
            }
        }
        None => {
            writeln!(out, "Class-specific metrics not available")?;
        }
    }
    writeln!(out)?;
    Ok(())
}

/// Letter names used as confusion matrix column headers: a..z, then aa, ab, ...
fn class_letter(index: usize) -> String {
    let letters = b"abcdefghijklmnopqrstuvwxyz";
    if index < letters.len() {
        (letters[index] as char).to_string()
    } else {
        format!(
            "{}{}",
            class_letter(index / letters.len() - 1),
            letters[index % letters.len()] as char
        )
    }
}

/// Confusion matrix with rows as actual and columns as predicted classes
pub fn format_confusion_matrix(matrix: &ConfusionMatrix) -> String {
    render(|out| confusion_matrix_section(out, matrix))
}

fn confusion_matrix_section(out: &mut String, matrix: &ConfusionMatrix) -> fmt::Result {
    let n = matrix.num_classes();
    let width = matrix
        .counts
        .iter()
        .flatten()
        .map(|c| c.to_string().len())
        .max()
        .unwrap_or(1)
        .max(3)
        + 1;

    writeln!(out, "=== Confusion Matrix ===")?;
    writeln!(out)?;
    for class in 0..n {
        write!(out, "{:>width$}", class_letter(class), width = width)?;
    }
    writeln!(out, "   <-- classified as")?;
    for actual in 0..n {
        for predicted in 0..n {
            write!(out, "{:>width$}", matrix.get(actual, predicted), width = width)?;
        }
        writeln!(out, " | {:>3} = {}", class_letter(actual), matrix.labels[actual])?;
    }
    writeln!(out)?;
    Ok(())
}

/// Precision, recall and F1 of every class
pub fn format_class_details(metrics: &Metrics) -> String {
    render(|out| class_details_section(out, metrics))
}

fn class_details_section(out: &mut String, metrics: &Metrics) -> fmt::Result {
    writeln!(out, "=== Detailed Accuracy By Class ===")?;
    writeln!(out)?;
    writeln!(
        out,
        "  {:>9} {:>9} {:>9} {:>9} {:>9}  Class",
        "Precision", "Recall", "F1", "FP Rate", "Support"
    )?;
    for class in &metrics.per_class {
        writeln!(
            out,
            "  {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9}  {}",
            class.precision, class.recall, class.f1, class.fp_rate, class.support, class.label
        )?;
    }
    writeln!(
        out,
        "  {:>9.4} {:>9.4} {:>9.4} {:>9} {:>9}  Weighted Avg.",
        metrics.weighted_precision, metrics.weighted_recall, metrics.weighted_f1, "", metrics.instances
    )?;
    writeln!(out)?;
    Ok(())
}

/// Side-by-side table of every record plus the per-metric winners
pub fn format_comparison(history: &[EvaluationRecord], report: &ComparisonReport) -> String {
    render(|out| comparison_section(out, history, report))
}

fn comparison_section(
    out: &mut String,
    history: &[EvaluationRecord],
    report: &ComparisonReport,
) -> fmt::Result {
    writeln!(out, "{}", rule('='))?;
    writeln!(out, "MODEL COMPARISON SUMMARY")?;
    writeln!(out, "{}", rule('='))?;
    writeln!(
        out,
        "{:<28} {:>10} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "Model", "Accuracy %", "Precision", "Recall", "F1", "AUC", "Time (s)"
    )?;
    writeln!(out, "{}", rule('-'))?;
    for record in history {
        let positive = record.metrics.positive.as_ref();
        writeln!(
            out,
            "{:<28} {:>10.2} {:>9} {:>9} {:>9} {:>9} {:>9.3}",
            record.label.to_string(),
            record.metrics.accuracy * 100.0,
            opt(positive.map(|p| p.precision), 4),
            opt(positive.map(|p| p.recall), 4),
            opt(positive.map(|p| p.f1), 4),
            opt(positive.and_then(|p| p.auc), 4),
            record.runtime.as_secs_f64()
        )?;
    }
    writeln!(out)?;

    if !report.winners.is_empty() {
        writeln!(out, "Best per metric:")?;
        for winner in &report.winners {
            writeln!(
                out,
                "  {:<20} {} ({:.4})",
                winner.metric.name(),
                history[winner.index].label,
                winner.value
            )?;
        }
    }
    if let Some(overall) = report.overall {
        writeln!(
            out,
            "Overall winner: {} ({} of {} metrics)",
            history[overall].label,
            report.wins[overall],
            ComparedMetric::ALL.len()
        )?;
    }
    writeln!(out)?;
    Ok(())
}

/// One metric line of a stage comparison, with the signed change
fn stage_row(
    out: &mut String,
    name: &str,
    before: Option<f64>,
    after: Option<f64>,
    decimals: usize,
) -> fmt::Result {
    let change = match (before, after) {
        (Some(b), Some(a)) => format!("{:+.*}", decimals, a - b),
        _ => "N/A".to_string(),
    };
    writeln!(
        out,
        "{:<20} {:>12} {:>12} {:>12}",
        name,
        opt(before, decimals),
        opt(after, decimals),
        change
    )
}

/// Raw versus improved results of one model
pub fn format_stage_comparison(comparison: &StageComparison<'_>) -> String {
    render(|out| stage_comparison_section(out, comparison))
}

fn stage_comparison_section(out: &mut String, comparison: &StageComparison<'_>) -> fmt::Result {
    let before = comparison.before;
    let after = comparison.after;
    writeln!(out, "{}", rule('='))?;
    writeln!(
        out,
        "BEFORE vs AFTER DATA IMPROVEMENT: {}",
        comparison.model
    )?;
    writeln!(out, "{}", rule('='))?;
    writeln!(
        out,
        "{:<20} {:>12} {:>12} {:>12}",
        "Metric", "Raw Data", "Improved", "Change"
    )?;
    writeln!(out, "{}", rule('-'))?;

    stage_row(
        out,
        "Accuracy %",
        Some(before.metrics.accuracy * 100.0),
        Some(after.metrics.accuracy * 100.0),
        2,
    )?;
    let positive = |r: &EvaluationRecord| r.metrics.positive.as_ref().map(|p| p.precision);
    stage_row(out, "Precision", positive(before), positive(after), 4)?;
    for delta in &comparison.deltas {
        if delta.metric == ComparedMetric::Accuracy {
            continue;
        }
        stage_row(out, delta.metric.name(), delta.before, delta.after, 4)?;
    }
    stage_row(
        out,
        "Runtime sec",
        Some(before.runtime.as_secs_f64()),
        Some(after.runtime.as_secs_f64()),
        3,
    )?;

    if let Some(auc) = comparison
        .deltas
        .iter()
        .find(|d| d.metric == ComparedMetric::PositiveAuc)
        .and_then(|d| d.after)
    {
        writeln!(out)?;
        writeln!(out, "Improved AUC grade: {}", auc_grade(auc))?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_letters() {
        assert_eq!(class_letter(0), "a");
        assert_eq!(class_letter(25), "z");
        assert_eq!(class_letter(26), "aa");
        assert_eq!(class_letter(27), "ab");
    }

    #[test]
    fn test_confusion_matrix_layout() {
        let mut matrix = ConfusionMatrix::new(vec!["0".to_string(), "1".to_string()]);
        for _ in 0..150 {
            matrix.add(0, 0);
        }
        for _ in 0..14 {
            matrix.add(0, 1);
        }
        for _ in 0..30 {
            matrix.add(1, 0);
        }
        for _ in 0..109 {
            matrix.add(1, 1);
        }
        let text = format_confusion_matrix(&matrix);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=== Confusion Matrix ===");
        assert!(lines[2].ends_with("<-- classified as"));
        assert_eq!(lines[3], " 150  14 |   a = 0");
        assert_eq!(lines[4], "  30 109 |   b = 1");
    }

    #[test]
    fn test_run_header_lists_settings() {
        let text = format_run_header(
            "heart.csv",
            "2026-10-18 09:00:00",
            &[("folds", "10".to_string())],
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], rule('#'));
        assert_eq!(lines[1], "CARDIOMINE EVALUATION RUN");
        assert_eq!(lines[3], "Input:   heart.csv");
        assert_eq!(lines[5], format!("  {:<24} 10", "folds"));
        assert_eq!(lines[6], rule('#'));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn test_append_section_creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.txt");
        let writer = ReportWriter::new(&path);

        writer.append_section("first\n").unwrap();
        writer.append_section("second\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
