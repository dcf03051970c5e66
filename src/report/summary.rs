//! Console summaries rendered with comfy-table

use std::path::PathBuf;
use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use serde::Serialize;

use crate::evaluation::compare::{auc_grade, ComparisonReport, StageComparison};
use crate::evaluation::evaluator::EvaluationRecord;
use crate::pipeline::analyzer::{DatasetProfile, IMBALANCE_WARNING_RATIO};
use crate::pipeline::balance::BalanceReport;
use crate::pipeline::dataset::{AttributeStats, Dataset};
use crate::pipeline::features::FeatureSynthesis;
use crate::pipeline::imputer::ImputedAttribute;
use crate::pipeline::selection::SelectionReport;

fn print_section_title(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

fn stat(value: Option<f64>) -> Cell {
    match value {
        Some(v) => Cell::new(format!("{:.2}", v)),
        None => Cell::new("-").fg(Color::DarkGrey),
    }
}

fn metric(value: Option<f64>) -> Cell {
    match value {
        Some(v) => Cell::new(format!("{:.4}", v)),
        None => Cell::new("N/A").fg(Color::DarkGrey),
    }
}

/// Size of a dataset at one point of the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataCounts {
    pub instances: usize,
    pub attributes: usize,
    pub missing: usize,
}

impl DataCounts {
    pub fn of(dataset: &Dataset) -> Self {
        Self {
            instances: dataset.len(),
            attributes: dataset.num_attributes(),
            missing: dataset.missing_count(),
        }
    }
}

/// What the cleaning stages changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningSummary {
    pub before: DataCounts,
    pub after: DataCounts,
    pub imputed: Vec<ImputedAttribute>,
    pub duplicates_removed: usize,
    /// Rows removed per attribute pass, in schema order
    pub outlier_passes: Vec<(String, usize)>,
    pub features: FeatureSynthesis,
}

impl CleaningSummary {
    pub fn new(before: DataCounts) -> Self {
        Self {
            before,
            after: before,
            ..Default::default()
        }
    }

    pub fn outliers_removed(&self) -> usize {
        self.outlier_passes.iter().map(|(_, removed)| removed).sum()
    }

    pub fn display(&self) {
        print_section_title("🧹", "CLEANING SUMMARY");

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(header(&["Metric", "Before", "After"]));

        let rows = [
            ("Instances", self.before.instances, self.after.instances),
            ("Attributes", self.before.attributes, self.after.attributes),
            ("Missing values", self.before.missing, self.after.missing),
        ];
        for (name, before, after) in rows {
            let color = if after == before { Color::White } else { Color::Yellow };
            table.add_row(vec![
                Cell::new(name),
                Cell::new(before),
                Cell::new(after).fg(color).add_attribute(Attribute::Bold),
            ]);
        }
        table.add_row(vec![
            Cell::new("Duplicates removed"),
            Cell::new(""),
            Cell::new(self.duplicates_removed),
        ]);
        table.add_row(vec![
            Cell::new("Outlier rows removed"),
            Cell::new(""),
            Cell::new(self.outliers_removed()),
        ]);
        table.add_row(vec![
            Cell::new("Derived features"),
            Cell::new(""),
            Cell::new(self.features.created.len()).fg(Color::Green),
        ]);
        print_indented(&table);
    }
}

/// Print the analyzer's view of a dataset
pub fn display_profile(profile: &DatasetProfile) {
    print_section_title("📊", "DATASET PROFILE");
    println!("      Relation:   {}", profile.relation);
    println!("      Instances:  {}", profile.instances);
    println!(
        "      Attributes: {} ({} numeric, {} nominal)",
        profile.attributes, profile.numeric_count, profile.nominal_count
    );
    println!(
        "      Target:     {}",
        profile.target.as_deref().unwrap_or("(none)")
    );

    if !profile.classes.is_empty() {
        println!();
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(header(&["Class", "Count", "Share"]));
        for class in &profile.classes {
            table.add_row(vec![
                Cell::new(&class.label),
                Cell::new(class.count),
                Cell::new(format!("{:.1}%", class.percent)),
            ]);
        }
        print_indented(&table);
        if let Some(ratio) = profile.imbalance_ratio {
            let text = format!("      Imbalance ratio: {:.2}:1", ratio);
            if profile.is_imbalanced() {
                println!(
                    "{} {}",
                    style(text).yellow(),
                    style(format!("(above {:.1}, dataset is imbalanced)", IMBALANCE_WARNING_RATIO)).dim()
                );
            } else {
                println!("{}", text);
            }
        }
    }

    if !profile.numeric.is_empty() {
        println!();
        display_attribute_stats(&profile.numeric);
    }

    println!();
    if profile.missing.is_empty() {
        println!("      {}", style("No missing values").green());
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(header(&["Attribute", "Missing", "Share"]));
        for missing in &profile.missing {
            table.add_row(vec![
                Cell::new(&missing.attribute),
                Cell::new(missing.count).fg(Color::Red),
                Cell::new(format!("{:.1}%", missing.percent)),
            ]);
        }
        print_indented(&table);
        println!(
            "      Total missing: {} ({:.2}% of all cells)",
            profile.total_missing, profile.missing_rate
        );
    }
}

/// Min / max / mean / standard deviation table
pub fn display_attribute_stats(stats: &[(String, AttributeStats)]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Attribute", "Min", "Max", "Mean", "Std Dev"]));
    for (name, s) in stats {
        table.add_row(vec![
            Cell::new(name),
            stat(s.min),
            stat(s.max),
            stat(s.mean),
            stat(s.std_dev),
        ]);
    }
    print_indented(&table);
}

/// Class counts before and after oversampling
pub fn display_balance(report: &BalanceReport, labels: &[String]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Class", "Before", "After"]));
    for (code, label) in labels.iter().enumerate() {
        let before = report.before.get(code).copied().unwrap_or(0);
        let after = report.after.get(code).copied().unwrap_or(0);
        let mut cell = Cell::new(after);
        if Some(code) == report.minority {
            cell = cell.fg(Color::Green).add_attribute(Attribute::Bold);
        }
        table.add_row(vec![Cell::new(label), Cell::new(before), cell]);
    }
    let ratio = |r: Option<f64>| r.map_or("-".to_string(), |v| format!("{:.2}:1", v));
    table.add_row(vec![
        Cell::new("Imbalance ratio").add_attribute(Attribute::Italic),
        Cell::new(ratio(report.ratio_before())),
        Cell::new(ratio(report.ratio_after())),
    ]);
    print_indented(&table);
}

/// Kept and dropped attributes of the feature selector
pub fn display_selection(report: &SelectionReport) {
    println!(
        "      Merit: {:.4} ({} subsets evaluated)",
        report.merit, report.evaluated
    );
    println!(
        "      {} {}",
        style("Selected:").green(),
        report.selected.join(", ")
    );
    if !report.dropped.is_empty() {
        println!(
            "      {} {}",
            style("Dropped: ").red(),
            report.dropped.join(", ")
        );
    }
}

/// Every evaluation of the run side by side, winners highlighted
pub fn display_comparison(history: &[EvaluationRecord], report: &ComparisonReport) {
    print_section_title("🏆", "MODEL COMPARISON");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&[
        "Model",
        "Accuracy",
        "Weighted F1",
        "Recall (pos)",
        "F1 (pos)",
        "AUC (pos)",
        "Kappa",
        "Time",
    ]));

    for (index, record) in history.iter().enumerate() {
        let positive = record.metrics.positive.as_ref();
        let mut name = Cell::new(record.label.to_string());
        if report.overall == Some(index) {
            name = name.fg(Color::Green).add_attribute(Attribute::Bold);
        }
        table.add_row(vec![
            name,
            Cell::new(format!("{:.2}%", record.metrics.accuracy * 100.0)),
            Cell::new(format!("{:.4}", record.metrics.weighted_f1)),
            metric(positive.map(|p| p.recall)),
            metric(positive.map(|p| p.f1)),
            metric(positive.and_then(|p| p.auc)),
            Cell::new(format!("{:.4}", record.metrics.kappa)),
            Cell::new(format!("{:.2}s", record.runtime.as_secs_f64())),
        ]);
    }
    print_indented(&table);

    println!();
    for winner in &report.winners {
        println!(
            "      {:<20} {}",
            winner.metric.name(),
            style(&history[winner.index].label).cyan()
        );
    }
    if let Some(overall) = report.overall {
        println!(
            "      {} {}",
            style("Overall winner:").bold(),
            style(&history[overall].label).green().bold()
        );
    }
}

/// Raw versus improved metrics of one model
pub fn display_stage_comparison(comparison: &StageComparison<'_>) {
    print_section_title("📈", &format!("{}: RAW vs IMPROVED", comparison.model));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Metric", "Raw", "Improved", "Change"]));
    for delta in &comparison.deltas {
        let change = match delta.delta() {
            Some(d) if d > 0.0 => Cell::new(format!("{:+.4}", d)).fg(Color::Green),
            Some(d) if d < 0.0 => Cell::new(format!("{:+.4}", d)).fg(Color::Red),
            Some(d) => Cell::new(format!("{:+.4}", d)),
            None => Cell::new("N/A").fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(delta.metric.name()),
            metric(delta.before),
            metric(delta.after),
            change,
        ]);
    }
    print_indented(&table);

    if let Some(auc) = comparison.after.metrics.positive.as_ref().and_then(|p| p.auc) {
        println!("      AUC grade after improvement: {}", style(auc_grade(auc)).cyan());
    }
}

/// Wall-clock time of every pipeline step and the files written
#[derive(Debug, Default)]
pub struct RunSummary {
    pub step_times: Vec<(String, Duration)>,
    pub artifacts: Vec<PathBuf>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self, name: &str, elapsed: Duration) {
        self.step_times.push((name.to_string(), elapsed));
    }

    pub fn add_artifact(&mut self, path: PathBuf) {
        self.artifacts.push(path);
    }

    pub fn total_time(&self) -> Duration {
        self.step_times.iter().map(|(_, d)| *d).sum()
    }

    pub fn display(&self) {
        print_section_title("📋", "RUN SUMMARY");

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(header(&["Step", "Time"]));
        for (name, elapsed) in &self.step_times {
            table.add_row(vec![
                Cell::new(name),
                Cell::new(format!("{:.2}s", elapsed.as_secs_f64())),
            ]);
        }
        table.add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(format!("{:.2}s", self.total_time().as_secs_f64()))
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        print_indented(&table);

        if !self.artifacts.is_empty() {
            println!();
            println!("      {}", style("Artifacts:").bold());
            for path in &self.artifacts {
                println!("        {} {}", style("•").dim(), path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleaning_summary_sums_outlier_passes() {
        let mut summary = CleaningSummary::new(DataCounts {
            instances: 10,
            attributes: 3,
            missing: 2,
        });
        summary.outlier_passes = vec![("age".to_string(), 2), ("chol".to_string(), 1)];
        assert_eq!(summary.outliers_removed(), 3);
        assert_eq!(summary.after, summary.before);
    }

    #[test]
    fn test_run_summary_total_time() {
        let mut summary = RunSummary::new();
        summary.record_step("Load", Duration::from_millis(250));
        summary.record_step("Clean", Duration::from_millis(750));
        assert_eq!(summary.total_time(), Duration::from_secs(1));
    }
}
