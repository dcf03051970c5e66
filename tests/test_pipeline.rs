//! Integration tests for the cleaning stages and the end-to-end pipeline

use cardiomine::evaluation::Stage;
use cardiomine::pipeline::runner::{CLEANED_SNAPSHOT, IMPROVED_SNAPSHOT};
use cardiomine::pipeline::{
    balance, clean, impute, remove_duplicates, remove_outliers_iqr, run_pipeline, BalanceOptions,
    PipelineConfig, SnapshotFormat,
};
use std::path::Path;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

/// Small, fast configuration writing everything under `dir`
fn quick_config(input: &Path, dir: &Path) -> PipelineConfig {
    PipelineConfig {
        input: input.to_path_buf(),
        report: dir.join("report").join("evaluation_report.txt"),
        output_dir: dir.join("output"),
        folds: 3,
        tree_tuning_folds: 3,
        forest_tuning_folds: 3,
        forest_trees: vec![5],
        forest_depths: vec![3],
        skip_baseline: true,
        ..PipelineConfig::default()
    }
}

#[test]
fn test_cleaning_then_balancing_equalizes_classes() {
    let dataset = with_missing(&heart_dataset(200, 100, 1), 1, 9);
    assert_eq!(class_counts(&dataset), vec![200, 100]);

    let imputed = impute(&dataset);
    assert_eq!(imputed.missing_count(), 0);
    let (deduped, removed) = remove_duplicates(&imputed);
    assert_eq!(removed, 0);
    let filtered = remove_outliers_iqr(&deduped);
    assert_eq!(class_counts(&filtered), vec![200, 100]);

    let balanced = balance(&filtered, &BalanceOptions::default()).unwrap();
    assert_eq!(class_counts(&balanced), vec![200, 200]);
}

#[test]
fn test_clean_summarizes_every_stage() {
    let dataset = with_missing(&heart_dataset(60, 40, 2), 1, 10);
    let mut records = dataset.records().to_vec();
    records.push(records[1].clone());
    let dataset = cardiomine::pipeline::Dataset::new(dataset.schema().clone(), records).unwrap();

    let (cleaned, summary) = clean(&dataset);

    assert_eq!(summary.before.instances, 101);
    assert_eq!(summary.before.missing, 10);
    assert_eq!(summary.imputed.len(), 1);
    assert_eq!(summary.imputed[0].filled, 10);
    assert_eq!(summary.duplicates_removed, 1);
    assert_eq!(summary.after.instances, cleaned.len());
    assert_eq!(summary.after.missing, 0);
    assert_eq!(summary.after.attributes, cleaned.num_attributes());
    assert!(!summary.features.created.is_empty());
    assert!(cleaned.schema().target_attribute().is_some());
}

#[test]
fn test_pipeline_writes_report_history_and_snapshots() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("heart.csv");
    std::fs::write(&input, heart_csv(80, 40, 3)).unwrap();
    let config = quick_config(&input, dir.path());

    let outcome = run_pipeline(&config).unwrap();

    // Balancing doubled the minority class
    assert_eq!(outcome.balance.synthesized, outcome.balance.before[1]);
    let counts = class_counts(&outcome.improved);
    assert_eq!(counts[0], counts[1]);

    // One tuned evaluation per family, no baseline
    assert_eq!(outcome.history.len(), 2);
    assert!(outcome.history.iter().all(|r| r.label.stage == Stage::Improved));
    assert_eq!(outcome.tuning.len(), 2);
    assert_eq!(outcome.tuning[0].1.candidates.len(), 2);
    assert_eq!(outcome.tuning[1].1.candidates.len(), 10);
    assert!(outcome.comparison.overall.is_some());

    assert!(config.snapshot_path(CLEANED_SNAPSHOT).exists());
    assert!(config.snapshot_path(IMPROVED_SNAPSHOT).exists());

    let report = std::fs::read_to_string(&config.report).unwrap();
    assert!(report.contains("CARDIOMINE EVALUATION RUN"));
    assert!(report.contains("DATA CLEANING SUMMARY"));
    assert!(report.contains("MODEL COMPARISON SUMMARY"));
    assert!(report.contains("=== Confusion Matrix ==="));

    let history: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outcome.history_path).unwrap()).unwrap();
    assert_eq!(history["evaluations"].as_array().unwrap().len(), 2);
    assert_eq!(history["tuning"].as_array().unwrap().len(), 2);
    assert_eq!(history["metadata"]["config"]["folds"], 3);
    assert!(history["metadata"]["timestamp"].is_string());
}

#[test]
fn test_pipeline_with_baseline_compares_stages() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("heart.csv");
    std::fs::write(&input, heart_csv(60, 30, 4)).unwrap();
    let config = PipelineConfig {
        skip_baseline: false,
        snapshot_format: SnapshotFormat::Parquet,
        ..quick_config(&input, dir.path())
    };

    let outcome = run_pipeline(&config).unwrap();

    let raw = outcome
        .history
        .iter()
        .filter(|r| r.label.stage == Stage::Raw)
        .count();
    assert_eq!(raw, 2);
    assert_eq!(outcome.history.len(), 4);
    assert!(config
        .snapshot_path(IMPROVED_SNAPSHOT)
        .to_string_lossy()
        .ends_with(".parquet"));

    let report = std::fs::read_to_string(&config.report).unwrap();
    assert!(report.contains("Raw Data"));
    assert!(report.contains("Improved"));
}

#[test]
fn test_report_appends_across_runs() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("heart.csv");
    std::fs::write(&input, heart_csv(40, 20, 5)).unwrap();
    let config = quick_config(&input, dir.path());

    run_pipeline(&config).unwrap();
    let first = std::fs::read_to_string(&config.report).unwrap();
    run_pipeline(&config).unwrap();
    let second = std::fs::read_to_string(&config.report).unwrap();

    assert!(second.starts_with(&first));
    assert_eq!(second.matches("CARDIOMINE EVALUATION RUN").count(), 2);
}

#[test]
fn test_pipeline_rejects_missing_input() {
    let dir = TempDir::new().unwrap();
    let config = quick_config(&dir.path().join("absent.csv"), dir.path());
    assert!(run_pipeline(&config).is_err());
}
