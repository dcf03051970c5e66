//! Tests for CLI argument parsing and the binary entry point

use assert_cmd::Command;
use clap::Parser;
use cardiomine::cli::{Cli, Commands};
use cardiomine::pipeline::SnapshotFormat;
use predicates::prelude::*;
use std::path::PathBuf;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_cli_default_values() {
    let cli = Cli::parse_from(["cardiomine", "-i", "heart.csv"]);

    assert_eq!(cli.folds, 10, "Default evaluation folds should be 10");
    assert_eq!(cli.tree_tuning_folds, 10);
    assert_eq!(cli.forest_tuning_folds, 5);
    assert_eq!(cli.seed, 1, "Default seed should be 1");
    assert_eq!(cli.smote_percentage, 100.0);
    assert_eq!(cli.smote_neighbors, 5);
    assert_eq!(cli.selection_stale_limit, 10);
    assert_eq!(cli.forest_trees, vec![100, 200, 300]);
    assert_eq!(cli.forest_depths, vec![0, 10, 15]);
    assert!(!cli.skip_baseline);
    assert_eq!(cli.snapshot_format, SnapshotFormat::Csv);
    assert_eq!(cli.report, PathBuf::from("output/evaluation_report.txt"));
    assert_eq!(cli.output_dir, PathBuf::from("output"));
    assert_eq!(cli.infer_schema_length, 10000);
}

#[test]
fn test_cli_custom_values() {
    let cli = Cli::parse_from([
        "cardiomine",
        "--input",
        "data/heart.parquet",
        "--report",
        "out/report.txt",
        "--output-dir",
        "out",
        "--snapshot-format",
        "parquet",
        "--folds",
        "5",
        "--seed",
        "42",
        "--smote-percentage",
        "200",
        "--skip-baseline",
    ]);

    let config = cli.pipeline_config().unwrap();
    assert_eq!(config.input, PathBuf::from("data/heart.parquet"));
    assert_eq!(config.report, PathBuf::from("out/report.txt"));
    assert_eq!(config.snapshot_format, SnapshotFormat::Parquet);
    assert_eq!(config.folds, 5);
    assert_eq!(config.seed, 42);
    assert_eq!(config.smote_percentage, 200.0);
    assert!(config.skip_baseline);
    assert_eq!(
        config.snapshot_path("heart_data_cleaned"),
        PathBuf::from("out/heart_data_cleaned.parquet")
    );
}

#[test]
fn test_cli_rejects_invalid_values() {
    assert!(Cli::try_parse_from(["cardiomine", "-i", "x.csv", "--folds", "1"]).is_err());
    assert!(Cli::try_parse_from(["cardiomine", "-i", "x.csv", "--smote-percentage", "-5"]).is_err());
    assert!(Cli::try_parse_from(["cardiomine", "-i", "x.csv", "--forest-trees", "10,0"]).is_err());
    assert!(Cli::try_parse_from(["cardiomine", "-i", "x.csv", "--snapshot-format", "xlsx"]).is_err());
}

#[test]
fn test_cli_analyze_subcommand() {
    let cli = Cli::parse_from(["cardiomine", "analyze", "-i", "heart.csv"]);
    match cli.command {
        Some(Commands::Analyze {
            input,
            infer_schema_length,
        }) => {
            assert_eq!(input, PathBuf::from("heart.csv"));
            assert_eq!(infer_schema_length, 10000);
        }
        None => panic!("expected the analyze subcommand"),
    }
}

#[test]
fn test_cli_no_input_returns_none() {
    let cli = Cli::parse_from(["cardiomine"]);
    assert!(cli.pipeline_config().is_none());
}

#[test]
fn test_binary_help() {
    Command::cargo_bin("cardiomine")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--smote-percentage"))
        .stdout(predicate::str::contains("analyze"));
}

#[test]
fn test_binary_requires_input() {
    Command::cargo_bin("cardiomine")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file is required"));
}

#[test]
fn test_binary_analyze_prints_profile() {
    let (_dir, path) = create_temp_file("heart.csv", &heart_csv(30, 15, 1));

    Command::cargo_bin("cardiomine")
        .unwrap()
        .args(["analyze", "-i"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("DATASET PROFILE"))
        .stdout(predicate::str::contains("Instances:  45"))
        .stdout(predicate::str::contains("Target:     num"));
}

#[test]
fn test_binary_reports_unreadable_input() {
    let (_dir, path) = create_temp_file("heart.txt", "age,num\n1,0\n");

    Command::cargo_bin("cardiomine")
        .unwrap()
        .args(["analyze", "-i"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}
