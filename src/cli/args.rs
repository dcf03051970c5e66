//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::loader::SnapshotFormat;
use crate::pipeline::runner::PipelineConfig;

/// Cardiomine - Clean, balance and mine heart disease data, then tune and compare classifiers
#[derive(Parser, Debug)]
#[command(name = "cardiomine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input dataset (CSV or Parquet). The target is detected by name
    /// (num, target, heart_disease, diagnosis, disease, condition, class) or is the last column.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Report file. Sections are appended, never overwritten.
    /// The JSON history is written next to it as <report>.history.json
    #[arg(short, long, default_value = "output/evaluation_report.txt")]
    pub report: PathBuf,

    /// Directory for the cleaned and improved dataset snapshots
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// File format of the dataset snapshots
    #[arg(long, value_enum, default_value = "csv")]
    pub snapshot_format: SnapshotFormat,

    /// Folds of the standardized cross-validated evaluation
    #[arg(long, default_value = "10", value_parser = validate_folds)]
    pub folds: usize,

    /// Folds used while tuning the decision tree
    #[arg(long, default_value = "10", value_parser = validate_folds)]
    pub tree_tuning_folds: usize,

    /// Folds used while tuning the random forest
    #[arg(long, default_value = "5", value_parser = validate_folds)]
    pub forest_tuning_folds: usize,

    /// Seed for fold assignment, SMOTE and forest bootstrap sampling
    #[arg(long, default_value = "1")]
    pub seed: u64,

    /// SMOTE oversampling percentage (100 doubles the minority class)
    #[arg(long, default_value = "100", value_parser = validate_percentage)]
    pub smote_percentage: f64,

    /// Nearest neighbors considered by SMOTE
    #[arg(long, default_value = "5", value_parser = validate_positive)]
    pub smote_neighbors: usize,

    /// Non-improving expansions before the feature subset search stops
    #[arg(long, default_value = "10", value_parser = validate_positive)]
    pub selection_stale_limit: usize,

    /// Forest sizes searched during tuning (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "100,200,300", value_parser = validate_positive)]
    pub forest_trees: Vec<usize>,

    /// Maximum tree depths searched during tuning, 0 = unlimited (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "0,10,15")]
    pub forest_depths: Vec<usize>,

    /// Skip the default-configuration evaluation on raw data
    #[arg(long, default_value = "false")]
    pub skip_baseline: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the profile of a dataset without running the pipeline
    Analyze {
        /// Input dataset (CSV or Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Number of rows to use for schema inference (CSV only)
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },
}

impl Cli {
    /// Pipeline configuration, or `None` when no input was given
    pub fn pipeline_config(&self) -> Option<PipelineConfig> {
        let input = self.input.clone()?;
        Some(PipelineConfig {
            input,
            report: self.report.clone(),
            output_dir: self.output_dir.clone(),
            snapshot_format: self.snapshot_format,
            folds: self.folds,
            tree_tuning_folds: self.tree_tuning_folds,
            forest_tuning_folds: self.forest_tuning_folds,
            seed: self.seed,
            smote_percentage: self.smote_percentage,
            smote_neighbors: self.smote_neighbors,
            selection_stale_limit: self.selection_stale_limit,
            forest_trees: self.forest_trees.clone(),
            forest_depths: self.forest_depths.clone(),
            skip_baseline: self.skip_baseline,
            infer_schema_length: self.infer_schema_length,
        })
    }
}

/// Validator for fold counts
fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid integer", s))?;

    if value < 2 {
        Err(format!("fold count must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for smote_percentage
fn validate_percentage(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !value.is_finite() || value <= 0.0 {
        Err(format!(
            "smote_percentage must be a positive number, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}

/// Validator for counts that must be at least 1
fn validate_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid integer", s))?;

    if value == 0 {
        Err("value must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_config() {
        let cli = Cli::parse_from(["cardiomine", "-i", "heart.csv"]);
        let config = cli.pipeline_config().unwrap();
        let defaults = PipelineConfig::default();

        assert_eq!(config.input, PathBuf::from("heart.csv"));
        assert_eq!(config.report, defaults.report);
        assert_eq!(config.folds, defaults.folds);
        assert_eq!(config.tree_tuning_folds, defaults.tree_tuning_folds);
        assert_eq!(config.forest_tuning_folds, defaults.forest_tuning_folds);
        assert_eq!(config.forest_trees, defaults.forest_trees);
        assert_eq!(config.forest_depths, defaults.forest_depths);
        assert_eq!(config.snapshot_format, SnapshotFormat::Csv);
    }

    #[test]
    fn test_list_arguments() {
        let cli = Cli::parse_from([
            "cardiomine",
            "-i",
            "heart.csv",
            "--forest-trees",
            "10,20",
            "--forest-depths",
            "0,5",
        ]);
        assert_eq!(cli.forest_trees, vec![10, 20]);
        assert_eq!(cli.forest_depths, vec![0, 5]);
    }

    #[test]
    fn test_rejects_single_fold() {
        assert!(Cli::try_parse_from(["cardiomine", "-i", "x.csv", "--folds", "1"]).is_err());
    }

    #[test]
    fn test_no_input_no_config() {
        let cli = Cli::parse_from(["cardiomine"]);
        assert!(cli.pipeline_config().is_none());
    }

    #[test]
    fn test_validators() {
        assert!(validate_percentage("200").is_ok());
        assert!(validate_percentage("0").is_err());
        assert!(validate_percentage("abc").is_err());
        assert!(validate_positive("0").is_err());
        assert_eq!(validate_folds("5"), Ok(5));
    }
}
