//! End-to-end pipeline: load, baseline, clean, improve, tune, evaluate, compare

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::evaluation::{
    compare, compare_all_stages, ComparisonReport, EvaluationRecord, Evaluator, RunLabel, Stage,
};
use crate::pipeline::analyzer::{profile, DatasetProfile};
use crate::pipeline::balance::{balance_with_report, BalanceOptions, BalanceReport};
use crate::pipeline::dataset::Dataset;
use crate::pipeline::dedup::remove_duplicates;
use crate::pipeline::features::{create_features_with_report, derived_feature_stats};
use crate::pipeline::imputer::impute_with_report;
use crate::pipeline::loader::{load_dataset, save_snapshot, LoadOptions, SnapshotFormat};
use crate::pipeline::outlier::remove_outliers_with_report;
use crate::pipeline::selection::{select_features_with_report, SelectionOptions, SelectionReport};
use crate::report::{
    display_attribute_stats, display_balance, display_comparison, display_profile,
    display_selection, display_stage_comparison, export_history, history_path, CleaningSummary,
    DataCounts, HistoryExport, ReportWriter, RunSummary, TuningEntry,
};
use crate::training::{ForestFamily, ModelFamily, TreeFamily, TuningCandidate, TuningResult};
use crate::utils::{
    advance_tuning, create_spinner, create_tuning_bar, finish_tuning, finish_with_success,
    finish_with_warning, print_info, print_removed, print_step_header, print_step_time,
    print_success, print_warning,
};

/// Snapshot written after cleaning and feature synthesis
pub const CLEANED_SNAPSHOT: &str = "heart_data_cleaned";
/// Snapshot written after balancing and feature selection
pub const IMPROVED_SNAPSHOT: &str = "heart_data_improved";

/// Every knob of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub report: PathBuf,
    pub output_dir: PathBuf,
    pub snapshot_format: SnapshotFormat,
    /// Folds of the standardized evaluation
    pub folds: usize,
    pub tree_tuning_folds: usize,
    pub forest_tuning_folds: usize,
    pub seed: u64,
    pub smote_percentage: f64,
    pub smote_neighbors: usize,
    pub selection_stale_limit: usize,
    pub forest_trees: Vec<usize>,
    pub forest_depths: Vec<usize>,
    /// Skip the default-configuration evaluation on raw data
    pub skip_baseline: bool,
    pub infer_schema_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/heart_disease.csv"),
            report: PathBuf::from("output/evaluation_report.txt"),
            output_dir: PathBuf::from("output"),
            snapshot_format: SnapshotFormat::Csv,
            folds: 10,
            tree_tuning_folds: 10,
            forest_tuning_folds: 5,
            seed: 1,
            smote_percentage: 100.0,
            smote_neighbors: 5,
            selection_stale_limit: 10,
            forest_trees: vec![100, 200, 300],
            forest_depths: vec![0, 10, 15],
            skip_baseline: false,
            infer_schema_length: 10000,
        }
    }
}

impl PipelineConfig {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            infer_schema_length: self.infer_schema_length,
        }
    }

    pub fn balance_options(&self) -> BalanceOptions {
        BalanceOptions {
            percentage: self.smote_percentage,
            k: self.smote_neighbors,
            seed: self.seed,
        }
    }

    pub fn selection_options(&self) -> SelectionOptions {
        SelectionOptions {
            stale_limit: self.selection_stale_limit,
        }
    }

    pub fn tree_family(&self) -> TreeFamily {
        TreeFamily {
            tuning_folds: self.tree_tuning_folds,
            selection: self.selection_options(),
        }
    }

    pub fn forest_family(&self) -> ForestFamily {
        ForestFamily {
            tuning_folds: self.forest_tuning_folds,
            trees: self.forest_trees.clone(),
            depths: self.forest_depths.clone(),
            seed: self.seed,
            selection: self.selection_options(),
        }
    }

    /// `<output_dir>/<name>.<csv|parquet>`
    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", name, self.snapshot_format.extension()))
    }

    /// Key/value lines for the report header
    pub fn settings(&self) -> Vec<(&'static str, String)> {
        let list = |values: &[usize]| {
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        vec![
            ("Evaluation folds", self.folds.to_string()),
            ("Tree tuning folds", self.tree_tuning_folds.to_string()),
            ("Forest tuning folds", self.forest_tuning_folds.to_string()),
            ("Seed", self.seed.to_string()),
            ("SMOTE percentage", format!("{}", self.smote_percentage)),
            ("SMOTE neighbors", self.smote_neighbors.to_string()),
            ("Selection stale limit", self.selection_stale_limit.to_string()),
            ("Forest trees", list(&self.forest_trees)),
            ("Forest depths", list(&self.forest_depths)),
        ]
    }
}

/// Everything a pipeline run produced
#[derive(Debug)]
pub struct PipelineOutcome {
    pub cleaned: Dataset,
    pub improved: Dataset,
    pub cleaning: CleaningSummary,
    pub balance: BalanceReport,
    pub selection: SelectionReport,
    pub tuning: Vec<(&'static str, TuningResult)>,
    pub history: Vec<EvaluationRecord>,
    pub comparison: ComparisonReport,
    pub history_path: PathBuf,
}

/// Impute, deduplicate, filter outliers and synthesize derived features.
pub fn clean(dataset: &Dataset) -> (Dataset, CleaningSummary) {
    let mut summary = CleaningSummary::new(DataCounts::of(dataset));

    let (imputed, filled) = impute_with_report(dataset);
    summary.imputed = filled;

    let (deduped, removed) = remove_duplicates(&imputed);
    summary.duplicates_removed = removed;

    let (filtered, passes) = remove_outliers_with_report(&deduped);
    summary.outlier_passes = passes
        .into_iter()
        .map(|p| (p.attribute, p.removed))
        .collect();

    let (featured, synthesis) = create_features_with_report(&filtered);
    summary.features = synthesis;
    summary.after = DataCounts::of(&featured);

    (featured, summary)
}

/// Load a dataset and print its profile.
pub fn run_analyze(input: &Path, options: &LoadOptions) -> Result<DatasetProfile> {
    let spinner = create_spinner("Loading dataset...");
    let dataset = load_dataset(input, options)?;
    finish_with_success(&spinner, &format!("Loaded {}", input.display()));
    let dataset_profile = profile(&dataset);
    display_profile(&dataset_profile);
    Ok(dataset_profile)
}

fn families(config: &PipelineConfig) -> Vec<Box<dyn ModelFamily>> {
    let forest: Box<dyn ModelFamily> = Box::new(config.forest_family());
    let tree: Box<dyn ModelFamily> = Box::new(config.tree_family());
    vec![forest, tree]
}

/// Evaluate every family with its default configuration on unprocessed data.
fn run_baseline(
    raw: &Dataset,
    families: &[Box<dyn ModelFamily>],
    evaluator: &mut Evaluator,
    writer: &ReportWriter,
) -> Result<()> {
    for family in families {
        let data = family.preprocess(raw, false)?;
        let learner = family.build(&family.default_configuration())?;
        let spinner = create_spinner(&format!("Evaluating {} on raw data...", family.name()));
        match evaluator.evaluate(RunLabel::new(family.name(), Stage::Raw), learner.as_ref(), &data) {
            Ok(record) => {
                finish_with_success(
                    &spinner,
                    &format!(
                        "{}: accuracy {:.2}%, weighted F1 {:.4}",
                        family.name(),
                        record.metrics.accuracy * 100.0,
                        record.metrics.weighted_f1
                    ),
                );
                writer.write_evaluation(record)?;
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(family = family.name(), error = %e, "baseline evaluation failed");
                finish_with_warning(&spinner, &format!("{}: baseline failed ({})", family.name(), e));
            }
        }
    }
    Ok(())
}

/// Run the whole pipeline against `config.input`, appending to `config.report`.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutcome> {
    let mut run = RunSummary::new();
    let writer = ReportWriter::new(&config.report);
    writer.write_run_header(
        &config.input.display().to_string(),
        &Utc::now().to_rfc3339(),
        &config.settings(),
    )?;

    let families = families(config);
    let mut evaluator = Evaluator::new(config.folds, config.seed);

    // Step 1: Load
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let spinner = create_spinner("Loading dataset...");
    let raw = load_dataset(&config.input, &config.load_options())?;
    raw.require_target()
        .with_context(|| format!("Dataset {} has no usable target", config.input.display()))?;
    finish_with_success(
        &spinner,
        &format!(
            "Loaded {} instances, {} attributes",
            raw.len(),
            raw.num_attributes()
        ),
    );
    if let Some(target) = raw.schema().target_attribute() {
        print_info(&format!(
            "Target attribute: {} ({} classes)",
            target.name,
            target.num_values()
        ));
    }
    info!(instances = raw.len(), attributes = raw.num_attributes(), "dataset loaded");
    run.record_step("Load", step_start.elapsed());
    print_step_time(step_start.elapsed());

    // Step 2: Baseline on raw data
    print_step_header(2, "Baseline Evaluation (raw data)");
    let step_start = Instant::now();
    if config.skip_baseline {
        print_info("Baseline evaluation skipped");
    } else {
        run_baseline(&raw, &families, &mut evaluator, &writer)?;
    }
    run.record_step("Baseline", step_start.elapsed());
    print_step_time(step_start.elapsed());

    // Step 3: Clean + features
    print_step_header(3, "Data Cleaning & Feature Engineering");
    let step_start = Instant::now();
    let (cleaned, cleaning) = clean(&raw);
    for imputed in &cleaning.imputed {
        print_info(&format!(
            "Imputed {} value(s) of {} ({})",
            imputed.filled, imputed.name, imputed.replacement
        ));
    }
    print_removed("duplicate record(s)", cleaning.duplicates_removed, None);
    print_removed("outlier row(s)", cleaning.outliers_removed(), Some("(1.5 x IQR)"));
    for skipped in &cleaning.features.skipped {
        print_warning(&format!("Skipped {}: {}", skipped.name, skipped.reason));
    }
    if !cleaning.features.created.is_empty() {
        print_success(&format!(
            "Created features: {}",
            cleaning.features.created.join(", ")
        ));
        println!();
        display_attribute_stats(&derived_feature_stats(&cleaned));
    }
    cleaning.display();
    display_profile(&profile(&cleaned));
    writer.write_cleaning(&cleaning)?;

    let cleaned_path = config.snapshot_path(CLEANED_SNAPSHOT);
    save_snapshot(&cleaned, &cleaned_path)?;
    print_success(&format!("Saved cleaned data to {}", cleaned_path.display()));
    run.add_artifact(cleaned_path);
    run.record_step("Cleaning", step_start.elapsed());
    print_step_time(step_start.elapsed());

    // Step 4: Balance + select
    print_step_header(4, "Class Balancing & Feature Selection");
    let step_start = Instant::now();
    let spinner = create_spinner("Applying SMOTE...");
    let (balanced, balance) = balance_with_report(&cleaned, &config.balance_options())?;
    finish_with_success(
        &spinner,
        &format!("Synthesized {} minority record(s)", balance.synthesized),
    );
    let labels = balanced
        .schema()
        .target_attribute()
        .map(|a| a.domain.clone())
        .unwrap_or_default();
    display_balance(&balance, &labels);

    let spinner = create_spinner("Searching attribute subsets...");
    let (improved, selection) = select_features_with_report(&balanced, &config.selection_options())?;
    if selection.kept_all {
        finish_with_warning(&spinner, "No subset beat the empty set, keeping every attribute");
    } else {
        finish_with_success(
            &spinner,
            &format!(
                "Selected {} of {} attributes",
                selection.selected.len(),
                selection.selected.len() + selection.dropped.len()
            ),
        );
    }
    display_selection(&selection);

    let improved_path = config.snapshot_path(IMPROVED_SNAPSHOT);
    save_snapshot(&improved, &improved_path)?;
    print_success(&format!("Saved improved data to {}", improved_path.display()));
    run.add_artifact(improved_path);
    run.record_step("Improvement", step_start.elapsed());
    print_step_time(step_start.elapsed());

    // Step 5: Tune + evaluate
    print_step_header(5, "Hyperparameter Tuning & Evaluation");
    let step_start = Instant::now();
    let mut tuning = Vec::with_capacity(families.len());
    for family in &families {
        let data = family.preprocess(&improved, false)?;
        let grid_len = family.grid(&data).len() as u64;
        let pb = create_tuning_bar(family.name(), grid_len);
        let trained = family.train(&data, config.seed, &mut |candidate: &TuningCandidate| {
            advance_tuning(&pb, candidate)
        })?;
        let result = trained.tuning();
        finish_tuning(&pb, family.name(), result);
        writer.write_tuning(family.name(), result)?;
        for line in trained.results().lines().take(3) {
            print_info(line);
        }

        let spinner = create_spinner(&format!("Evaluating tuned {}...", family.name()));
        let record = evaluator.evaluate(
            RunLabel::new(family.name(), Stage::Improved),
            trained.learner(),
            &data,
        )?;
        finish_with_success(
            &spinner,
            &format!(
                "{}: accuracy {:.2}%, weighted F1 {:.4}",
                family.name(),
                record.metrics.accuracy * 100.0,
                record.metrics.weighted_f1
            ),
        );
        writer.write_evaluation(record)?;
        tuning.push((family.name(), result.clone()));
    }
    run.record_step("Tuning", step_start.elapsed());
    print_step_time(step_start.elapsed());

    // Step 6: Compare
    print_step_header(6, "Model Comparison");
    let step_start = Instant::now();
    let history = evaluator.history();
    let comparison = compare(history);
    display_comparison(history, &comparison);
    writer.write_comparison(history, &comparison)?;

    if !config.skip_baseline {
        let names: Vec<&str> = families.iter().map(|f| f.name()).collect();
        for stages in compare_all_stages(history, &names) {
            display_stage_comparison(&stages);
            writer.write_stage_comparison(&stages)?;
        }
    }

    let history_file = history_path(&config.report);
    let entries = tuning
        .iter()
        .map(|(family, result)| TuningEntry { family, result })
        .collect();
    let input = config.input.display().to_string();
    let export = HistoryExport::new(&input, config, history, entries, &comparison);
    export_history(&export, &history_file)?;
    run.add_artifact(config.report.clone());
    run.add_artifact(history_file.clone());
    run.record_step("Comparison", step_start.elapsed());
    print_step_time(step_start.elapsed());

    run.display();

    Ok(PipelineOutcome {
        cleaned,
        improved,
        cleaning,
        balance,
        selection,
        tuning,
        history: history.to_vec(),
        comparison,
        history_path: history_file,
    })
}
