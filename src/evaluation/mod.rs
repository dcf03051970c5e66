//! Evaluation module - cross-validation, metrics, history and comparison

pub mod compare;
pub mod cv;
pub mod evaluator;
pub mod metrics;

pub use compare::{auc_grade, compare, compare_all_stages, compare_stages, ComparisonReport};
pub use cv::{cross_validate, stratified_folds, CvPredictions, Fold};
pub use evaluator::{find_record, DatasetRef, EvaluationRecord, Evaluator, RunLabel, Stage};
pub use metrics::{ConfusionMatrix, Metrics, PositiveMetrics};
