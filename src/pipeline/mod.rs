//! Pipeline module - dataset model, preprocessing stages and orchestration

pub mod analyzer;
pub mod balance;
pub mod dataset;
pub mod dedup;
pub mod features;
pub mod imputer;
pub mod loader;
pub mod outlier;
pub mod resolver;
pub mod runner;
pub mod selection;

pub use analyzer::{profile, DatasetProfile};
pub use balance::{balance, balance_with_report, BalanceOptions, BalanceReport};
pub use dataset::{Attribute, AttributeKind, AttributeStats, Dataset, Record, Schema, Value};
pub use dedup::remove_duplicates;
pub use features::{create_features, create_features_with_report, FeatureSynthesis};
pub use imputer::{impute, impute_with_report};
pub use loader::{load_dataset, save_snapshot, LoadOptions, SnapshotFormat};
pub use outlier::{remove_outliers_iqr, remove_outliers_with_report};
pub use resolver::resolve;
pub use runner::{clean, run_analyze, run_pipeline, PipelineConfig, PipelineOutcome};
pub use selection::{select_features, select_features_with_report, SelectionOptions, SelectionReport};
