//! Cardiomine: heart disease data mining pipeline
//!
//! Loads a tabular clinical dataset, cleans it (imputation, deduplication,
//! sequential IQR outlier removal), derives risk features, balances the classes
//! with SMOTE-style oversampling, selects attributes by correlation-based subset
//! search, tunes a decision tree and a random forest by cross-validated grid
//! search and compares every evaluation in a cumulative report.

pub mod cli;
pub mod error;
pub mod evaluation;
pub mod pipeline;
pub mod report;
pub mod training;
pub mod utils;

pub use error::{PipelineError, Result};
