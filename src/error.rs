//! Error types for the mining pipeline.
//!
//! Each variant maps to one failure class of the pipeline. Whether a failure is
//! fatal is decided by the caller: a missing semantic attribute only skips the
//! derived feature that needed it, a failed grid candidate is excluded from
//! selection, while an invalid schema aborts the run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by pipeline stages, model fitting and reporting.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// None of the candidate names matched an attribute of the schema.
    ///
    /// Non-fatal: derived features depending on the attribute are skipped.
    #[error("no attribute matches any of {candidates:?}")]
    MissingAttribute {
        /// Candidate names that were tried, in resolution order
        candidates: Vec<String>,
    },

    /// The dataset cannot be used for tuning or evaluation.
    ///
    /// Raised when the target is unset, not nominal, or the dataset is empty.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A learner failed to fit or cross-validate.
    #[error("model '{model}' failed: {reason}")]
    ModelFit {
        /// Learner or configuration description
        model: String,
        /// Why fitting failed
        reason: String,
    },

    /// Writing a report or dataset artifact failed.
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        /// File the operation targeted
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The evaluation history cannot satisfy the requested comparison.
    #[error("comparison skipped: {0}")]
    ComparisonPrecondition(String),

    /// Dataframe failure while reading or writing tabular files.
    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),
}

impl PipelineError {
    /// Build a `ModelFit` error from any displayable reason.
    pub fn model_fit(model: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        PipelineError::ModelFit {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the pipeline must abort on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidSchema(_) | PipelineError::Io { .. } | PipelineError::Polars(_)
        )
    }
}

/// Result alias used by the pipeline stages.
pub type Result<T> = std::result::Result<T, PipelineError>;
