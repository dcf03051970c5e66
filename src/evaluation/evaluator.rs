//! Standardized evaluation and the append-only run history

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::Result;
use crate::evaluation::cv::cross_validate;
use crate::evaluation::metrics::{compute, ConfusionMatrix, Metrics};
use crate::pipeline::dataset::Dataset;
use crate::training::model::Learner;

/// Preprocessing stage the evaluated data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Loaded data, no cleaning
    Raw,
    /// Cleaned, balanced and feature-selected data
    Improved,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Raw => write!(f, "raw"),
            Stage::Improved => write!(f, "improved"),
        }
    }
}

/// Identifies an evaluation in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunLabel {
    pub model: String,
    pub stage: Stage,
}

impl RunLabel {
    pub fn new(model: impl Into<String>, stage: Stage) -> Self {
        Self {
            model: model.into(),
            stage,
        }
    }
}

impl fmt::Display for RunLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.model, self.stage)
    }
}

/// The evaluated dataset, by description only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRef {
    pub relation: String,
    pub instances: usize,
    pub attributes: usize,
}

impl DatasetRef {
    pub fn of(dataset: &Dataset) -> Self {
        Self {
            relation: dataset.relation().to_string(),
            instances: dataset.len(),
            attributes: dataset.num_attributes(),
        }
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Result of one evaluation; never modified after creation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub label: RunLabel,
    /// Learner description including hyperparameters
    pub learner: String,
    pub confusion: ConfusionMatrix,
    pub metrics: Metrics,
    /// Wall-clock time of the fit plus cross-validation
    #[serde(rename = "runtime_secs", serialize_with = "serialize_secs")]
    pub runtime: Duration,
    pub dataset: DatasetRef,
    pub folds: usize,
    pub seed: u64,
}

/// Runs evaluations with a fixed protocol and keeps their records in order
#[derive(Debug, Clone)]
pub struct Evaluator {
    folds: usize,
    seed: u64,
    history: Vec<EvaluationRecord>,
}

impl Evaluator {
    pub fn new(folds: usize, seed: u64) -> Self {
        Self {
            folds,
            seed,
            history: Vec::new(),
        }
    }

    /// Fit `learner` on the full dataset and cross-validate it, appending the
    /// record to the history.
    pub fn evaluate(
        &mut self,
        label: RunLabel,
        learner: &dyn Learner,
        dataset: &Dataset,
    ) -> Result<&EvaluationRecord> {
        dataset.require_target()?;
        let labels = dataset
            .schema()
            .target_attribute()
            .map(|a| a.domain.clone())
            .unwrap_or_default();

        let start = Instant::now();
        learner.fit(dataset)?;
        let predictions = cross_validate(learner, dataset, self.folds, self.seed)?;
        let runtime = start.elapsed();

        let (confusion, metrics) = compute(&predictions, &labels);
        debug!(%label, accuracy = metrics.accuracy, weighted_f1 = metrics.weighted_f1, "evaluated");

        self.history.push(EvaluationRecord {
            label,
            learner: learner.describe(),
            confusion,
            metrics,
            runtime,
            dataset: DatasetRef::of(dataset),
            folds: predictions.folds,
            seed: self.seed,
        });
        let index = self.history.len() - 1;
        Ok(&self.history[index])
    }

    /// Every record, in evaluation order
    pub fn history(&self) -> &[EvaluationRecord] {
        &self.history
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Most recent record carrying `model` and `stage`
pub fn find_record<'a>(
    history: &'a [EvaluationRecord],
    model: &str,
    stage: Stage,
) -> Option<&'a EvaluationRecord> {
    history
        .iter()
        .rev()
        .find(|r| r.label.model == model && r.label.stage == stage)
}
