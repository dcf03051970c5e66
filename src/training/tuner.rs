//! Grid search scored by cross-validated weighted F1
//!
//! The search walks `Init -> EvaluateCandidate* -> SelectBest -> FitFinal -> Done`.
//! Best-so-far state lives in a local accumulator and is returned as a
//! [`TuningResult`]; nothing is kept between calls.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::evaluation::cv::cross_validate;
use crate::evaluation::metrics::compute;
use crate::pipeline::dataset::Dataset;
use crate::training::grid::Configuration;
use crate::training::model::{Learner, Model};

/// Phases of one tuning run, logged at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningPhase {
    Init,
    EvaluateCandidate(usize),
    SelectBest,
    FitFinal,
    Done,
}

/// How a grid candidate fared
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CandidateOutcome {
    Scored { weighted_f1: f64, accuracy: f64 },
    Failed { reason: String },
}

/// A configuration and its cross-validated score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningCandidate {
    pub configuration: Configuration,
    pub outcome: CandidateOutcome,
}

impl TuningCandidate {
    /// Selection score; `None` for failed candidates
    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            CandidateOutcome::Scored { weighted_f1, .. } => Some(weighted_f1),
            CandidateOutcome::Failed { .. } => None,
        }
    }
}

/// Best candidate plus the full candidate table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningResult {
    /// Index of the winning candidate; `None` when the default configuration was used
    pub best: Option<usize>,
    pub candidates: Vec<TuningCandidate>,
    pub configuration: Configuration,
    pub folds: usize,
    pub seed: u64,
}

impl TuningResult {
    pub fn used_default(&self) -> bool {
        self.best.is_none()
    }

    pub fn best_candidate(&self) -> Option<&TuningCandidate> {
        self.best.map(|i| &self.candidates[i])
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_candidate().and_then(TuningCandidate::score)
    }

    pub fn failed(&self) -> usize {
        self.candidates.iter().filter(|c| c.score().is_none()).count()
    }
}

/// Search knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TuningOptions {
    pub folds: usize,
    pub seed: u64,
}

/// Tuning result together with the final model refit on the whole dataset
pub struct TunedModel {
    pub result: TuningResult,
    pub learner: Box<dyn Learner>,
    pub model: Box<dyn Model>,
}

fn phase(p: TuningPhase) {
    debug!(phase = ?p, "tuning");
}

/// Score one configuration. Fatal errors propagate, everything else becomes a failed candidate.
fn evaluate_candidate<F>(
    dataset: &Dataset,
    configuration: &Configuration,
    options: &TuningOptions,
    labels: &[String],
    build: &F,
) -> Result<CandidateOutcome>
where
    F: Fn(&Configuration) -> Result<Box<dyn Learner>>,
{
    let scored = build(configuration)
        .and_then(|learner| cross_validate(learner.as_ref(), dataset, options.folds, options.seed));
    match scored {
        Ok(predictions) => {
            let (_, metrics) = compute(&predictions, labels);
            Ok(CandidateOutcome::Scored {
                weighted_f1: metrics.weighted_f1,
                accuracy: metrics.accuracy,
            })
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(candidate = %configuration.name, error = %e, "grid candidate failed");
            Ok(CandidateOutcome::Failed {
                reason: e.to_string(),
            })
        }
    }
}

/// Grid search over `grid`, then refit the winner (or `default` if nothing
/// scored) on the whole dataset.
///
/// `on_candidate` is called after every candidate, in grid order.
pub fn tune<F, P>(
    dataset: &Dataset,
    grid: &[Configuration],
    default: &Configuration,
    options: &TuningOptions,
    build: F,
    mut on_candidate: P,
) -> Result<TunedModel>
where
    F: Fn(&Configuration) -> Result<Box<dyn Learner>>,
    P: FnMut(&TuningCandidate),
{
    phase(TuningPhase::Init);
    dataset.require_target()?;
    let labels = dataset
        .schema()
        .target_attribute()
        .map(|a| a.domain.clone())
        .unwrap_or_default();

    let mut candidates = Vec::with_capacity(grid.len());
    let mut best: Option<(usize, f64)> = None;
    for (index, configuration) in grid.iter().enumerate() {
        phase(TuningPhase::EvaluateCandidate(index));
        let outcome = evaluate_candidate(dataset, configuration, options, &labels, &build)?;
        let candidate = TuningCandidate {
            configuration: configuration.clone(),
            outcome,
        };
        if let Some(score) = candidate.score() {
            // Strictly greater: an equal score keeps the earlier candidate
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((index, score));
            }
        }
        on_candidate(&candidate);
        candidates.push(candidate);
    }

    phase(TuningPhase::SelectBest);
    let best = best.map(|(index, _)| index);
    let configuration = match best {
        Some(index) => candidates[index].configuration.clone(),
        None => {
            warn!(
                candidates = candidates.len(),
                default = %default.name,
                "no grid candidate scored, using the default configuration"
            );
            default.clone()
        }
    };

    phase(TuningPhase::FitFinal);
    let learner = build(&configuration)?;
    let model = learner.fit(dataset).map_err(|e| {
        if e.is_fatal() {
            e
        } else {
            PipelineError::model_fit(configuration.name.clone(), e)
        }
    })?;

    phase(TuningPhase::Done);
    Ok(TunedModel {
        result: TuningResult {
            best,
            candidates,
            configuration,
            folds: options.folds,
            seed: options.seed,
        },
        learner,
        model,
    })
}
