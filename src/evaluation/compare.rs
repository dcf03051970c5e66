//! Cross-model comparison over the evaluation history

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::evaluation::evaluator::{find_record, EvaluationRecord, Stage};

/// Metrics that take part in the winner vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparedMetric {
    Accuracy,
    PositiveRecall,
    PositiveF1,
    PositiveAuc,
}

impl ComparedMetric {
    pub const ALL: [ComparedMetric; 4] = [
        ComparedMetric::Accuracy,
        ComparedMetric::PositiveRecall,
        ComparedMetric::PositiveF1,
        ComparedMetric::PositiveAuc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ComparedMetric::Accuracy => "Accuracy",
            ComparedMetric::PositiveRecall => "Recall (positive)",
            ComparedMetric::PositiveF1 => "F1 (positive)",
            ComparedMetric::PositiveAuc => "AUC (positive)",
        }
    }

    /// Value for `record`, `None` when not available
    pub fn value(&self, record: &EvaluationRecord) -> Option<f64> {
        let positive = record.metrics.positive.as_ref();
        match self {
            ComparedMetric::Accuracy => Some(record.metrics.accuracy),
            ComparedMetric::PositiveRecall => positive.map(|p| p.recall),
            ComparedMetric::PositiveF1 => positive.map(|p| p.f1),
            ComparedMetric::PositiveAuc => positive.and_then(|p| p.auc),
        }
    }
}

impl fmt::Display for ComparedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Best record for one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricWinner {
    pub metric: ComparedMetric,
    /// Index into the compared history
    pub index: usize,
    pub value: f64,
}

/// Derived view over a history slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub winners: Vec<MetricWinner>,
    /// Per-metric wins of every record, aligned with the history
    pub wins: Vec<usize>,
    /// Record with the most wins, first one on ties
    pub overall: Option<usize>,
}

/// Find the argmax record of each metric and the overall winner.
///
/// Ties go to the record that appears first in `history`.
pub fn compare(history: &[EvaluationRecord]) -> ComparisonReport {
    let mut winners = Vec::new();
    let mut wins = vec![0usize; history.len()];

    for metric in ComparedMetric::ALL {
        let mut best: Option<(usize, f64)> = None;
        for (index, record) in history.iter().enumerate() {
            if let Some(value) = metric.value(record) {
                if best.map_or(true, |(_, b)| value > b) {
                    best = Some((index, value));
                }
            }
        }
        if let Some((index, value)) = best {
            wins[index] += 1;
            winners.push(MetricWinner {
                metric,
                index,
                value,
            });
        }
    }

    let mut overall: Option<usize> = None;
    for (index, &count) in wins.iter().enumerate() {
        if overall.map_or(true, |o| count > wins[o]) {
            overall = Some(index);
        }
    }

    ComparisonReport {
        winners,
        wins,
        overall,
    }
}

/// Change of one metric between two stages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDelta {
    pub metric: ComparedMetric,
    pub before: Option<f64>,
    pub after: Option<f64>,
}

impl MetricDelta {
    pub fn delta(&self) -> Option<f64> {
        Some(self.after? - self.before?)
    }
}

/// Same model evaluated at two stages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageComparison<'a> {
    pub model: String,
    pub before: &'a EvaluationRecord,
    pub after: &'a EvaluationRecord,
    pub deltas: Vec<MetricDelta>,
}

/// Compare the latest `before` and `after` records of `model`.
///
/// Fails with `ComparisonPrecondition` when either label is absent.
pub fn compare_stages<'a>(
    history: &'a [EvaluationRecord],
    model: &str,
    before: Stage,
    after: Stage,
) -> Result<StageComparison<'a>> {
    let lookup = |stage: Stage| {
        find_record(history, model, stage).ok_or_else(|| {
            PipelineError::ComparisonPrecondition(format!(
                "no evaluation of '{}' at stage '{}'",
                model, stage
            ))
        })
    };
    let before = lookup(before)?;
    let after = lookup(after)?;

    let deltas = ComparedMetric::ALL
        .iter()
        .map(|&metric| MetricDelta {
            metric,
            before: metric.value(before),
            after: metric.value(after),
        })
        .collect();

    Ok(StageComparison {
        model: model.to_string(),
        before,
        after,
        deltas,
    })
}

/// Stage comparisons for every model, skipping (with a warning) those whose
/// history is incomplete.
pub fn compare_all_stages<'a>(
    history: &'a [EvaluationRecord],
    models: &[&str],
) -> Vec<StageComparison<'a>> {
    models
        .iter()
        .filter_map(
            |model| match compare_stages(history, model, Stage::Raw, Stage::Improved) {
                Ok(comparison) => Some(comparison),
                Err(e) => {
                    warn!(model, error = %e, "skipping stage comparison");
                    None
                }
            },
        )
        .collect()
}

/// Qualitative grade of an AUC value
pub fn auc_grade(auc: f64) -> &'static str {
    if auc >= 0.9 {
        "Excellent"
    } else if auc >= 0.8 {
        "Good"
    } else if auc >= 0.7 {
        "Fair"
    } else {
        "Poor"
    }
}
