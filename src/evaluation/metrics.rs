//! Classification metrics over pooled cross-validation predictions

use serde::Serialize;

use crate::evaluation::cv::CvPredictions;
use crate::training::model::argmax;

/// Class treated as "positive" for the binary metrics
pub const POSITIVE_CLASS: usize = 1;

/// Counts of (actual, predicted) pairs; rows are actual classes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(labels: Vec<String>) -> Self {
        let n = labels.len();
        Self {
            labels,
            counts: vec![vec![0; n]; n],
        }
    }

    pub fn add(&mut self, actual: usize, predicted: usize) {
        self.counts[actual][predicted] += 1;
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.num_classes()).map(|i| self.counts[i][i]).sum()
    }

    /// Records whose actual class is `class`
    pub fn row_total(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    /// Records predicted as `class`
    pub fn column_total(&self, class: usize) -> usize {
        self.counts.iter().map(|row| row[class]).sum()
    }
}

/// Precision/recall/F1 of one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub fp_rate: f64,
    /// Records of this class
    pub support: usize,
}

/// Binary metrics for [`POSITIVE_CLASS`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositiveMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// `None` when the predictions contain no positives or no negatives
    pub auc: Option<f64>,
}

/// Aggregate metrics of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub instances: usize,
    pub accuracy: f64,
    pub weighted_precision: f64,
    pub weighted_recall: f64,
    pub weighted_f1: f64,
    /// `None` when the target has fewer than two classes
    pub positive: Option<PositiveMetrics>,
    pub kappa: f64,
    pub mean_absolute_error: f64,
    pub root_mean_squared_error: f64,
    pub per_class: Vec<ClassMetrics>,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    ratio(2.0 * precision * recall, precision + recall)
}

/// Per-class metrics from a confusion matrix
pub fn class_metrics(matrix: &ConfusionMatrix) -> Vec<ClassMetrics> {
    let total = matrix.total() as f64;
    (0..matrix.num_classes())
        .map(|c| {
            let tp = matrix.get(c, c) as f64;
            let actual = matrix.row_total(c) as f64;
            let predicted = matrix.column_total(c) as f64;
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, actual);
            ClassMetrics {
                label: matrix.labels[c].clone(),
                precision,
                recall,
                f1: f1(precision, recall),
                fp_rate: ratio(predicted - tp, total - actual),
                support: matrix.row_total(c),
            }
        })
        .collect()
}

/// Cohen's kappa of the confusion matrix
pub fn kappa(matrix: &ConfusionMatrix) -> f64 {
    let total = matrix.total() as f64;
    if total == 0.0 {
        return 0.0;
    }
    let observed = matrix.correct() as f64 / total;
    let chance: f64 = (0..matrix.num_classes())
        .map(|c| matrix.row_total(c) as f64 * matrix.column_total(c) as f64)
        .sum::<f64>()
        / (total * total);
    if chance >= 1.0 {
        return if observed >= 1.0 { 1.0 } else { 0.0 };
    }
    (observed - chance) / (1.0 - chance)
}

/// Area under the ROC curve for `positive`, using the Mann-Whitney rank
/// statistic with averaged ranks for tied scores.
pub fn auc(actual: &[usize], scores: &[f64], positive: usize) -> Option<f64> {
    let positives = actual.iter().filter(|&&c| c == positive).count();
    let negatives = actual.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; ties share the mean of their ranks
        let mean_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            if actual[idx] == positive {
                rank_sum += mean_rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Mean absolute and root-mean-squared error between predicted distributions
/// and the one-hot actual class, averaged over classes.
pub fn distribution_errors(predictions: &CvPredictions) -> (f64, f64) {
    let n = predictions.len();
    let k = predictions.num_classes.max(1) as f64;
    if n == 0 {
        return (0.0, 0.0);
    }
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    for (actual, distribution) in predictions.actual.iter().zip(&predictions.distributions) {
        for (c, &p) in distribution.iter().enumerate() {
            let target = if c == *actual { 1.0 } else { 0.0 };
            let diff = (p - target).abs();
            abs_sum += diff;
            sq_sum += diff * diff;
        }
    }
    let n = n as f64;
    (abs_sum / (n * k), (sq_sum / (n * k)).sqrt())
}

/// Build the confusion matrix and every metric from pooled predictions.
pub fn compute(predictions: &CvPredictions, labels: &[String]) -> (ConfusionMatrix, Metrics) {
    let mut matrix = ConfusionMatrix::new(labels.to_vec());
    for (actual, distribution) in predictions.actual.iter().zip(&predictions.distributions) {
        matrix.add(*actual, argmax(distribution));
    }

    let per_class = class_metrics(&matrix);
    let total = matrix.total();
    let weighted = |value: fn(&ClassMetrics) -> f64| {
        ratio(
            per_class
                .iter()
                .map(|m| m.support as f64 * value(m))
                .sum::<f64>(),
            total as f64,
        )
    };

    let positive = (labels.len() > POSITIVE_CLASS).then(|| {
        let m = &per_class[POSITIVE_CLASS];
        let scores: Vec<f64> = predictions
            .distributions
            .iter()
            .map(|d| d.get(POSITIVE_CLASS).copied().unwrap_or(0.0))
            .collect();
        PositiveMetrics {
            label: m.label.clone(),
            precision: m.precision,
            recall: m.recall,
            f1: m.f1,
            auc: auc(&predictions.actual, &scores, POSITIVE_CLASS),
        }
    });

    let (mae, rmse) = distribution_errors(predictions);
    let metrics = Metrics {
        instances: total,
        accuracy: ratio(matrix.correct() as f64, total as f64),
        weighted_precision: weighted(|m| m.precision),
        weighted_recall: weighted(|m| m.recall),
        weighted_f1: weighted(|m| m.f1),
        positive,
        kappa: kappa(&matrix),
        mean_absolute_error: mae,
        root_mean_squared_error: rmse,
        per_class,
    };
    (matrix, metrics)
}
