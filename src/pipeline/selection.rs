//! Correlation-based feature subset selection
//!
//! Subsets are scored with the CFS merit
//!
//! ```text
//! merit(S) = k * mean(r_cf) / sqrt(k + k(k-1) * mean(r_ff))
//! ```
//!
//! where `r_cf` is feature/target correlation and `r_ff` feature/feature
//! correlation. The subset space is explored with a deterministic best-first
//! search that may both add and remove attributes, and gives up after a fixed
//! number of non-improving expansions.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use faer::Mat;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::pipeline::dataset::{AttributeKind, Dataset, Value};

/// Minimum merit gain for an expansion to count as an improvement
pub const IMPROVEMENT_THRESHOLD: f64 = 1e-5;

/// Search knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectionOptions {
    /// Consecutive non-improving expansions before the search stops
    pub stale_limit: usize,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self { stale_limit: 10 }
    }
}

/// Outcome of a selection run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionReport {
    /// Kept attributes, in schema order (target excluded)
    pub selected: Vec<String>,
    pub dropped: Vec<String>,
    pub merit: f64,
    /// Number of subsets scored during the search
    pub evaluated: usize,
    /// True when the search found nothing better than the empty set and every feature was kept
    pub kept_all: bool,
}

/// Symmetric matrix of absolute attribute correlations, indexed by schema position
pub struct CorrelationMatrix {
    values: Mat<f64>,
}

impl CorrelationMatrix {
    /// Correlate every pair of attributes (target included).
    ///
    /// Numeric columns without missing values are correlated in one pass as
    /// `Z^T * Z` over their standardized matrix. Every other pair drops
    /// missing values pairwise.
    pub fn compute(dataset: &Dataset) -> Self {
        let m = dataset.num_attributes();
        let columns: Vec<Vec<Value>> = (0..m).map(|i| dataset.column(i)).collect();
        let kinds: Vec<AttributeKind> = dataset
            .schema()
            .attributes()
            .iter()
            .map(|a| a.kind)
            .collect();
        let levels: Vec<usize> = dataset
            .schema()
            .attributes()
            .iter()
            .map(|a| a.num_values())
            .collect();

        let (gram, slots) = standardized_gram(&columns, &kinds);

        let mut values = Mat::<f64>::zeros(m, m);
        for i in 0..m {
            values[(i, i)] = 1.0;
            for j in (i + 1)..m {
                let r = match (kinds[i], kinds[j]) {
                    (AttributeKind::Numeric, AttributeKind::Numeric) => match (slots[i], slots[j]) {
                        (Some(a), Some(b)) => gram[(a, b)].abs(),
                        _ => pearson(&numeric_pairs(&columns[i], &columns[j])).abs(),
                    },
                    (AttributeKind::Nominal, AttributeKind::Numeric) => {
                        nominal_numeric(&columns[i], levels[i], &columns[j])
                    }
                    (AttributeKind::Numeric, AttributeKind::Nominal) => {
                        nominal_numeric(&columns[j], levels[j], &columns[i])
                    }
                    (AttributeKind::Nominal, AttributeKind::Nominal) => {
                        cramers_v(&columns[i], levels[i], &columns[j], levels[j])
                    }
                };
                let r = if r.is_finite() { r } else { 0.0 };
                values[(i, j)] = r;
                values[(j, i)] = r;
            }
        }
        Self { values }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }
}

/// Correlation matrix of the complete, non-constant numeric columns.
///
/// Each such column is centered and scaled to unit norm, so `Z^T * Z` holds
/// Pearson coefficients directly. `slots[i]` is column `i`'s position in the
/// result, or `None` when it has to be correlated pairwise.
fn standardized_gram(
    columns: &[Vec<Value>],
    kinds: &[AttributeKind],
) -> (Mat<f64>, Vec<Option<usize>>) {
    let mut slots = vec![None; columns.len()];
    let mut standardized: Vec<Vec<f64>> = Vec::new();

    for (i, column) in columns.iter().enumerate() {
        if kinds[i] != AttributeKind::Numeric || column.len() < 2 {
            continue;
        }
        let Some(raw) = column
            .iter()
            .map(|v| match v {
                Value::Numeric(x) => Some(*x),
                _ => None,
            })
            .collect::<Option<Vec<f64>>>()
        else {
            continue;
        };
        let mean = raw.iter().sum::<f64>() / raw.len() as f64;
        let norm = raw.iter().map(|x| (x - mean).powi(2)).sum::<f64>().sqrt();
        if norm == 0.0 {
            continue;
        }
        slots[i] = Some(standardized.len());
        standardized.push(raw.iter().map(|x| (x - mean) / norm).collect());
    }

    let n_rows = columns.first().map_or(0, Vec::len);
    let mut z = Mat::<f64>::zeros(n_rows, standardized.len());
    for (col_idx, col) in standardized.iter().enumerate() {
        for (row_idx, &val) in col.iter().enumerate() {
            z[(row_idx, col_idx)] = val;
        }
    }
    (z.transpose() * &z, slots)
}

fn numeric_pairs(a: &[Value], b: &[Value]) -> Vec<(f64, f64)> {
    a.iter()
        .zip(b)
        .filter_map(|(x, y)| match (x, y) {
            (Value::Numeric(x), Value::Numeric(y)) => Some((*x, *y)),
            _ => None,
        })
        .collect()
}

/// Pearson correlation; 0 for fewer than two pairs or a constant side.
pub fn pearson(pairs: &[(f64, f64)]) -> f64 {
    let n = pairs.len();
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    sxy / (sxx.sqrt() * syy.sqrt())
}

/// Frequency-weighted mean of |r| between each label's indicator and the numeric column.
fn nominal_numeric(nominal: &[Value], levels: usize, numeric: &[Value]) -> f64 {
    let rows: Vec<(usize, f64)> = nominal
        .iter()
        .zip(numeric)
        .filter_map(|(c, x)| match (c, x) {
            (Value::Nominal(c), Value::Numeric(x)) => Some((*c, *x)),
            _ => None,
        })
        .collect();
    if rows.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for level in 0..levels {
        let count = rows.iter().filter(|(c, _)| *c == level).count();
        if count == 0 {
            continue;
        }
        let indicator: Vec<(f64, f64)> = rows
            .iter()
            .map(|&(c, x)| (if c == level { 1.0 } else { 0.0 }, x))
            .collect();
        let p = count as f64 / rows.len() as f64;
        total += p * pearson(&indicator).abs();
    }
    total
}

/// Cramér's V over the contingency table of two nominal columns.
fn cramers_v(a: &[Value], levels_a: usize, b: &[Value], levels_b: usize) -> f64 {
    let mut table = vec![vec![0usize; levels_b]; levels_a];
    let mut n = 0usize;
    for (x, y) in a.iter().zip(b) {
        if let (Value::Nominal(x), Value::Nominal(y)) = (x, y) {
            table[*x][*y] += 1;
            n += 1;
        }
    }
    if n == 0 {
        return 0.0;
    }

    let row_totals: Vec<usize> = table.iter().map(|row| row.iter().sum()).collect();
    let col_totals: Vec<usize> = (0..levels_b)
        .map(|j| table.iter().map(|row| row[j]).sum())
        .collect();
    let rows = row_totals.iter().filter(|&&t| t > 0).count();
    let cols = col_totals.iter().filter(|&&t| t > 0).count();
    let dof = rows.min(cols);
    if dof < 2 {
        return 0.0;
    }

    let nf = n as f64;
    let mut chi2 = 0.0;
    for (i, row) in table.iter().enumerate() {
        for (j, &observed) in row.iter().enumerate() {
            let expected = row_totals[i] as f64 * col_totals[j] as f64 / nf;
            if expected > 0.0 {
                let diff = observed as f64 - expected;
                chi2 += diff * diff / expected;
            }
        }
    }
    (chi2 / (nf * (dof - 1) as f64)).sqrt()
}

/// CFS merit of `subset` (schema indices) with respect to `target`.
pub fn merit(correlations: &CorrelationMatrix, subset: &[usize], target: usize) -> f64 {
    let k = subset.len();
    if k == 0 {
        return 0.0;
    }
    let kf = k as f64;
    let r_cf = subset.iter().map(|&f| correlations.get(f, target)).sum::<f64>() / kf;

    let r_ff = if k > 1 {
        let mut sum = 0.0;
        for (a, &i) in subset.iter().enumerate() {
            for &j in &subset[a + 1..] {
                sum += correlations.get(i, j);
            }
        }
        sum / (kf * (kf - 1.0) / 2.0)
    } else {
        0.0
    };

    let denominator = (kf + kf * (kf - 1.0) * r_ff).sqrt();
    if denominator <= 0.0 {
        0.0
    } else {
        kf * r_cf / denominator
    }
}

/// Open-list entry: higher merit pops first, then the earlier-queued subset
struct Candidate {
    merit: f64,
    seq: usize,
    subset: Vec<usize>,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.merit
            .total_cmp(&other.merit)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Best-first search over subsets of `features`.
///
/// Returns the best subset (sorted schema indices), its merit and the number
/// of subsets scored.
pub fn best_first_search(
    correlations: &CorrelationMatrix,
    features: &[usize],
    target: usize,
    options: &SelectionOptions,
) -> (Vec<usize>, f64, usize) {
    let mut open = BinaryHeap::new();
    open.push(Candidate {
        merit: 0.0,
        seq: 0,
        subset: Vec::new(),
    });
    let mut queued = 1;
    let mut closed: HashSet<Vec<usize>> = HashSet::new();
    closed.insert(Vec::new());

    let mut best: (f64, Vec<usize>) = (0.0, Vec::new());
    let mut evaluated = 1;
    let mut stale = 0;

    while stale < options.stale_limit {
        let Some(Candidate {
            subset: current, ..
        }) = open.pop()
        else {
            break;
        };

        let mut improved = false;
        for &feature in features {
            let child: Vec<usize> = match current.binary_search(&feature) {
                Ok(pos) => {
                    let mut c = current.clone();
                    c.remove(pos);
                    c
                }
                Err(pos) => {
                    let mut c = current.clone();
                    c.insert(pos, feature);
                    c
                }
            };
            if !closed.insert(child.clone()) {
                continue;
            }
            let score = merit(correlations, &child, target);
            evaluated += 1;
            if score - best.0 > IMPROVEMENT_THRESHOLD {
                best = (score, child.clone());
                improved = true;
            }
            open.push(Candidate {
                merit: score,
                seq: queued,
                subset: child,
            });
            queued += 1;
        }

        if improved {
            stale = 0;
        } else {
            stale += 1;
        }
        debug!(merit = best.0, size = best.1.len(), stale, "best-first expansion");
    }

    (best.1, best.0, evaluated)
}

/// Keep the attributes chosen by the search, plus the target.
pub fn select_features(dataset: &Dataset, options: &SelectionOptions) -> Result<Dataset> {
    Ok(select_features_with_report(dataset, options)?.0)
}

/// Keep the attributes chosen by the search and report the choice.
///
/// Attributes keep their schema order. If no subset beats the empty one, all
/// attributes are kept.
pub fn select_features_with_report(
    dataset: &Dataset,
    options: &SelectionOptions,
) -> Result<(Dataset, SelectionReport)> {
    let target = dataset.schema().nominal_target()?;
    let features: Vec<usize> = (0..dataset.num_attributes())
        .filter(|&i| i != target)
        .collect();

    let correlations = CorrelationMatrix::compute(dataset);
    let (mut subset, merit, evaluated) =
        best_first_search(&correlations, &features, target, options);

    let kept_all = subset.is_empty();
    if kept_all {
        warn!("feature search found no informative subset, keeping all attributes");
        subset = features.clone();
    }

    let mut keep = subset.clone();
    keep.push(target);
    keep.sort_unstable();

    let attributes = dataset.schema().attributes();
    let name = |i: &usize| attributes[*i].name.clone();
    let report = SelectionReport {
        selected: subset.iter().map(name).collect(),
        dropped: features
            .iter()
            .filter(|f| !subset.contains(*f))
            .map(name)
            .collect(),
        merit,
        evaluated,
        kept_all,
    };

    let schema = dataset.schema().project(&keep);
    let records = dataset.records().iter().map(|r| r.project(&keep)).collect();
    Ok((Dataset::new(schema, records)?, report))
}
