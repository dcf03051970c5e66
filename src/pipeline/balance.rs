//! Synthetic minority oversampling (SMOTE)
//!
//! Every minority-class record gets `round(percentage / 100)` synthetic
//! siblings, interpolated towards one of its `k` nearest minority neighbors.
//! All random choices come from a ChaCha stream seeded with
//! [`BalanceOptions::seed`], so the same input and options always produce
//! the same synthetic rows.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::Result;
use crate::pipeline::dataset::{Dataset, Record, Value};

/// Oversampling knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceOptions {
    /// Amount of oversampling; 100 doubles the minority class
    pub percentage: f64,
    /// Nearest neighbors considered per minority record
    pub k: usize,
    pub seed: u64,
}

impl Default for BalanceOptions {
    fn default() -> Self {
        Self {
            percentage: 100.0,
            k: 5,
            seed: 1,
        }
    }
}

/// Class distribution before and after balancing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceReport {
    /// Minority class code, `None` when the dataset was left untouched
    pub minority: Option<usize>,
    pub before: Vec<usize>,
    pub after: Vec<usize>,
    pub synthesized: usize,
}

impl BalanceReport {
    pub fn ratio_before(&self) -> Option<f64> {
        imbalance_ratio(&self.before)
    }

    pub fn ratio_after(&self) -> Option<f64> {
        imbalance_ratio(&self.after)
    }
}

/// Largest class count over the smallest non-empty one.
pub fn imbalance_ratio(counts: &[usize]) -> Option<f64> {
    let max = counts.iter().copied().max()?;
    let min = counts.iter().copied().filter(|&c| c > 0).min()?;
    Some(max as f64 / min as f64)
}

/// Shannon entropy (bits) of a class distribution.
pub fn class_entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Oversample the minority class.
pub fn balance(dataset: &Dataset, options: &BalanceOptions) -> Result<Dataset> {
    Ok(balance_with_report(dataset, options)?.0)
}

/// Oversample the minority class and report the class counts on both sides.
///
/// The dataset is returned unchanged when fewer than two classes are present
/// or when the smallest class is as large as the largest.
pub fn balance_with_report(
    dataset: &Dataset,
    options: &BalanceOptions,
) -> Result<(Dataset, BalanceReport)> {
    let target = dataset.schema().nominal_target()?;
    let before = dataset.class_counts()?;

    let unchanged = |before: Vec<usize>| BalanceReport {
        minority: None,
        after: before.clone(),
        before,
        synthesized: 0,
    };

    let present = before.iter().filter(|&&c| c > 0).count();
    let majority = before.iter().copied().max().unwrap_or(0);
    // Smallest non-empty class; ties go to the lowest class code
    let minority = before
        .iter()
        .enumerate()
        .filter(|(_, &c)| c > 0)
        .min_by_key(|(_, &c)| c)
        .map(|(code, _)| code);

    let minority = match minority {
        Some(code) if present >= 2 && before[code] < majority => code,
        _ => return Ok((dataset.clone(), unchanged(before))),
    };

    let per_record = (options.percentage / 100.0).round().max(0.0) as usize;
    let ranges = NumericRanges::new(dataset);
    let samples: Vec<&Record> = dataset
        .records()
        .iter()
        .filter(|r| r.value(target).as_code() == Some(minority))
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut records = dataset.records().to_vec();

    for (i, original) in samples.iter().enumerate() {
        let neighbors = nearest_neighbors(i, &samples, options.k, &ranges, target);
        for _ in 0..per_record {
            let neighbor = if neighbors.is_empty() {
                original
            } else {
                &samples[neighbors[rng.gen_range(0..neighbors.len())]]
            };
            let gap: f64 = rng.gen();
            records.push(interpolate(
                dataset, original, neighbor, &neighbors, &samples, gap, target,
            ));
        }
    }

    let synthesized = records.len() - dataset.len();
    let balanced = dataset.derive(records);
    let after = balanced.class_counts()?;
    Ok((
        balanced,
        BalanceReport {
            minority: Some(minority),
            before,
            after,
            synthesized,
        },
    ))
}

/// Per-attribute value range over the whole dataset, used to normalize numeric distances
struct NumericRanges {
    ranges: Vec<Option<(f64, f64)>>,
}

impl NumericRanges {
    fn new(dataset: &Dataset) -> Self {
        let ranges = (0..dataset.num_attributes())
            .map(|i| {
                let stats = dataset.attribute_stats(i);
                stats.min.zip(stats.max)
            })
            .collect();
        Self { ranges }
    }

    fn normalized_diff(&self, index: usize, a: f64, b: f64) -> f64 {
        match self.ranges[index] {
            Some((min, max)) if max > min => (a - b) / (max - min),
            _ => 0.0,
        }
    }
}

/// Mixed-type distance: normalized Euclidean on numeric attributes, 0/1 mismatch on
/// nominal ones. A missing value on either side counts as a full mismatch.
fn distance(a: &Record, b: &Record, ranges: &NumericRanges, target: usize) -> f64 {
    let mut sum = 0.0;
    for (index, (x, y)) in a.values().iter().zip(b.values()).enumerate() {
        if index == target {
            continue;
        }
        let d = match (*x, *y) {
            (Value::Missing, Value::Missing) => 0.0,
            (Value::Missing, _) | (_, Value::Missing) => 1.0,
            (Value::Numeric(p), Value::Numeric(q)) => ranges.normalized_diff(index, p, q),
            (Value::Nominal(p), Value::Nominal(q)) => {
                if p == q {
                    0.0
                } else {
                    1.0
                }
            }
            _ => 1.0,
        };
        sum += d * d;
    }
    sum.sqrt()
}

/// Indices (into `samples`) of the `k` nearest other samples, closest first.
/// Equal distances keep sample order.
fn nearest_neighbors(
    of: usize,
    samples: &[&Record],
    k: usize,
    ranges: &NumericRanges,
    target: usize,
) -> Vec<usize> {
    let k = k.min(samples.len().saturating_sub(1));
    if k == 0 {
        return Vec::new();
    }
    let mut by_distance: Vec<(f64, usize)> = samples
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != of)
        .map(|(j, other)| (distance(samples[of], other, ranges, target), j))
        .collect();
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    by_distance.truncate(k);
    by_distance.into_iter().map(|(_, j)| j).collect()
}

/// Build one synthetic record between `original` and `neighbor`.
///
/// Numeric values sit at `gap` along the segment; nominal values take the
/// majority label among the original and all of its neighbors, ties keeping
/// the original's label.
fn interpolate(
    dataset: &Dataset,
    original: &Record,
    neighbor: &Record,
    neighbors: &[usize],
    samples: &[&Record],
    gap: f64,
    target: usize,
) -> Record {
    let attributes = dataset.schema().attributes();
    let values = original
        .values()
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if index == target {
                return value;
            }
            match (value, neighbor.value(index)) {
                (Value::Numeric(p), Value::Numeric(q)) => Value::Numeric(p + gap * (q - p)),
                (Value::Nominal(own), _) => {
                    let mut votes = vec![0usize; attributes[index].num_values()];
                    votes[own] += 1;
                    for &j in neighbors {
                        if let Value::Nominal(code) = samples[j].value(index) {
                            votes[code] += 1;
                        }
                    }
                    let mut best = own;
                    for (code, &count) in votes.iter().enumerate() {
                        if count > votes[best] {
                            best = code;
                        }
                    }
                    Value::Nominal(best)
                }
                _ => value,
            }
        })
        .collect();
    Record::new(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imbalance_ratio() {
        assert_eq!(imbalance_ratio(&[200, 100]), Some(2.0));
        assert_eq!(imbalance_ratio(&[5, 0, 5]), Some(1.0));
        assert_eq!(imbalance_ratio(&[]), None);
    }

    #[test]
    fn test_entropy_is_maximal_at_parity() {
        assert!((class_entropy(&[50, 50]) - 1.0).abs() < 1e-12);
        assert!(class_entropy(&[90, 10]) < class_entropy(&[60, 40]));
        assert_eq!(class_entropy(&[10, 0]), 0.0);
    }
}
