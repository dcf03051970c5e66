//! Missing value imputation
//!
//! Numeric attributes are filled with the median of their observed values,
//! nominal attributes with their mode. Each attribute is imputed from its own
//! column only.

use serde::Serialize;

use crate::pipeline::dataset::{Dataset, Value};

/// Replacement applied to one attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImputedAttribute {
    pub name: String,
    /// Number of cells that were filled
    pub filled: usize,
    /// Human-readable replacement ("median = 20" / "mode = male")
    pub replacement: String,
}

/// Median of `values`; the mean of the two central values for even counts,
/// 0.0 when there are no values.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Most frequent code; ties go to the lowest code, 0 when nothing was observed.
pub fn mode(counts: &[usize]) -> usize {
    let mut best = 0;
    for (code, &count) in counts.iter().enumerate().skip(1) {
        if count > counts[best] {
            best = code;
        }
    }
    best
}

/// Fill missing values, returning a new dataset.
pub fn impute(dataset: &Dataset) -> Dataset {
    impute_with_report(dataset).0
}

/// Fill missing values and report what was replaced per attribute.
pub fn impute_with_report(dataset: &Dataset) -> (Dataset, Vec<ImputedAttribute>) {
    let mut records = dataset.records().to_vec();
    let mut report = Vec::new();

    for (index, attribute) in dataset.schema().attributes().iter().enumerate() {
        let stats = dataset.attribute_stats(index);
        if stats.missing_count == 0 {
            continue;
        }

        let (fill, replacement) = if attribute.is_numeric() {
            let m = median(&dataset.numeric_values(index));
            (Value::Numeric(m), format!("median = {}", m))
        } else {
            if attribute.num_values() == 0 {
                // Nothing to pick a mode from
                continue;
            }
            let code = mode(&stats.nominal_counts);
            let label = attribute.label(code).unwrap_or("?");
            (Value::Nominal(code), format!("mode = {}", label))
        };

        for record in records.iter_mut() {
            if record.value(index).is_missing() {
                record.set(index, fill);
            }
        }

        report.push(ImputedAttribute {
            name: attribute.name.clone(),
            filled: stats.missing_count,
            replacement,
        });
    }

    (dataset.derive(records), report)
}
