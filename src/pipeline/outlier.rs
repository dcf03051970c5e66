//! IQR-based outlier removal
//!
//! Attributes are processed one at a time in schema order, and each pass sees
//! the rows that survived the previous attributes. Removing outliers on one
//! attribute therefore changes the quartiles used for the next one; reordering
//! or parallelizing the passes changes which rows survive.

use crate::pipeline::dataset::{Dataset, Value};

/// Quartile fences for one attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Positional (non-interpolated) quartiles: Q1 at rank n/4, Q3 at rank 3n/4.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        let q1 = sorted[n / 4];
        let q3 = sorted[3 * n / 4];
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - 1.5 * iqr,
            upper: q3 + 1.5 * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Rows removed while filtering one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierPass {
    pub attribute: String,
    pub bounds: IqrBounds,
    pub removed: usize,
}

/// Remove outlying rows, attribute by attribute.
pub fn remove_outliers_iqr(dataset: &Dataset) -> Dataset {
    remove_outliers_with_report(dataset).0
}

/// Remove outlying rows and report the bounds and removals of every pass.
///
/// Missing values neither contribute to the quartiles nor cause removal.
pub fn remove_outliers_with_report(dataset: &Dataset) -> (Dataset, Vec<OutlierPass>) {
    let target = dataset.schema().target();
    let mut current = dataset.clone();
    let mut passes = Vec::new();

    for (index, attribute) in dataset.schema().attributes().iter().enumerate() {
        if !attribute.is_numeric() || Some(index) == target {
            continue;
        }

        // Quartiles come from the rows still alive at this point in the pass
        let Some(bounds) = IqrBounds::from_values(&current.numeric_values(index)) else {
            continue;
        };

        let before = current.len();
        current = current.filter(|record| match record.value(index) {
            Value::Numeric(v) => bounds.contains(v),
            _ => true,
        });

        passes.push(OutlierPass {
            attribute: attribute.name.clone(),
            bounds,
            removed: before - current.len(),
        });
    }

    (current, passes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_quartiles() {
        // n = 8: Q1 = sorted[2], Q3 = sorted[6]
        let bounds = IqrBounds::from_values(&[8.0, 1.0, 7.0, 2.0, 6.0, 3.0, 5.0, 4.0]).unwrap();
        assert_eq!(bounds.q1, 3.0);
        assert_eq!(bounds.q3, 7.0);
        assert_eq!(bounds.lower, -3.0);
        assert_eq!(bounds.upper, 13.0);
    }

    #[test]
    fn test_empty_values_have_no_bounds() {
        assert!(IqrBounds::from_values(&[]).is_none());
    }
}
