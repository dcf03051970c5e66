//! Dataset profiling: class balance, attribute statistics and missing values

use serde::Serialize;

use crate::pipeline::balance::imbalance_ratio;
use crate::pipeline::dataset::{AttributeStats, Dataset};

/// Class imbalance ratio above which a dataset is flagged as imbalanced
pub const IMBALANCE_WARNING_RATIO: f64 = 1.5;

/// Share of one class label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassShare {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

/// Missing cells of one attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingShare {
    pub attribute: String,
    pub count: usize,
    pub percent: f64,
}

/// Everything the analyzer reports about a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub relation: String,
    pub instances: usize,
    pub attributes: usize,
    pub target: Option<String>,
    pub classes: Vec<ClassShare>,
    pub imbalance_ratio: Option<f64>,
    /// Non-target numeric attributes with their statistics
    pub numeric: Vec<(String, AttributeStats)>,
    pub numeric_count: usize,
    pub nominal_count: usize,
    pub missing: Vec<MissingShare>,
    pub total_missing: usize,
    /// Missing cells over all cells, in percent
    pub missing_rate: f64,
}

impl DatasetProfile {
    pub fn is_imbalanced(&self) -> bool {
        self.imbalance_ratio
            .is_some_and(|r| r > IMBALANCE_WARNING_RATIO)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Profile `dataset`. Works with or without a designated target.
pub fn profile(dataset: &Dataset) -> DatasetProfile {
    let schema = dataset.schema();
    let target = schema.target();
    let instances = dataset.len();

    let mut classes = Vec::new();
    let mut counts = Vec::new();
    if let Some(attribute) = schema.target_attribute().filter(|a| a.is_nominal()) {
        counts = dataset.class_counts().unwrap_or_default();
        classes = attribute
            .domain
            .iter()
            .zip(&counts)
            .map(|(label, &count)| ClassShare {
                label: label.clone(),
                count,
                percent: percent(count, instances),
            })
            .collect();
    }

    let mut numeric = Vec::new();
    let mut numeric_count = 0;
    let mut nominal_count = 0;
    let mut missing = Vec::new();
    let mut total_missing = 0;

    for (index, attribute) in schema.attributes().iter().enumerate() {
        let stats = dataset.attribute_stats(index);
        if stats.missing_count > 0 {
            total_missing += stats.missing_count;
            missing.push(MissingShare {
                attribute: attribute.name.clone(),
                count: stats.missing_count,
                percent: percent(stats.missing_count, instances),
            });
        }
        if Some(index) == target {
            continue;
        }
        if attribute.is_numeric() {
            numeric_count += 1;
            numeric.push((attribute.name.clone(), stats));
        } else {
            nominal_count += 1;
        }
    }

    DatasetProfile {
        relation: dataset.relation().to_string(),
        instances,
        attributes: dataset.num_attributes(),
        target: schema.target_attribute().map(|a| a.name.clone()),
        classes,
        imbalance_ratio: imbalance_ratio(&counts),
        numeric,
        numeric_count,
        nominal_count,
        missing,
        total_missing,
        missing_rate: percent(total_missing, instances * dataset.num_attributes()),
    }
}
