//! Clinical risk feature synthesis
//!
//! Derives bucketed risk features from age, cholesterol and resting blood
//! pressure, plus a weighted composite score. Source columns are found by
//! semantic name matching; a missing source only skips the features that need it.

use serde::Serialize;
use tracing::warn;

use crate::pipeline::dataset::{Attribute, AttributeStats, Dataset, Record, Value};
use crate::pipeline::resolver::resolve;

pub const AGE_RISK_GROUP: &str = "age_risk_group";
pub const CHOL_CATEGORY: &str = "chol_category";
pub const BP_CATEGORY: &str = "bp_category";
pub const RISK_SCORE: &str = "risk_score";

/// Names of every feature this module can derive, in creation order
pub const DERIVED_FEATURES: [&str; 4] = [AGE_RISK_GROUP, CHOL_CATEGORY, BP_CATEGORY, RISK_SCORE];

pub const AGE_CANDIDATES: &[&str] = &["age", "Age"];
pub const CHOL_CANDIDATES: &[&str] = &[
    "chol",
    "cholesterol",
    "cholesterol_level",
    "Cholesterol Level",
    "cholesterol level",
];
pub const BP_CANDIDATES: &[&str] = &[
    "trestbps",
    "bp",
    "blood_pressure",
    "Blood Pressure",
    "blood pressure",
];

/// 1 = <40, 2 = 40-55, 3 = 56-70, 4 = 71+
pub fn age_risk_group(age: f64) -> f64 {
    if age < 40.0 {
        1.0
    } else if age < 56.0 {
        2.0
    } else if age < 71.0 {
        3.0
    } else {
        4.0
    }
}

/// 1 = normal (<200), 2 = borderline (200-239), 3 = high (240+)
pub fn chol_category(chol: f64) -> f64 {
    if chol < 200.0 {
        1.0
    } else if chol < 240.0 {
        2.0
    } else {
        3.0
    }
}

/// 1 = normal (<120), 2 = elevated (120-129), 3 = stage 1 (130-139), 4 = stage 2 (140+)
pub fn bp_category(bp: f64) -> f64 {
    if bp < 120.0 {
        1.0
    } else if bp < 130.0 {
        2.0
    } else if bp < 140.0 {
        3.0
    } else {
        4.0
    }
}

/// Weighted composite of the three bucketed features
pub fn risk_score(age_group: f64, chol_cat: f64, bp_cat: f64) -> f64 {
    0.3 * age_group + 0.3 * chol_cat + 0.4 * bp_cat
}

/// A derived feature that was not created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFeature {
    pub name: String,
    pub reason: String,
}

/// What `create_features` did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureSynthesis {
    pub created: Vec<String>,
    pub skipped: Vec<SkippedFeature>,
}

impl FeatureSynthesis {
    fn skip(&mut self, name: &str, reason: String) {
        warn!(feature = name, %reason, "skipping derived feature");
        self.skipped.push(SkippedFeature {
            name: name.to_string(),
            reason,
        });
    }
}

/// Append the derived risk features that can be computed.
pub fn create_features(dataset: &Dataset) -> Dataset {
    create_features_with_report(dataset).0
}

/// Append the derived risk features and report what was created or skipped.
pub fn create_features_with_report(dataset: &Dataset) -> (Dataset, FeatureSynthesis) {
    let mut report = FeatureSynthesis::default();
    let mut current = dataset.clone();

    let bucketed: [(&str, &[&str], fn(f64) -> f64); 3] = [
        (AGE_RISK_GROUP, AGE_CANDIDATES, age_risk_group),
        (CHOL_CATEGORY, CHOL_CANDIDATES, chol_category),
        (BP_CATEGORY, BP_CANDIDATES, bp_category),
    ];

    for (name, candidates, bucket) in bucketed {
        match numeric_source(&current, name, candidates) {
            Ok(source) => {
                current = append_numeric(&current, name, |record| {
                    record.value(source).as_f64().map(bucket)
                });
                report.created.push(name.to_string());
            }
            Err(reason) => report.skip(name, reason),
        }
    }

    let schema = current.schema();
    match (
        schema.index_of(AGE_RISK_GROUP),
        schema.index_of(CHOL_CATEGORY),
        schema.index_of(BP_CATEGORY),
    ) {
        (Some(age), Some(chol), Some(bp)) if schema.index_of(RISK_SCORE).is_none() => {
            current = append_numeric(&current, RISK_SCORE, |record| {
                match (
                    record.value(age).as_f64(),
                    record.value(chol).as_f64(),
                    record.value(bp).as_f64(),
                ) {
                    (Some(a), Some(c), Some(b)) => Some(risk_score(a, c, b)),
                    _ => None,
                }
            });
            report.created.push(RISK_SCORE.to_string());
        }
        (Some(_), Some(_), Some(_)) => {
            report.skip(RISK_SCORE, format!("'{}' already present", RISK_SCORE))
        }
        _ => report.skip(RISK_SCORE, "requires all three bucketed features".to_string()),
    }

    (current, report)
}

/// Resolve a numeric source column for a derived feature, or explain why not.
fn numeric_source(
    dataset: &Dataset,
    feature: &str,
    candidates: &[&str],
) -> std::result::Result<usize, String> {
    if dataset.schema().index_of(feature).is_some() {
        return Err(format!("'{}' already present", feature));
    }
    let index = resolve(dataset, candidates).map_err(|e| e.to_string())?;
    let attribute = &dataset.schema().attributes()[index];
    if !attribute.is_numeric() {
        return Err(format!("source attribute '{}' is not numeric", attribute.name));
    }
    Ok(index)
}

/// New dataset with one numeric column appended, computed per record.
fn append_numeric<F>(dataset: &Dataset, name: &str, compute: F) -> Dataset
where
    F: Fn(&Record) -> Option<f64>,
{
    let schema = dataset.schema().with_attribute(Attribute::numeric(name));
    let records = dataset
        .records()
        .iter()
        .map(|record| {
            let mut extended = record.clone();
            extended.push(compute(record).map_or(Value::Missing, Value::Numeric));
            extended
        })
        .collect();
    // Schema and records are built together above
    Dataset::new(schema, records).unwrap_or_else(|_| dataset.clone())
}

/// Statistics of every derived feature present in `dataset`.
pub fn derived_feature_stats(dataset: &Dataset) -> Vec<(String, AttributeStats)> {
    DERIVED_FEATURES
        .iter()
        .filter_map(|name| {
            dataset
                .schema()
                .index_of(name)
                .map(|i| (name.to_string(), dataset.attribute_stats(i)))
        })
        .collect()
}
