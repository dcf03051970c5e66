//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::path::PathBuf;

use cardiomine::pipeline::{Attribute, Dataset, Record, Schema, Value};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

/// Class labels of the binary heart disease target
pub fn binary_labels() -> Vec<String> {
    vec!["0".to_string(), "1".to_string()]
}

/// Numeric attributes plus a binary nominal target named `num` in last position
pub fn numeric_schema(names: &[&str]) -> Schema {
    let mut attributes: Vec<Attribute> = names.iter().map(|n| Attribute::numeric(*n)).collect();
    attributes.push(Attribute::nominal("num", binary_labels()));
    let target = attributes.len() - 1;
    Schema::new("test", attributes, Some(target)).unwrap()
}

/// One record of [`numeric_schema`]: `None` cells are missing
pub fn numeric_record(values: &[Option<f64>], class: usize) -> Record {
    let mut cells: Vec<Value> = values
        .iter()
        .map(|v| v.map_or(Value::Missing, Value::Numeric))
        .collect();
    cells.push(Value::Nominal(class));
    Record::new(cells)
}

/// Dataset over [`numeric_schema`] built from `(values, class)` rows
pub fn numeric_dataset(names: &[&str], rows: &[(Vec<Option<f64>>, usize)]) -> Dataset {
    let records = rows
        .iter()
        .map(|(values, class)| numeric_record(values, *class))
        .collect();
    Dataset::new(numeric_schema(names), records).unwrap()
}

/// Heart-disease-like dataset: age, chol, trestbps, thalach, sex (nominal), num.
///
/// Values are drawn uniformly inside clinical ranges, so no value falls
/// outside the IQR fences and no two records are identical. Positive records
/// are older with higher cholesterol and blood pressure, which makes the
/// classes learnable without being separable.
pub fn heart_dataset(negatives: usize, positives: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let attributes = vec![
        Attribute::numeric("age"),
        Attribute::numeric("chol"),
        Attribute::numeric("trestbps"),
        Attribute::numeric("thalach"),
        Attribute::nominal("sex", vec!["female".to_string(), "male".to_string()]),
        Attribute::nominal("num", binary_labels()),
    ];
    let schema = Schema::new("heart", attributes, Some(5)).unwrap();

    let mut records = Vec::with_capacity(negatives + positives);
    for i in 0..negatives + positives {
        let class = usize::from(i >= negatives);
        let shift = class as f64;
        let age = rng.gen_range(35.0 + 10.0 * shift..60.0 + 10.0 * shift);
        let chol = rng.gen_range(170.0 + 40.0 * shift..240.0 + 40.0 * shift);
        let bp = rng.gen_range(110.0 + 15.0 * shift..140.0 + 15.0 * shift);
        let thalach = rng.gen_range(140.0 - 20.0 * shift..180.0 - 20.0 * shift);
        let sex = if rng.gen_bool(0.4 + 0.2 * shift) { 1 } else { 0 };
        records.push(Record::new(vec![
            Value::Numeric(age),
            Value::Numeric(chol),
            Value::Numeric(bp),
            Value::Numeric(thalach),
            Value::Nominal(sex),
            Value::Nominal(class),
        ]));
    }
    Dataset::new(schema, records).unwrap()
}

/// Copy of `dataset` with every `every`-th value of attribute `index` set to missing
pub fn with_missing(dataset: &Dataset, index: usize, every: usize) -> Dataset {
    let records = dataset
        .records()
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut record = record.clone();
            if i % every == 0 {
                record.set(index, Value::Missing);
            }
            record
        })
        .collect();
    Dataset::new(dataset.schema().clone(), records).unwrap()
}

/// Heart dataset rendered as CSV text, with `?` markers for every seventh cholesterol value
pub fn heart_csv(negatives: usize, positives: usize, seed: u64) -> String {
    let dataset = heart_dataset(negatives, positives, seed);
    let mut csv = String::from("age,chol,trestbps,thalach,sex,num\n");
    for (i, record) in dataset.records().iter().enumerate() {
        let num = |index: usize| record.value(index).as_f64().unwrap_or(0.0);
        let chol = if i % 7 == 3 {
            "?".to_string()
        } else {
            format!("{:.1}", num(1))
        };
        let sex = if record.value(4).as_code() == Some(1) { "male" } else { "female" };
        let class = record.value(5).as_code().unwrap_or(0);
        csv.push_str(&format!(
            "{:.1},{},{:.1},{:.1},{},{}\n",
            num(0),
            chol,
            num(2),
            num(3),
            sex,
            class
        ));
    }
    csv
}

/// Create a temporary directory holding `content` as `name`
pub fn create_temp_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (temp_dir, path)
}

/// Per-class counts, panicking on a missing target
pub fn class_counts(dataset: &Dataset) -> Vec<usize> {
    dataset.class_counts().unwrap()
}
