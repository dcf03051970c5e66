//! Tests for dataset loading, target detection and snapshots

use cardiomine::pipeline::loader::{
    detect_target, load_dataframe, schema_sidecar_path, with_nominal_target,
};
use cardiomine::pipeline::{
    load_dataset, remove_outliers_iqr, save_snapshot, AttributeKind, LoadOptions, Value,
};
use polars::df;
use polars::prelude::ParquetWriter;
use std::path::Path;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_load_csv_with_missing_markers() {
    let (_dir, path) = create_temp_file("heart.csv", &heart_csv(20, 10, 1));

    let dataset = load_dataset(&path, &LoadOptions::default()).unwrap();

    assert_eq!(dataset.len(), 30);
    assert_eq!(dataset.num_attributes(), 6);
    assert_eq!(dataset.schema().relation(), "heart");

    // Every seventh cholesterol cell starting at row 3 was '?'
    let chol = dataset.schema().index_of("chol").unwrap();
    assert_eq!(dataset.schema().attributes()[chol].kind, AttributeKind::Numeric);
    assert_eq!(dataset.attribute_stats(chol).missing_count, 4);
    assert_eq!(dataset.missing_count(), 4);
    assert!(dataset.records()[3].value(chol).is_missing());
}

#[test]
fn test_target_is_detected_and_made_nominal() {
    let (_dir, path) = create_temp_file("heart.csv", &heart_csv(20, 10, 2));
    let dataset = load_dataset(&path, &LoadOptions::default()).unwrap();

    let target = dataset.schema().target_attribute().unwrap();
    assert_eq!(target.name, "num");
    assert_eq!(target.kind, AttributeKind::Nominal);
    assert_eq!(target.domain, binary_labels());
    assert_eq!(class_counts(&dataset), vec![20, 10]);

    let sex = dataset.schema().index_of("sex").unwrap();
    assert_eq!(dataset.schema().attributes()[sex].kind, AttributeKind::Nominal);
}

#[test]
fn test_detect_target_prefers_synonyms_then_last_column() {
    assert_eq!(detect_target(&["age", "target", "chol"]), Some(1));
    assert_eq!(detect_target(&["class", "num"]), Some(1));
    assert_eq!(detect_target(&["age", "chol", "outcome"]), Some(2));
    assert_eq!(detect_target(&[]), None);
}

#[test]
fn test_multiclass_numeric_target_gets_sorted_labels() {
    let csv = "age,severity\n50,2\n60,0\n55,3\n45,0\n";
    let (_dir, path) = create_temp_file("multi.csv", csv);

    let dataset = load_dataset(&path, &LoadOptions::default()).unwrap();
    let target = dataset.schema().target_attribute().unwrap();

    assert_eq!(target.name, "severity");
    assert_eq!(target.domain, vec!["0", "2", "3"]);
    assert_eq!(dataset.records()[0].value(1), Value::Nominal(1));
    assert_eq!(dataset.records()[2].value(1), Value::Nominal(2));
}

#[test]
fn test_nominal_target_is_kept_as_is() {
    let dataset = heart_dataset(5, 5, 3);
    let retargeted = with_nominal_target(&dataset, 4).unwrap();

    assert_eq!(retargeted.schema().target(), Some(4));
    assert_eq!(
        retargeted.schema().target_attribute().unwrap().domain,
        vec!["female", "male"]
    );
}

#[test]
fn test_csv_snapshot_round_trip_keeps_schema() {
    let dataset = with_missing(&heart_dataset(15, 10, 4), 2, 5);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snapshots").join("heart_data_cleaned.csv");

    save_snapshot(&dataset, &path).unwrap();
    assert!(path.exists());
    assert!(schema_sidecar_path(&path).exists());

    let loaded = load_dataset(&path, &LoadOptions::default()).unwrap();
    assert_eq!(loaded.schema(), dataset.schema());
    assert_eq!(loaded.len(), dataset.len());
    assert_eq!(loaded.attribute_stats(2).missing_count, 3);
    assert_eq!(loaded.missing_count(), dataset.missing_count());
    for (a, b) in loaded.records().iter().zip(dataset.records()) {
        assert_eq!(a.value(4), b.value(4));
        assert_eq!(a.value(5), b.value(5));
    }
}

#[test]
fn test_parquet_snapshot_round_trip() {
    let dataset = heart_dataset(10, 10, 5);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("heart_data_improved.parquet");

    save_snapshot(&dataset, &path).unwrap();
    let loaded = load_dataset(&path, &LoadOptions::default()).unwrap();

    assert_eq!(loaded.schema(), dataset.schema());
    assert_eq!(loaded.records(), dataset.records());
}

#[test]
fn test_full_scan_schema_inference() {
    let (_dir, path) = create_temp_file("heart.csv", &heart_csv(10, 10, 6));
    let df = load_dataframe(
        &path,
        &LoadOptions {
            infer_schema_length: 0,
        },
    )
    .unwrap();
    assert_eq!(df.height(), 20);
    assert_eq!(df.width(), 6);
}

#[test]
fn test_unsupported_extension() {
    let (_dir, path) = create_temp_file("heart.txt", "a,b\n1,2\n");
    let err = load_dataset(&path, &LoadOptions::default()).unwrap_err();
    assert!(err.to_string().contains("Unsupported file format"));
}

#[test]
fn test_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.csv");
    assert!(load_dataset(&path, &LoadOptions::default()).is_err());
}

/// Save a small heart snapshot as CSV and return its directory and path
fn saved_snapshot() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("heart_data_cleaned.csv");
    save_snapshot(&heart_dataset(6, 4, 8), &path).unwrap();
    (dir, path)
}

/// Rewrite every CSV line of `path` through `edit(row_index, fields)`; row 0 is the header
fn rewrite_csv(path: &Path, edit: impl Fn(usize, &mut Vec<String>)) {
    let text = std::fs::read_to_string(path).unwrap();
    let lines: Vec<String> = text
        .lines()
        .enumerate()
        .map(|(i, line)| {
            let mut fields: Vec<String> = line.split(',').map(String::from).collect();
            edit(i, &mut fields);
            fields.join(",")
        })
        .collect();
    std::fs::write(path, lines.join("\n") + "\n").unwrap();
}

#[test]
fn test_sidecar_with_out_of_range_target_is_rejected() {
    let (_dir, path) = saved_snapshot();
    let sidecar = schema_sidecar_path(&path);
    let mut schema: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&sidecar).unwrap()).unwrap();
    schema["target"] = serde_json::json!(99);
    std::fs::write(&sidecar, serde_json::to_string_pretty(&schema).unwrap()).unwrap();

    let err = load_dataset(&path, &LoadOptions::default()).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to parse schema file"), "{}", message);
    assert!(message.contains("target index 99 out of range"), "{}", message);
}

#[test]
fn test_sidecar_label_outside_domain_is_rejected() {
    let (_dir, path) = saved_snapshot();
    rewrite_csv(&path, |row, fields| {
        if row == 1 {
            fields[4] = "unknown".to_string();
        }
    });

    let err = load_dataset(&path, &LoadOptions::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("Label 'unknown' is not in the domain of 'sex'"));
}

#[test]
fn test_sidecar_column_missing_from_snapshot_is_rejected() {
    let (_dir, path) = saved_snapshot();
    rewrite_csv(&path, |_, fields| {
        fields.remove(1);
    });

    let err = load_dataset(&path, &LoadOptions::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("Column 'chol' missing from snapshot"));
}

#[test]
fn test_infinite_values_load_as_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("inf.parquet");
    let mut df = df! {
        "chol" => [f64::INFINITY, 210.0, f64::INFINITY, 230.0, f64::INFINITY, 190.0, f64::NEG_INFINITY, 250.0],
        "num" => [0i32, 1, 0, 1, 0, 1, 0, 1],
    }
    .unwrap();
    let file = std::fs::File::create(&path).unwrap();
    ParquetWriter::new(file).finish(&mut df).unwrap();

    let dataset = load_dataset(&path, &LoadOptions::default()).unwrap();
    assert_eq!(dataset.attribute_stats(0).missing_count, 4);

    // The IQR fences stay finite, so no observed value is dropped
    let filtered = remove_outliers_iqr(&dataset);
    assert_eq!(filtered.len(), dataset.len());
}
