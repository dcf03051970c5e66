//! Tests for exact duplicate removal

use cardiomine::pipeline::remove_duplicates;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_later_duplicates_are_dropped() {
    let dataset = numeric_dataset(
        &["age", "chol"],
        &[
            (vec![Some(50.0), Some(200.0)], 0),
            (vec![Some(61.0), None], 1),
            (vec![Some(50.0), Some(200.0)], 0),
            (vec![Some(61.0), None], 1),
            (vec![Some(50.0), Some(200.0)], 1),
        ],
    );

    let (deduped, removed) = remove_duplicates(&dataset);

    assert_eq!(removed, 2);
    assert_eq!(deduped.len(), 3);
    // First occurrences keep their order
    assert_eq!(deduped.records()[0], dataset.records()[0]);
    assert_eq!(deduped.records()[1], dataset.records()[1]);
    assert_eq!(deduped.records()[2], dataset.records()[4]);
}

#[test]
fn test_deduplication_is_idempotent() {
    let base = heart_dataset(50, 30, 11);
    let mut rows = base.records().to_vec();
    rows.extend_from_slice(&base.records()[..25]);
    let dataset = cardiomine::pipeline::Dataset::new(base.schema().clone(), rows).unwrap();

    let (once, removed) = remove_duplicates(&dataset);
    let (twice, removed_again) = remove_duplicates(&once);

    assert_eq!(removed, 25);
    assert_eq!(removed_again, 0);
    assert_eq!(once.records(), twice.records());
    assert!(once.len() <= dataset.len());
}

#[test]
fn test_negative_zero_matches_zero() {
    let dataset = numeric_dataset(
        &["oldpeak"],
        &[(vec![Some(0.0)], 0), (vec![Some(-0.0)], 0)],
    );
    let (deduped, removed) = remove_duplicates(&dataset);
    assert_eq!(removed, 1);
    assert_eq!(deduped.len(), 1);
}
