//! Exact duplicate removal

use std::collections::HashSet;

use crate::pipeline::dataset::{Dataset, Record, Value};

/// Hashable identity of a record: missing equals missing, floats compare by bits.
#[derive(Debug, PartialEq, Eq, Hash)]
enum CellKey {
    Missing,
    Numeric(u64),
    Nominal(usize),
}

fn record_key(record: &Record) -> Vec<CellKey> {
    record
        .values()
        .iter()
        .map(|v| match *v {
            Value::Missing => CellKey::Missing,
            // Normalize -0.0 so it collides with 0.0
            Value::Numeric(x) => CellKey::Numeric((x + 0.0).to_bits()),
            Value::Nominal(code) => CellKey::Nominal(code),
        })
        .collect()
}

/// Drop later duplicates of any record, keeping the first occurrence.
///
/// Returns the deduplicated dataset and the number of records removed.
pub fn remove_duplicates(dataset: &Dataset) -> (Dataset, usize) {
    let mut seen: HashSet<Vec<CellKey>> = HashSet::with_capacity(dataset.len());
    let deduped = dataset.filter(|record| seen.insert(record_key(record)));
    let removed = dataset.len() - deduped.len();
    (deduped, removed)
}
