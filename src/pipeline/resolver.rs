//! Semantic attribute resolution
//!
//! Maps a list of candidate names (e.g. `["chol", "cholesterol"]`) onto a
//! schema column. Exact names win over normalized matches; callers decide
//! whether a miss is fatal.

use crate::error::{PipelineError, Result};
use crate::pipeline::dataset::Dataset;

/// Lowercase and strip everything that is not an ASCII letter or digit.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Resolve the first schema attribute matching any candidate.
///
/// Matching order:
/// 1. exact name match, trying candidates in order
/// 2. normalized match, scanning schema attributes in order against every candidate
pub fn resolve(dataset: &Dataset, candidates: &[&str]) -> Result<usize> {
    let schema = dataset.schema();

    for candidate in candidates {
        if let Some(index) = schema.index_of(candidate) {
            return Ok(index);
        }
    }

    let normalized: Vec<String> = candidates.iter().map(|c| normalize_name(c)).collect();
    for (index, attribute) in schema.attributes().iter().enumerate() {
        let name = normalize_name(&attribute.name);
        if normalized.iter().any(|c| *c == name) {
            return Ok(index);
        }
    }

    Err(PipelineError::MissingAttribute {
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
    })
}
