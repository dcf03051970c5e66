//! Hyperparameter configurations and the per-family search grids

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Tree family parameter: pruning confidence factor
pub const CONFIDENCE_FACTOR: &str = "confidence_factor";
/// Tree family parameter: minimum records per leaf
pub const MIN_LEAF: &str = "min_leaf";
/// Tree family parameter: skip pruning
pub const UNPRUNED: &str = "unpruned";
/// Forest family parameter: number of trees
pub const NUM_TREES: &str = "num_trees";
/// Forest family parameter: maximum depth, 0 = unlimited
pub const MAX_DEPTH: &str = "max_depth";
/// Forest family parameter: attributes sampled per split, 0 = floor(log2(M)) + 1
pub const NUM_FEATURES: &str = "num_features";

/// A single hyperparameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Flag(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Flag(v) => write!(f, "{}", v),
        }
    }
}

/// A named mapping from parameter name to value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    pub name: String,
    pub params: BTreeMap<String, ParamValue>,
}

impl Configuration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: ParamValue) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.params.get(key).copied()
    }

    /// Float view of a parameter (integers are widened)
    pub fn float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            ParamValue::Float(v) => Some(v),
            ParamValue::Int(v) => Some(v as f64),
            ParamValue::Flag(_) => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            ParamValue::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Flags default to false when absent
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(ParamValue::Flag(true)))
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.name)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, ")")
    }
}

fn pruned_tree(confidence: f64, min_leaf: i64) -> Configuration {
    Configuration::new(format!("C={:.2} M={}", confidence, min_leaf))
        .with(CONFIDENCE_FACTOR, ParamValue::Float(confidence))
        .with(MIN_LEAF, ParamValue::Int(min_leaf))
}

fn unpruned_tree(min_leaf: i64) -> Configuration {
    Configuration::new(format!("unpruned M={}", min_leaf))
        .with(UNPRUNED, ParamValue::Flag(true))
        .with(MIN_LEAF, ParamValue::Int(min_leaf))
}

/// Default tree configuration: C=0.25, M=2
pub fn tree_default() -> Configuration {
    pruned_tree(0.25, 2)
}

/// The ten tree configurations searched by the tuner
pub fn tree_grid() -> Vec<Configuration> {
    let mut grid: Vec<Configuration> = [
        (0.05, 2),
        (0.10, 2),
        (0.15, 4),
        (0.20, 4),
        (0.25, 6),
        (0.30, 6),
        (0.35, 8),
        (0.40, 10),
    ]
    .iter()
    .map(|&(c, m)| pruned_tree(c, m))
    .collect();
    grid.push(unpruned_tree(2));
    grid.push(unpruned_tree(5));
    grid
}

fn forest(num_trees: i64, max_depth: i64, num_features: i64) -> Configuration {
    Configuration::new(format!(
        "I={} depth={} K={}",
        num_trees, max_depth, num_features
    ))
    .with(NUM_TREES, ParamValue::Int(num_trees))
    .with(MAX_DEPTH, ParamValue::Int(max_depth))
    .with(NUM_FEATURES, ParamValue::Int(num_features))
}

/// Default forest configuration: 100 trees, unlimited depth, default subset size
pub fn forest_default() -> Configuration {
    forest(100, 0, 0)
}

/// Forest grid: trees x depths x {default, round(sqrt(num_features))}
pub fn forest_grid(trees: &[usize], depths: &[usize], num_features: usize) -> Vec<Configuration> {
    let sqrt_features = (num_features as f64).sqrt().round() as i64;
    let mut grid = Vec::with_capacity(trees.len() * depths.len() * 2);
    for &t in trees {
        for &d in depths {
            for k in [0, sqrt_features] {
                grid.push(forest(t as i64, d as i64, k));
            }
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_grid_shape() {
        let grid = tree_grid();
        assert_eq!(grid.len(), 10);
        assert_eq!(grid[0].float(CONFIDENCE_FACTOR), Some(0.05));
        assert_eq!(grid[7].int(MIN_LEAF), Some(10));
        assert!(grid[8].flag(UNPRUNED));
        assert_eq!(grid[9].int(MIN_LEAF), Some(5));
    }

    #[test]
    fn test_forest_grid_uses_rounded_sqrt() {
        let grid = forest_grid(&[100, 200, 300], &[0, 10, 15], 13);
        assert_eq!(grid.len(), 18);
        assert_eq!(grid[0].int(NUM_FEATURES), Some(0));
        assert_eq!(grid[1].int(NUM_FEATURES), Some(4));
        assert_eq!(grid[17].int(NUM_TREES), Some(300));
        assert_eq!(grid[17].int(MAX_DEPTH), Some(15));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            tree_default().to_string(),
            "C=0.25 M=2 (confidence_factor=0.25, min_leaf=2)"
        );
    }
}
