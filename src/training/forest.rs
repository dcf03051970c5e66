//! Random forest learner
//!
//! Each member tree is grown unpruned on a bootstrap sample, looking at a
//! random subset of attributes at every split. Tree `i` draws from its own
//! ChaCha stream seeded with `seed + i`, so a forest is reproducible.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{PipelineError, Result};
use crate::pipeline::dataset::{Dataset, Record};
use crate::training::grid::{self, Configuration};
use crate::training::model::{Learner, Model};
use crate::training::tree::{GrowOptions, Grower, Node};

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct ForestLearner {
    pub num_trees: usize,
    /// 0 = unlimited
    pub max_depth: usize,
    /// Attributes tried per split; 0 = floor(log2(M)) + 1
    pub num_features: usize,
    pub seed: u64,
}

impl Default for ForestLearner {
    fn default() -> Self {
        Self {
            num_trees: 100,
            max_depth: 0,
            num_features: 0,
            seed: 1,
        }
    }
}

impl ForestLearner {
    /// Build from a tuning configuration; absent parameters keep their defaults.
    pub fn from_configuration(config: &Configuration, seed: u64) -> Result<Self> {
        let non_negative = |key: &str, default: usize| -> Result<usize> {
            match config.int(key) {
                Some(v) if v < 0 => Err(PipelineError::model_fit(
                    config.name.clone(),
                    format!("{} must not be negative, got {}", key, v),
                )),
                Some(v) => Ok(v as usize),
                None => Ok(default),
            }
        };
        let defaults = Self::default();
        let learner = Self {
            num_trees: non_negative(grid::NUM_TREES, defaults.num_trees)?,
            max_depth: non_negative(grid::MAX_DEPTH, defaults.max_depth)?,
            num_features: non_negative(grid::NUM_FEATURES, defaults.num_features)?,
            seed,
        };
        if learner.num_trees == 0 {
            return Err(PipelineError::model_fit(
                config.name.clone(),
                "a forest needs at least one tree",
            ));
        }
        Ok(learner)
    }

    /// Attributes sampled per split for `num_attributes` candidates
    pub fn features_per_split(&self, num_attributes: usize) -> usize {
        let k = if self.num_features == 0 {
            (num_attributes.max(1) as f64).log2().floor() as usize + 1
        } else {
            self.num_features
        };
        k.min(num_attributes).max(1)
    }
}

impl Learner for ForestLearner {
    fn describe(&self) -> String {
        format!(
            "forest(I={}, depth={}, K={})",
            self.num_trees, self.max_depth, self.num_features
        )
    }

    fn fit(&self, dataset: &Dataset) -> Result<Box<dyn Model>> {
        let candidates = dataset.num_attributes().saturating_sub(1);
        let options = GrowOptions {
            min_leaf: 1,
            max_depth: (self.max_depth > 0).then_some(self.max_depth),
            features_per_split: Some(self.features_per_split(candidates)),
        };
        let grower = Grower::new(dataset, options)?;
        let rows = grower.labeled_rows(dataset);
        if rows.is_empty() {
            return Err(PipelineError::model_fit(
                self.describe(),
                "no records with a known class",
            ));
        }

        let mut trees = Vec::with_capacity(self.num_trees);
        for tree_idx in 0..self.num_trees {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(tree_idx as u64));
            let sample: Vec<&Record> = (0..rows.len())
                .map(|_| rows[rng.gen_range(0..rows.len())])
                .collect();
            trees.push(grower.grow(&sample, 0, Some(&mut rng)));
        }

        Ok(Box::new(ForestModel {
            trees,
            num_classes: dataset.num_classes(),
            features_per_split: options.features_per_split.unwrap_or(candidates),
        }))
    }
}

/// A fitted forest; predictions average the member distributions
#[derive(Debug, Clone)]
pub struct ForestModel {
    trees: Vec<Node>,
    num_classes: usize,
    features_per_split: usize,
}

impl ForestModel {
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Model for ForestModel {
    fn distribution(&self, record: &Record) -> Vec<f64> {
        let mut sum = vec![0.0; self.num_classes];
        for tree in &self.trees {
            for (s, p) in sum.iter_mut().zip(tree.distribution(record)) {
                *s += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        sum.iter().map(|s| s / n).collect()
    }

    fn summary(&self) -> String {
        let n = self.trees.len().max(1) as f64;
        let mean_leaves = self.trees.iter().map(Node::num_leaves).sum::<usize>() as f64 / n;
        let max_depth = self.trees.iter().map(Node::depth).max().unwrap_or(0);
        format!(
            "Random forest of {} trees, each considering {} random attributes per split\n\
             Mean leaves per tree: {:.1}\nDeepest tree: {}",
            self.trees.len(),
            self.features_per_split,
            mean_leaves,
            max_depth
        )
    }
}
