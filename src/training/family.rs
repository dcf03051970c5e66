//! Classifier families
//!
//! A family bundles a search grid, a default configuration and a way to build
//! learners, and shares the preprocess / train / results workflow through the
//! [`ModelFamily`] trait.

use std::fmt::Write as _;

use crate::error::Result;
use crate::pipeline::dataset::Dataset;
use crate::pipeline::selection::{select_features, SelectionOptions};
use crate::training::forest::ForestLearner;
use crate::training::grid::{self, Configuration};
use crate::training::model::{Learner, Model};
use crate::training::tree::TreeLearner;
use crate::training::tuner::{tune, TunedModel, TuningCandidate, TuningOptions, TuningResult};

/// Shared capability set of the classifier families
pub trait ModelFamily {
    /// Display name, also used as the model label in the history
    fn name(&self) -> &'static str;

    /// Configurations searched for `dataset`
    fn grid(&self, dataset: &Dataset) -> Vec<Configuration>;

    fn default_configuration(&self) -> Configuration;

    /// Folds used while scoring grid candidates
    fn tuning_folds(&self) -> usize;

    fn build(&self, configuration: &Configuration) -> Result<Box<dyn Learner>>;

    fn selection_options(&self) -> SelectionOptions {
        SelectionOptions::default()
    }

    /// Restrict `dataset` to the attributes chosen by the feature selector
    fn apply_feature_selection(&self, dataset: &Dataset) -> Result<Dataset> {
        select_features(dataset, &self.selection_options())
    }

    /// Validate the target and optionally apply feature selection
    fn preprocess(&self, dataset: &Dataset, with_selection: bool) -> Result<Dataset> {
        dataset.require_target()?;
        if with_selection {
            self.apply_feature_selection(dataset)
        } else {
            Ok(dataset.clone())
        }
    }

    /// Tune over the grid and refit the best configuration
    fn train(
        &self,
        dataset: &Dataset,
        seed: u64,
        on_candidate: &mut dyn FnMut(&TuningCandidate),
    ) -> Result<TrainedClassifier> {
        let options = TuningOptions {
            folds: self.tuning_folds(),
            seed,
        };
        let grid = self.grid(dataset);
        let tuned = tune(
            dataset,
            &grid,
            &self.default_configuration(),
            &options,
            |c| self.build(c),
            |c| on_candidate(c),
        )?;
        Ok(TrainedClassifier::new(self.name(), tuned))
    }
}

/// Outcome of [`ModelFamily::train`]
pub struct TrainedClassifier {
    family: &'static str,
    tuned: TunedModel,
}

impl TrainedClassifier {
    fn new(family: &'static str, tuned: TunedModel) -> Self {
        Self { family, tuned }
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn tuning(&self) -> &TuningResult {
        &self.tuned.result
    }

    /// Final model fit on the whole dataset
    pub fn classifier(&self) -> &dyn Model {
        self.tuned.model.as_ref()
    }

    /// Learner configured with the chosen hyperparameters
    pub fn learner(&self) -> &dyn Learner {
        self.tuned.learner.as_ref()
    }

    /// Text summary of the tuning outcome and the fitted model
    pub fn results(&self) -> String {
        let result = &self.tuned.result;
        let mut out = String::new();
        let _ = writeln!(out, "{} - best configuration: {}", self.family, result.configuration);
        match result.best_score() {
            Some(score) => {
                let _ = writeln!(out, "Best CV weighted F1: {:.4}", score);
            }
            None => {
                let _ = writeln!(out, "No grid candidate scored; default configuration used");
            }
        }
        let _ = writeln!(
            out,
            "Candidates: {} evaluated, {} failed ({}-fold CV, seed {})",
            result.candidates.len(),
            result.failed(),
            result.folds,
            result.seed
        );
        out.push('\n');
        out.push_str(&self.tuned.model.summary());
        out
    }
}

/// Pruned/unpruned decision trees
#[derive(Debug, Clone)]
pub struct TreeFamily {
    pub tuning_folds: usize,
    pub selection: SelectionOptions,
}

impl Default for TreeFamily {
    fn default() -> Self {
        Self {
            tuning_folds: 10,
            selection: SelectionOptions::default(),
        }
    }
}

impl ModelFamily for TreeFamily {
    fn name(&self) -> &'static str {
        "DecisionTree"
    }

    fn grid(&self, _dataset: &Dataset) -> Vec<Configuration> {
        grid::tree_grid()
    }

    fn default_configuration(&self) -> Configuration {
        grid::tree_default()
    }

    fn tuning_folds(&self) -> usize {
        self.tuning_folds
    }

    fn build(&self, configuration: &Configuration) -> Result<Box<dyn Learner>> {
        Ok(Box::new(TreeLearner::from_configuration(configuration)?))
    }

    fn selection_options(&self) -> SelectionOptions {
        self.selection
    }
}

/// Bagged random trees
#[derive(Debug, Clone)]
pub struct ForestFamily {
    pub tuning_folds: usize,
    pub trees: Vec<usize>,
    pub depths: Vec<usize>,
    /// Seed of the bootstrap and attribute sampling
    pub seed: u64,
    pub selection: SelectionOptions,
}

impl Default for ForestFamily {
    fn default() -> Self {
        Self {
            tuning_folds: 5,
            trees: vec![100, 200, 300],
            depths: vec![0, 10, 15],
            seed: 1,
            selection: SelectionOptions::default(),
        }
    }
}

impl ModelFamily for ForestFamily {
    fn name(&self) -> &'static str {
        "RandomForest"
    }

    fn grid(&self, dataset: &Dataset) -> Vec<Configuration> {
        let features = dataset.num_attributes().saturating_sub(1);
        grid::forest_grid(&self.trees, &self.depths, features)
    }

    fn default_configuration(&self) -> Configuration {
        grid::forest_default()
    }

    fn tuning_folds(&self) -> usize {
        self.tuning_folds
    }

    fn build(&self, configuration: &Configuration) -> Result<Box<dyn Learner>> {
        Ok(Box::new(ForestLearner::from_configuration(
            configuration,
            self.seed,
        )?))
    }

    fn selection_options(&self) -> SelectionOptions {
        self.selection
    }
}
