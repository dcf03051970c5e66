//! Classifier capability traits
//!
//! The tuner and evaluator only see these two traits: a [`Learner`] turns a
//! dataset into a fitted [`Model`], and a model turns a record into a class
//! distribution.

use crate::error::Result;
use crate::pipeline::dataset::{Dataset, Record};

/// A fitted classifier
pub trait Model {
    /// Class probabilities for `record`, one entry per target label, summing to 1.
    fn distribution(&self, record: &Record) -> Vec<f64>;

    /// Most probable class; ties go to the lowest class code.
    fn predict(&self, record: &Record) -> usize {
        argmax(&self.distribution(record))
    }

    /// Human-readable description of the fitted model
    fn summary(&self) -> String;
}

/// Something that can be fit on a dataset with a nominal target
pub trait Learner {
    /// Short description including the hyperparameters, e.g. `tree(C=0.25, M=2)`
    fn describe(&self) -> String;

    fn fit(&self, dataset: &Dataset) -> Result<Box<dyn Model>>;
}

/// Index of the largest value, first one on ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}
