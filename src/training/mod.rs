//! Training module - learners, classifier families and hyperparameter tuning

pub mod family;
pub mod forest;
pub mod grid;
pub mod model;
pub mod tree;
pub mod tuner;

pub use family::{ForestFamily, ModelFamily, TrainedClassifier, TreeFamily};
pub use grid::{Configuration, ParamValue};
pub use model::{Learner, Model};
pub use tuner::{tune, CandidateOutcome, TuningCandidate, TuningOptions, TuningResult};
