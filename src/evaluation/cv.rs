//! Seeded, stratified k-fold cross-validation
//!
//! Fold membership depends only on the dataset and the seed: records are
//! shuffled with a ChaCha stream, grouped by class, then dealt round-robin
//! into the folds. Every candidate evaluated with the same seed therefore
//! sees exactly the same folds.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::pipeline::dataset::Dataset;
use crate::training::model::Learner;

/// One train/test split, as record indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Assign records to `k` stratified folds (fewer if there are fewer records).
pub fn stratified_folds(dataset: &Dataset, k: usize, seed: u64) -> Result<Vec<Fold>> {
    let target = dataset.require_target()?;
    let n = dataset.len();
    let k = k.min(n);
    if k < 2 {
        return Err(PipelineError::InvalidSchema(format!(
            "cross-validation needs at least 2 folds, got {} for {} records",
            k, n
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    // Stable sort keeps the shuffled order within each class; unknown classes go last
    order.sort_by_key(|&i| {
        dataset.records()[i]
            .value(target)
            .as_code()
            .unwrap_or(usize::MAX)
    });

    let mut membership = vec![0usize; n];
    for (position, &record) in order.iter().enumerate() {
        membership[record] = position % k;
    }

    Ok((0..k)
        .map(|index| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..n).partition(|&i| membership[i] == index);
            Fold { index, train, test }
        })
        .collect())
}

/// Pooled out-of-fold predictions
#[derive(Debug, Clone, PartialEq)]
pub struct CvPredictions {
    pub num_classes: usize,
    /// Actual class of every scored record
    pub actual: Vec<usize>,
    /// Predicted class distribution of every scored record
    pub distributions: Vec<Vec<f64>>,
    pub folds: usize,
}

impl CvPredictions {
    pub fn len(&self) -> usize {
        self.actual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actual.is_empty()
    }
}

/// Fit on each training split and predict the held-out records, in fold order.
///
/// Records with an unknown class are never scored.
pub fn cross_validate(
    learner: &dyn Learner,
    dataset: &Dataset,
    k: usize,
    seed: u64,
) -> Result<CvPredictions> {
    let folds = stratified_folds(dataset, k, seed)?;
    let mut predictions = CvPredictions {
        num_classes: dataset.num_classes(),
        actual: Vec::with_capacity(dataset.len()),
        distributions: Vec::with_capacity(dataset.len()),
        folds: folds.len(),
    };

    for fold in &folds {
        let model = learner.fit(&dataset.subset(&fold.train))?;
        let mut scored = 0;
        for &i in &fold.test {
            let record = &dataset.records()[i];
            if let Some(class) = dataset.class_of(record) {
                predictions.actual.push(class);
                predictions.distributions.push(model.distribution(record));
                scored += 1;
            }
        }
        debug!(
            fold = fold.index,
            train = fold.train.len(),
            scored,
            model = %learner.describe(),
            "fold evaluated"
        );
    }

    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::dataset::{Attribute, Record, Schema, Value};

    fn dataset(classes: &[usize]) -> Dataset {
        let schema = Schema::new(
            "t",
            vec![
                Attribute::numeric("x"),
                Attribute::nominal("y", vec!["a".into(), "b".into()]),
            ],
            Some(1),
        )
        .unwrap();
        let records = classes
            .iter()
            .enumerate()
            .map(|(i, &c)| Record::new(vec![Value::Numeric(i as f64), Value::Nominal(c)]))
            .collect();
        Dataset::new(schema, records).unwrap()
    }

    #[test]
    fn test_folds_partition_records() {
        let ds = dataset(&[0, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
        let folds = stratified_folds(&ds, 3, 1).unwrap();
        assert_eq!(folds.len(), 3);

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 10);
        }
    }

    #[test]
    fn test_folds_are_stratified() {
        let ds = dataset(&[0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1]);
        for fold in stratified_folds(&ds, 3, 7).unwrap() {
            let positives = fold.test.iter().filter(|&&i| i >= 6).count();
            assert_eq!(positives, 2);
        }
    }

    #[test]
    fn test_same_seed_same_folds() {
        let ds = dataset(&[0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(
            stratified_folds(&ds, 4, 42).unwrap(),
            stratified_folds(&ds, 4, 42).unwrap()
        );
    }

    #[test]
    fn test_fold_count_capped_by_records() {
        let ds = dataset(&[0, 1, 1]);
        assert_eq!(stratified_folds(&ds, 10, 1).unwrap().len(), 3);
        assert!(stratified_folds(&dataset(&[0]), 10, 1).is_err());
    }
}
