//! Tests for cross-validated evaluation, the run history and model comparison

use cardiomine::evaluation::compare::ComparedMetric;
use cardiomine::evaluation::{
    auc_grade, compare, compare_all_stages, compare_stages, find_record, stratified_folds,
    EvaluationRecord, Evaluator, RunLabel, Stage,
};
use cardiomine::training::forest::ForestLearner;
use cardiomine::training::tree::TreeLearner;
use cardiomine::training::Learner;
use cardiomine::PipelineError;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn evaluated(model: &str, stage: Stage) -> EvaluationRecord {
    let dataset = heart_dataset(40, 30, 31);
    let mut evaluator = Evaluator::new(5, 1);
    evaluator
        .evaluate(RunLabel::new(model, stage), &TreeLearner::default(), &dataset)
        .unwrap()
        .clone()
}

/// Copy of `record` relabeled and with the compared metrics overwritten
fn with_metrics(
    record: &EvaluationRecord,
    model: &str,
    stage: Stage,
    accuracy: f64,
    recall: f64,
    f1: f64,
    auc: Option<f64>,
) -> EvaluationRecord {
    let mut record = record.clone();
    record.label = RunLabel::new(model, stage);
    record.metrics.accuracy = accuracy;
    let positive = record.metrics.positive.as_mut().unwrap();
    positive.recall = recall;
    positive.f1 = f1;
    positive.auc = auc;
    record
}

#[test]
fn test_folds_are_stratified_and_cover_every_record() {
    let dataset = heart_dataset(60, 30, 2);
    let folds = stratified_folds(&dataset, 10, 1).unwrap();
    assert_eq!(folds.len(), 10);

    let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..dataset.len()).collect::<Vec<_>>());

    for fold in &folds {
        assert_eq!(fold.train.len() + fold.test.len(), dataset.len());
        let positives = fold
            .test
            .iter()
            .filter(|&&i| dataset.records()[i].value(5).as_code() == Some(1))
            .count();
        assert_eq!(positives, 3);
    }
}

#[test]
fn test_fold_count_is_capped_by_record_count() {
    let dataset = heart_dataset(2, 2, 4);
    assert_eq!(stratified_folds(&dataset, 10, 1).unwrap().len(), 4);

    let single = heart_dataset(1, 0, 4);
    assert!(matches!(
        stratified_folds(&single, 10, 1),
        Err(PipelineError::InvalidSchema(_))
    ));
}

#[test]
fn test_evaluation_record_is_consistent() {
    let dataset = heart_dataset(50, 40, 6);
    let mut evaluator = Evaluator::new(5, 3);
    let record = evaluator
        .evaluate(
            RunLabel::new("DecisionTree", Stage::Improved),
            &TreeLearner::default(),
            &dataset,
        )
        .unwrap();

    assert_eq!(record.metrics.instances, 90);
    assert_eq!(record.confusion.total(), 90);
    assert_eq!(record.confusion.row_total(0), 50);
    assert_eq!(record.confusion.row_total(1), 40);
    assert_eq!(record.folds, 5);
    assert_eq!(record.seed, 3);
    assert_eq!(record.dataset.instances, 90);

    let m = &record.metrics;
    for value in [m.accuracy, m.weighted_precision, m.weighted_recall, m.weighted_f1] {
        assert!((0.0..=1.0).contains(&value));
    }
    let positive = m.positive.as_ref().unwrap();
    assert_eq!(positive.label, "1");
    assert!(positive.auc.is_some());
    assert!(m.accuracy > 0.6, "accuracy {}", m.accuracy);
}

#[test]
fn test_evaluation_is_reproducible() {
    let dataset = heart_dataset(40, 40, 8);
    let learner = ForestLearner {
        num_trees: 5,
        ..ForestLearner::default()
    };
    let mut a = Evaluator::new(4, 9);
    let mut b = Evaluator::new(4, 9);
    let first = a
        .evaluate(RunLabel::new("RandomForest", Stage::Raw), &learner, &dataset)
        .unwrap()
        .clone();
    let second = b
        .evaluate(RunLabel::new("RandomForest", Stage::Raw), &learner, &dataset)
        .unwrap();

    assert_eq!(first.confusion, second.confusion);
    assert_eq!(first.metrics, second.metrics);
}

#[test]
fn test_auc_is_undefined_for_a_single_class() {
    let dataset = heart_dataset(30, 0, 10);
    let mut evaluator = Evaluator::new(3, 1);
    let record = evaluator
        .evaluate(
            RunLabel::new("DecisionTree", Stage::Raw),
            &TreeLearner::default(),
            &dataset,
        )
        .unwrap();

    assert_eq!(record.metrics.accuracy, 1.0);
    assert!(record.metrics.positive.as_ref().unwrap().auc.is_none());
}

#[test]
fn test_history_keeps_order_and_finds_latest() {
    let dataset = heart_dataset(30, 30, 12);
    let mut evaluator = Evaluator::new(3, 1);
    let tree = TreeLearner::default();
    let unpruned = TreeLearner {
        unpruned: true,
        ..TreeLearner::default()
    };

    evaluator
        .evaluate(RunLabel::new("DecisionTree", Stage::Raw), &tree, &dataset)
        .unwrap();
    evaluator
        .evaluate(RunLabel::new("DecisionTree", Stage::Improved), &tree, &dataset)
        .unwrap();
    evaluator
        .evaluate(RunLabel::new("DecisionTree", Stage::Raw), &unpruned, &dataset)
        .unwrap();

    let history = evaluator.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].label.stage, Stage::Improved);

    let latest = find_record(history, "DecisionTree", Stage::Raw).unwrap();
    assert_eq!(latest.learner, unpruned.describe());
    assert!(find_record(history, "RandomForest", Stage::Raw).is_none());
}

#[test]
fn test_missing_target_is_rejected_before_fitting() {
    let dataset = heart_dataset(10, 10, 14);
    let schema = dataset.schema().with_target(None).unwrap();
    let untargeted =
        cardiomine::pipeline::Dataset::new(schema, dataset.records().to_vec()).unwrap();

    let mut evaluator = Evaluator::new(3, 1);
    let result = evaluator.evaluate(
        RunLabel::new("DecisionTree", Stage::Raw),
        &TreeLearner::default(),
        &untargeted,
    );
    assert!(matches!(result, Err(PipelineError::InvalidSchema(_))));
    assert!(evaluator.history().is_empty());
}

#[test]
fn test_compare_counts_wins_per_metric() {
    let base = evaluated("base", Stage::Improved);
    let history = vec![
        with_metrics(&base, "RandomForest", Stage::Improved, 0.90, 0.80, 0.85, Some(0.95)),
        with_metrics(&base, "DecisionTree", Stage::Improved, 0.85, 0.88, 0.80, Some(0.85)),
    ];

    let report = compare(&history);

    assert_eq!(report.winners.len(), 4);
    assert_eq!(report.wins, vec![3, 1]);
    assert_eq!(report.overall, Some(0));
    let recall = report
        .winners
        .iter()
        .find(|w| w.metric == ComparedMetric::PositiveRecall)
        .unwrap();
    assert_eq!(recall.index, 1);
}

#[test]
fn test_compare_ties_go_to_the_first_record() {
    let base = evaluated("base", Stage::Improved);
    let history = vec![
        with_metrics(&base, "A", Stage::Improved, 0.8, 0.7, 0.75, None),
        with_metrics(&base, "B", Stage::Improved, 0.8, 0.7, 0.75, None),
    ];

    let report = compare(&history);

    // AUC is unavailable everywhere and has no winner
    assert_eq!(report.winners.len(), 3);
    assert!(report.winners.iter().all(|w| w.index == 0));
    assert_eq!(report.overall, Some(0));
}

#[test]
fn test_compare_empty_history() {
    let report = compare(&[]);
    assert!(report.winners.is_empty());
    assert!(report.overall.is_none());
}

#[test]
fn test_stage_comparison_deltas() {
    let base = evaluated("base", Stage::Raw);
    let history = vec![
        with_metrics(&base, "DecisionTree", Stage::Raw, 0.70, 0.60, 0.65, Some(0.72)),
        with_metrics(&base, "DecisionTree", Stage::Improved, 0.80, 0.75, 0.78, Some(0.81)),
    ];

    let comparison =
        compare_stages(&history, "DecisionTree", Stage::Raw, Stage::Improved).unwrap();

    assert_eq!(comparison.model, "DecisionTree");
    let accuracy = comparison.deltas[0].delta().unwrap();
    assert!((accuracy - 0.10).abs() < 1e-9);
    let auc = comparison.deltas[3].delta().unwrap();
    assert!((auc - 0.09).abs() < 1e-9);
}

#[test]
fn test_stage_comparison_requires_both_stages() {
    let base = evaluated("base", Stage::Improved);
    let history = vec![with_metrics(
        &base,
        "RandomForest",
        Stage::Improved,
        0.9,
        0.9,
        0.9,
        Some(0.9),
    )];

    let result = compare_stages(&history, "RandomForest", Stage::Raw, Stage::Improved);
    assert!(matches!(
        result,
        Err(PipelineError::ComparisonPrecondition(_))
    ));

    // The incomplete model is skipped, not fatal
    assert!(compare_all_stages(&history, &["RandomForest", "DecisionTree"]).is_empty());
}

#[test]
fn test_auc_grades() {
    assert_eq!(auc_grade(0.95), "Excellent");
    assert_eq!(auc_grade(0.9), "Excellent");
    assert_eq!(auc_grade(0.85), "Good");
    assert_eq!(auc_grade(0.7), "Fair");
    assert_eq!(auc_grade(0.5), "Poor");
}
