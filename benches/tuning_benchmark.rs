//! Benchmarks for cross-validation, SMOTE and feature subset search
//!
//! Run with: cargo bench --bench tuning_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use cardiomine::evaluation::cross_validate;
use cardiomine::pipeline::{
    balance, select_features, Attribute, BalanceOptions, Dataset, Record, Schema,
    SelectionOptions, Value,
};
use cardiomine::training::forest::ForestLearner;
use cardiomine::training::tree::TreeLearner;

/// Synthetic heart-like data: 30% positives, a third of the features tied to the class
fn generate_test_dataset(n_rows: usize, n_features: usize, seed: u64) -> Dataset {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let mut attributes: Vec<Attribute> = (0..n_features)
        .map(|i| Attribute::numeric(format!("feature_{}", i)))
        .collect();
    attributes.push(Attribute::nominal(
        "num",
        vec!["0".to_string(), "1".to_string()],
    ));
    let schema = Schema::new("bench", attributes, Some(n_features)).expect("valid schema");

    let records = (0..n_rows)
        .map(|_| {
            let class = usize::from(rng.gen::<f64>() > 0.7);
            let mut values: Vec<Value> = (0..n_features)
                .map(|i| {
                    let v = if i % 3 == 2 {
                        // Correlated with the class
                        let base = if class == 1 { 70.0 } else { 30.0 };
                        base + rng.gen::<f64>() * 20.0 - 10.0
                    } else {
                        rng.gen::<f64>() * 100.0
                    };
                    Value::Numeric(v)
                })
                .collect();
            values.push(Value::Nominal(class));
            Record::new(values)
        })
        .collect();

    Dataset::new(schema, records).expect("valid dataset")
}

/// Ten-fold cross-validation of the default tree and a small forest
fn benchmark_cross_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_validation");
    group.sample_size(10);

    for (n_rows, n_features) in [(300, 13), (1_000, 13), (1_000, 30)] {
        let dataset = generate_test_dataset(n_rows, n_features, 42);
        group.throughput(Throughput::Elements(n_rows as u64));
        let id = format!("{}x{}", n_rows, n_features);

        group.bench_with_input(BenchmarkId::new("tree", &id), &dataset, |b, dataset| {
            let learner = TreeLearner::default();
            b.iter(|| cross_validate(black_box(&learner), black_box(dataset), 10, 1))
        });

        group.bench_with_input(BenchmarkId::new("forest_20", &id), &dataset, |b, dataset| {
            let learner = ForestLearner {
                num_trees: 20,
                ..ForestLearner::default()
            };
            b.iter(|| cross_validate(black_box(&learner), black_box(dataset), 10, 1))
        });
    }

    group.finish();
}

/// SMOTE oversampling and CFS best-first search
fn benchmark_improvement(c: &mut Criterion) {
    let mut group = c.benchmark_group("improvement");

    for n_rows in [300, 3_000] {
        let dataset = generate_test_dataset(n_rows, 13, 7);

        group.bench_with_input(BenchmarkId::new("smote", n_rows), &dataset, |b, dataset| {
            b.iter(|| balance(black_box(dataset), &BalanceOptions::default()))
        });

        group.bench_with_input(
            BenchmarkId::new("select_features", n_rows),
            &dataset,
            |b, dataset| b.iter(|| select_features(black_box(dataset), &SelectionOptions::default())),
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_cross_validation, benchmark_improvement);
criterion_main!(benches);
