//! Decision tree learner
//!
//! Binary splits chosen by information gain: numeric attributes split on a
//! `<=` threshold, nominal attributes on `== label`. Grown trees are pruned
//! bottom-up by replacing a subtree with a leaf whenever the leaf's
//! pessimistic error estimate is no worse than the subtree's. The estimate is
//! the upper confidence limit of the binomial error rate at the configured
//! confidence factor, as in C4.5.

use std::fmt::Write as _;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::{PipelineError, Result};
use crate::pipeline::dataset::{Dataset, Record, Value};
use crate::training::grid::{self, Configuration};
use crate::training::model::{argmax, Learner, Model};

/// Minimum information gain for a split to be considered
const MIN_GAIN: f64 = 1e-10;

/// Tree learner hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLearner {
    pub confidence_factor: f64,
    pub min_leaf: usize,
    pub unpruned: bool,
}

impl Default for TreeLearner {
    fn default() -> Self {
        Self {
            confidence_factor: 0.25,
            min_leaf: 2,
            unpruned: false,
        }
    }
}

impl TreeLearner {
    /// Build from a tuning configuration; absent parameters keep their defaults.
    pub fn from_configuration(config: &Configuration) -> Result<Self> {
        let defaults = Self::default();
        let learner = Self {
            confidence_factor: config
                .float(grid::CONFIDENCE_FACTOR)
                .unwrap_or(defaults.confidence_factor),
            min_leaf: match config.int(grid::MIN_LEAF) {
                Some(m) if m < 1 => {
                    return Err(PipelineError::model_fit(
                        config.name.clone(),
                        format!("min_leaf must be at least 1, got {}", m),
                    ))
                }
                Some(m) => m as usize,
                None => defaults.min_leaf,
            },
            unpruned: config.flag(grid::UNPRUNED),
        };
        if !learner.unpruned
            && !(learner.confidence_factor > 0.0 && learner.confidence_factor <= 0.5)
        {
            return Err(PipelineError::model_fit(
                config.name.clone(),
                format!(
                    "confidence factor must be in (0, 0.5], got {}",
                    learner.confidence_factor
                ),
            ));
        }
        Ok(learner)
    }
}

impl Learner for TreeLearner {
    fn describe(&self) -> String {
        if self.unpruned {
            format!("tree(unpruned, M={})", self.min_leaf)
        } else {
            format!("tree(C={}, M={})", self.confidence_factor, self.min_leaf)
        }
    }

    fn fit(&self, dataset: &Dataset) -> Result<Box<dyn Model>> {
        let grower = Grower::new(
            dataset,
            GrowOptions {
                min_leaf: self.min_leaf,
                max_depth: None,
                features_per_split: None,
            },
        )?;

        let rows = grower.labeled_rows(dataset);
        let root = grower.grow(&rows, 0, None);
        let root = if self.unpruned {
            root
        } else {
            prune(root, self.confidence_factor).0
        };
        Ok(Box::new(TreeModel::new(dataset, root)))
    }
}

/// Split test at an internal node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitTest {
    /// Left when the numeric value is `<= threshold`
    Threshold { attribute: usize, threshold: f64 },
    /// Left when the nominal code equals `code`
    Equals { attribute: usize, code: usize },
}

impl SplitTest {
    fn attribute(&self) -> usize {
        match *self {
            SplitTest::Threshold { attribute, .. } | SplitTest::Equals { attribute, .. } => {
                attribute
            }
        }
    }

    /// `None` when the record has no usable value for the tested attribute
    fn goes_left(&self, record: &Record) -> Option<bool> {
        match (*self, record.value(self.attribute())) {
            (SplitTest::Threshold { threshold, .. }, Value::Numeric(v)) => Some(v <= threshold),
            (SplitTest::Equals { code, .. }, Value::Nominal(c)) => Some(c == code),
            _ => None,
        }
    }
}

/// Tree node; every node keeps the training class counts that reached it
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf {
        counts: Vec<f64>,
    },
    Split {
        test: SplitTest,
        left: Box<Node>,
        right: Box<Node>,
        /// Side taken by records missing the tested value (the larger child)
        missing_left: bool,
        counts: Vec<f64>,
    },
}

impl Node {
    fn counts(&self) -> &[f64] {
        match self {
            Node::Leaf { counts } | Node::Split { counts, .. } => counts,
        }
    }

    pub fn num_leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => left.num_leaves() + right.num_leaves(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => 1 + left.size() + right.size(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Class distribution of the leaf `record` falls into
    pub fn distribution(&self, record: &Record) -> Vec<f64> {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { counts } => return normalize(counts),
                Node::Split {
                    test,
                    left,
                    right,
                    missing_left,
                    ..
                } => {
                    let go_left = test.goes_left(record).unwrap_or(*missing_left);
                    node = if go_left { left.as_ref() } else { right.as_ref() };
                }
            }
        }
    }
}

fn normalize(counts: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    if total > 0.0 {
        counts.iter().map(|c| c / total).collect()
    } else {
        vec![1.0 / counts.len().max(1) as f64; counts.len()]
    }
}

fn entropy(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum()
}

/// Growth limits shared by single trees and forest members
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowOptions {
    pub min_leaf: usize,
    pub max_depth: Option<usize>,
    /// Attributes sampled per split; `None` tries them all
    pub features_per_split: Option<usize>,
}

/// Grows one tree over the rows of a dataset
pub(crate) struct Grower {
    target: usize,
    num_classes: usize,
    /// Candidate split attributes (everything but the target)
    candidates: Vec<usize>,
    nominal: Vec<bool>,
    options: GrowOptions,
}

/// Best split found for a node
struct SplitChoice {
    test: SplitTest,
    gain: f64,
}

impl Grower {
    pub fn new(dataset: &Dataset, options: GrowOptions) -> Result<Self> {
        let target = dataset.require_target()?;
        let num_classes = dataset.num_classes();
        if num_classes == 0 {
            return Err(PipelineError::InvalidSchema(
                "target attribute has no labels".into(),
            ));
        }
        let attributes = dataset.schema().attributes();
        Ok(Self {
            target,
            num_classes,
            candidates: (0..attributes.len()).filter(|&i| i != target).collect(),
            nominal: attributes.iter().map(|a| a.is_nominal()).collect(),
            options,
        })
    }

    /// Rows with a known class
    pub fn labeled_rows<'a>(&self, dataset: &'a Dataset) -> Vec<&'a Record> {
        dataset
            .records()
            .iter()
            .filter(|r| r.value(self.target).as_code().is_some())
            .collect()
    }

    fn class_of(&self, record: &Record) -> usize {
        record.value(self.target).as_code().unwrap_or(0)
    }

    fn class_counts(&self, rows: &[&Record]) -> Vec<f64> {
        let mut counts = vec![0.0; self.num_classes];
        for r in rows {
            counts[self.class_of(r)] += 1.0;
        }
        counts
    }

    /// Recursively grow a subtree. `rng` drives per-split attribute sampling.
    pub fn grow(&self, rows: &[&Record], depth: usize, mut rng: Option<&mut ChaCha8Rng>) -> Node {
        let counts = self.class_counts(rows);
        let pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
        let depth_reached = self.options.max_depth.is_some_and(|d| depth >= d);

        if pure || depth_reached || rows.len() < 2 * self.options.min_leaf {
            return Node::Leaf { counts };
        }

        let candidates: Vec<usize> = match (self.options.features_per_split, rng.as_deref_mut()) {
            (Some(k), Some(rng)) if k < self.candidates.len() => self
                .candidates
                .choose_multiple(rng, k)
                .copied()
                .collect(),
            _ => self.candidates.clone(),
        };

        let Some(choice) = self.best_split(rows, &candidates) else {
            return Node::Leaf { counts };
        };

        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        let mut unknown = Vec::new();
        for &r in rows {
            match choice.test.goes_left(r) {
                Some(true) => left_rows.push(r),
                Some(false) => right_rows.push(r),
                None => unknown.push(r),
            }
        }
        let missing_left = left_rows.len() >= right_rows.len();
        if missing_left {
            left_rows.extend(unknown);
        } else {
            right_rows.extend(unknown);
        }

        let left = self.grow(&left_rows, depth + 1, rng.as_deref_mut());
        let right = self.grow(&right_rows, depth + 1, rng);
        Node::Split {
            test: choice.test,
            left: Box::new(left),
            right: Box::new(right),
            missing_left,
            counts,
        }
    }

    fn best_split(&self, rows: &[&Record], candidates: &[usize]) -> Option<SplitChoice> {
        let mut best: Option<SplitChoice> = None;
        for &attribute in candidates {
            let choice = if self.nominal[attribute] {
                self.nominal_split(rows, attribute)
            } else {
                self.numeric_split(rows, attribute)
            };
            if let Some(choice) = choice {
                if best.as_ref().map_or(true, |b| choice.gain > b.gain) {
                    best = Some(choice);
                }
            }
        }
        best.filter(|b| b.gain > MIN_GAIN)
    }

    /// Information gain of a two-way partition of the known rows, scaled by the known fraction.
    fn gain(&self, left: &[f64], right: &[f64], known: f64, total: f64) -> f64 {
        let parent: Vec<f64> = left.iter().zip(right).map(|(l, r)| l + r).collect();
        let nl: f64 = left.iter().sum();
        let nr: f64 = right.iter().sum();
        let children = (nl * entropy(left) + nr * entropy(right)) / known;
        (entropy(&parent) - children) * known / total
    }

    fn numeric_split(&self, rows: &[&Record], attribute: usize) -> Option<SplitChoice> {
        let mut known: Vec<(f64, usize)> = rows
            .iter()
            .filter_map(|r| match r.value(attribute) {
                Value::Numeric(v) => Some((v, self.class_of(r))),
                _ => None,
            })
            .collect();
        let min_leaf = self.options.min_leaf;
        if known.len() < 2 * min_leaf {
            return None;
        }
        known.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n_known = known.len() as f64;
        let mut right = vec![0.0; self.num_classes];
        for &(_, c) in &known {
            right[c] += 1.0;
        }
        let mut left = vec![0.0; self.num_classes];

        let mut best: Option<SplitChoice> = None;
        for i in 0..known.len() - 1 {
            let (value, class) = known[i];
            left[class] += 1.0;
            right[class] -= 1.0;
            let next = known[i + 1].0;
            if value == next {
                continue;
            }
            let n_left = i + 1;
            if n_left < min_leaf || known.len() - n_left < min_leaf {
                continue;
            }
            let gain = self.gain(&left, &right, n_known, rows.len() as f64);
            if best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitChoice {
                    test: SplitTest::Threshold {
                        attribute,
                        threshold: (value + next) / 2.0,
                    },
                    gain,
                });
            }
        }
        best
    }

    fn nominal_split(&self, rows: &[&Record], attribute: usize) -> Option<SplitChoice> {
        let mut by_code: Vec<Vec<f64>> = Vec::new();
        let mut n_known = 0.0;
        for r in rows {
            if let Value::Nominal(code) = r.value(attribute) {
                if code >= by_code.len() {
                    by_code.resize(code + 1, vec![0.0; self.num_classes]);
                }
                by_code[code][self.class_of(r)] += 1.0;
                n_known += 1.0;
            }
        }
        let min_leaf = self.options.min_leaf as f64;
        let mut total = vec![0.0; self.num_classes];
        for counts in &by_code {
            for (t, c) in total.iter_mut().zip(counts) {
                *t += c;
            }
        }

        let mut best: Option<SplitChoice> = None;
        for (code, left) in by_code.iter().enumerate() {
            let n_left: f64 = left.iter().sum();
            if n_left < min_leaf || n_known - n_left < min_leaf {
                continue;
            }
            let right: Vec<f64> = total.iter().zip(left).map(|(t, l)| t - l).collect();
            let gain = self.gain(left, &right, n_known, rows.len() as f64);
            if best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitChoice {
                    test: SplitTest::Equals { attribute, code },
                    gain,
                });
            }
        }
        best
    }
}

/// Replace subtrees by leaves bottom-up; returns the node and its estimated errors.
pub fn prune(node: Node, confidence: f64) -> (Node, f64) {
    match node {
        Node::Leaf { counts } => {
            let errors = leaf_errors(&counts, confidence);
            (Node::Leaf { counts }, errors)
        }
        Node::Split {
            test,
            left,
            right,
            missing_left,
            counts,
        } => {
            let (left, left_errors) = prune(*left, confidence);
            let (right, right_errors) = prune(*right, confidence);
            let subtree_errors = left_errors + right_errors;
            let as_leaf = leaf_errors(&counts, confidence);
            if as_leaf <= subtree_errors + 0.1 {
                (Node::Leaf { counts }, as_leaf)
            } else {
                (
                    Node::Split {
                        test,
                        left: Box::new(left),
                        right: Box::new(right),
                        missing_left,
                        counts,
                    },
                    subtree_errors,
                )
            }
        }
    }
}

/// Observed plus pessimistic extra errors if a node became a leaf.
fn leaf_errors(counts: &[f64], confidence: f64) -> f64 {
    let n: f64 = counts.iter().sum();
    if n <= 0.0 {
        return 0.0;
    }
    let majority = counts.iter().copied().fold(0.0, f64::max);
    let errors = n - majority;
    errors + added_errors(n, errors, confidence)
}

/// Extra errors implied by the upper confidence limit of the binomial error
/// rate, given `errors` observed errors out of `n`.
pub fn added_errors(n: f64, errors: f64, confidence: f64) -> f64 {
    if errors < 1.0 {
        let base = n * (1.0 - confidence.powf(1.0 / n));
        if errors == 0.0 {
            return base;
        }
        return base + errors * (added_errors(n, 1.0, confidence) - base);
    }
    if errors + 0.5 >= n {
        return (n - errors).max(0.0);
    }
    let z = normal_quantile(1.0 - confidence);
    let f = (errors + 0.5) / n;
    let z2 = z * z;
    let upper = (f + z2 / (2.0 * n) + z * (f / n - f * f / n + z2 / (4.0 * n * n)).sqrt())
        / (1.0 + z2 / n);
    upper * n - errors
}

/// Inverse of the standard normal CDF (Acklam's rational approximation).
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838,
        -2.549732539343734,
        4.374664141464968,
        2.938163982698783,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996,
        3.754408661907416,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// A fitted decision tree
#[derive(Debug, Clone)]
pub struct TreeModel {
    root: Node,
    attribute_names: Vec<String>,
    /// Domains of every attribute (empty for numeric ones)
    domains: Vec<Vec<String>>,
    class_labels: Vec<String>,
}

impl TreeModel {
    fn new(dataset: &Dataset, root: Node) -> Self {
        let attributes = dataset.schema().attributes();
        Self {
            root,
            attribute_names: attributes.iter().map(|a| a.name.clone()).collect(),
            domains: attributes.iter().map(|a| a.domain.clone()).collect(),
            class_labels: dataset
                .schema()
                .target_attribute()
                .map(|a| a.domain.clone())
                .unwrap_or_default(),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Indented text rendering, one line per test
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(&self.root, 0, &mut out);
        out
    }

    fn leaf_text(&self, counts: &[f64]) -> String {
        let total: f64 = counts.iter().sum();
        let class = argmax(counts);
        let label = self
            .class_labels
            .get(class)
            .map(String::as_str)
            .unwrap_or("?");
        let errors = total - counts.get(class).copied().unwrap_or(0.0);
        if errors > 0.0 {
            format!("{} ({}/{})", label, total, errors)
        } else {
            format!("{} ({})", label, total)
        }
    }

    fn render_node(&self, node: &Node, depth: usize, out: &mut String) {
        let Node::Split {
            test, left, right, ..
        } = node
        else {
            let _ = write!(out, ": {}", self.leaf_text(node.counts()));
            return;
        };

        let (left_text, right_text) = match *test {
            SplitTest::Threshold {
                attribute,
                threshold,
            } => {
                let name = &self.attribute_names[attribute];
                (
                    format!("{} <= {:.4}", name, threshold),
                    format!("{} > {:.4}", name, threshold),
                )
            }
            SplitTest::Equals { attribute, code } => {
                let name = &self.attribute_names[attribute];
                let label = self.domains[attribute]
                    .get(code)
                    .map(String::as_str)
                    .unwrap_or("?");
                (
                    format!("{} = {}", name, label),
                    format!("{} != {}", name, label),
                )
            }
        };

        for (text, child) in [(left_text, left), (right_text, right)] {
            let _ = write!(out, "\n{}{}", "|   ".repeat(depth), text);
            match child.as_ref() {
                Node::Leaf { counts } => {
                    let _ = write!(out, ": {}", self.leaf_text(counts));
                }
                split => self.render_node(split, depth + 1, out),
            }
        }
    }
}

impl Model for TreeModel {
    fn distribution(&self, record: &Record) -> Vec<f64> {
        self.root.distribution(record)
    }

    fn summary(&self) -> String {
        format!(
            "Decision tree\n{}\n\nNumber of leaves: {}\nSize of the tree: {}",
            self.render().trim_start(),
            self.root.num_leaves(),
            self.root.size()
        )
    }
}
