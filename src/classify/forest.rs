//! Random forest for independent per-line classification.
//!
//! Each tree is grown on a bootstrap sample with Gini splits over a random
//! subset of features; predictions average the trees' class distributions.
//! Trees are built in parallel, each from its own seeded generator, so a
//! given seed always yields the same forest.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Options for growing a forest.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestOptions {
    /// Number of trees
    pub n_trees: usize,

    /// Maximum tree depth (None = grow until leaves are pure)
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node
    pub min_samples_split: usize,

    /// Features examined per split (None = square root of the feature count)
    pub max_features: Option<usize>,

    /// Weight classes inversely to their frequency
    pub balanced: bool,

    /// Random seed
    pub seed: u64,
}

impl ForestOptions {
    /// Create new forest options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of trees.
    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees.max(1);
        self
    }

    /// Limit tree depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set features examined per split.
    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = Some(n.max(1));
        self
    }

    /// Enable or disable balanced class weights.
    pub fn with_balanced(mut self, balanced: bool) -> Self {
        self.balanced = balanced;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            balanced: true,
            seed: 42,
        }
    }
}

/// A trained random forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Training data shared by all trees.
struct TrainData<'a> {
    rows: &'a [&'a [f64]],
    targets: &'a [usize],
    weights: Vec<f64>,
    n_features: usize,
    n_classes: usize,
}

struct Split {
    feature: usize,
    threshold: f64,
}

impl RandomForest {
    /// Grow a forest.
    ///
    /// `rows` must be non-empty and all of equal length; every target must be
    /// below `n_classes`. The caller validates both.
    pub fn fit(
        rows: &[&[f64]],
        targets: &[usize],
        n_classes: usize,
        options: &ForestOptions,
    ) -> Self {
        let n_features = rows.first().map(|r| r.len()).unwrap_or(0);
        let data = TrainData {
            rows,
            targets,
            weights: class_weights(targets, n_classes, options.balanced),
            n_features,
            n_classes,
        };

        let trees = (0..options.n_trees.max(1))
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(i as u64));
                data.grow_tree(options, &mut rng)
            })
            .collect();

        Self {
            n_features,
            n_classes,
            trees,
        }
    }

    /// Averaged class distribution for one row.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut total = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (sum, p) in total.iter_mut().zip(tree.distribution(row)) {
                *sum += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        total.iter_mut().for_each(|p| *p /= n);
        total
    }

    /// Most probable class for one row; ties go to the lowest index.
    pub fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba(row))
    }

    /// Number of input features.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Check node references after deserialization.
    ///
    /// Children always come after their parent, which also rules out cycles.
    pub(crate) fn is_consistent(&self) -> bool {
        self.trees.iter().all(|tree| {
            !tree.nodes.is_empty()
                && tree.nodes.iter().enumerate().all(|(id, node)| match node {
                    Node::Leaf { distribution } => distribution.len() == self.n_classes,
                    Node::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        let valid = |child: usize| child > id && child < tree.nodes.len();
                        *feature < self.n_features && valid(*left) && valid(*right)
                    }
                })
        })
    }
}

impl DecisionTree {
    fn distribution(&self, row: &[f64]) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

impl TrainData<'_> {
    fn grow_tree(&self, options: &ForestOptions, rng: &mut StdRng) -> DecisionTree {
        let n = self.rows.len();
        let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        let max_features = options
            .max_features
            .unwrap_or_else(|| (self.n_features as f64).sqrt().floor() as usize)
            .clamp(1, self.n_features.max(1));

        let mut nodes = vec![Node::Leaf {
            distribution: Vec::new(),
        }];
        let mut stack = vec![(0usize, sample, 0usize)];

        while let Some((id, indices, depth)) = stack.pop() {
            let counts = self.class_totals(&indices);
            let pure = counts.iter().filter(|w| **w > 0.0).count() <= 1;
            let splittable = !pure
                && indices.len() >= options.min_samples_split
                && options.max_depth.map_or(true, |max| depth < max);

            let split = if splittable {
                self.best_split(&indices, &counts, max_features, rng)
            } else {
                None
            };

            match split {
                Some(split) => {
                    let (left, right): (Vec<usize>, Vec<usize>) = indices
                        .into_iter()
                        .partition(|&i| self.rows[i][split.feature] <= split.threshold);
                    let left_id = nodes.len();
                    let right_id = left_id + 1;
                    nodes.push(Node::Leaf {
                        distribution: Vec::new(),
                    });
                    nodes.push(Node::Leaf {
                        distribution: Vec::new(),
                    });
                    nodes[id] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left: left_id,
                        right: right_id,
                    };
                    stack.push((right_id, right, depth + 1));
                    stack.push((left_id, left, depth + 1));
                }
                None => {
                    let total: f64 = counts.iter().sum();
                    let distribution = if total > 0.0 {
                        counts.iter().map(|w| w / total).collect()
                    } else {
                        counts
                    };
                    nodes[id] = Node::Leaf { distribution };
                }
            }
        }

        DecisionTree { nodes }
    }

    fn class_totals(&self, indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[self.targets[i]] += self.weights[i];
        }
        counts
    }

    /// Best Gini split among a random feature subset.
    ///
    /// Keeps drawing features past `max_features` until a valid split turns up.
    fn best_split(
        &self,
        indices: &[usize],
        counts: &[f64],
        max_features: usize,
        rng: &mut StdRng,
    ) -> Option<Split> {
        let total: f64 = counts.iter().sum();
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);

        let mut best: Option<(f64, Split)> = None;
        let mut sorted = indices.to_vec();
        let mut left = vec![0.0; self.n_classes];

        for (visited, &feature) in features.iter().enumerate() {
            if visited >= max_features && best.is_some() {
                break;
            }

            sorted.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));
            left.iter_mut().for_each(|w| *w = 0.0);
            let mut left_total = 0.0;

            for pos in 0..sorted.len().saturating_sub(1) {
                let i = sorted[pos];
                left[self.targets[i]] += self.weights[i];
                left_total += self.weights[i];

                let here = self.rows[i][feature];
                let next = self.rows[sorted[pos + 1]][feature];
                if here >= next {
                    continue;
                }

                let right_total = total - left_total;
                let left_sq: f64 = left.iter().map(|w| w * w).sum();
                let right_sq: f64 = counts
                    .iter()
                    .zip(&left)
                    .map(|(c, l)| (c - l) * (c - l))
                    .sum();
                // Maximizing this is equivalent to minimizing weighted child Gini.
                let score = left_sq / left_total + right_sq / right_total;

                if best.as_ref().map_or(true, |(s, _)| score > *s) {
                    let mut threshold = here / 2.0 + next / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some((score, Split { feature, threshold }));
                }
            }
        }

        best.map(|(_, split)| split)
    }
}

/// Per-sample weights; balanced weights are `n / (classes * count)`.
fn class_weights(targets: &[usize], n_classes: usize, balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; targets.len()];
    }
    let mut counts = vec![0usize; n_classes];
    for &t in targets {
        counts[t] += 1;
    }
    let present = counts.iter().filter(|c| **c > 0).count().max(1) as f64;
    let n = targets.len() as f64;
    targets
        .iter()
        .map(|&t| n / (present * counts[t] as f64))
        .collect()
}

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..40 {
            let size = 8.0 + (i % 10) as f64;
            let bold = (i % 3 == 0) as u8 as f64;
            rows.push(vec![size, bold, (i % 7) as f64]);
            targets.push(if size > 14.0 { 1 } else { 0 });
        }
        (rows, targets)
    }

    fn fit(rows: &[Vec<f64>], targets: &[usize], options: &ForestOptions) -> RandomForest {
        let refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        RandomForest::fit(&refs, targets, 2, options)
    }

    #[test]
    fn test_learns_threshold() {
        let (rows, targets) = toy_data();
        let options = ForestOptions::new().with_trees(15).with_max_features(3);
        let forest = fit(&rows, &targets, &options);

        assert_eq!(forest.n_trees(), 15);
        assert_eq!(forest.predict(&[18.0, 0.0, 2.0]), 1);
        assert_eq!(forest.predict(&[9.0, 1.0, 2.0]), 0);
        assert!(forest.is_consistent());
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (rows, targets) = toy_data();
        let options = ForestOptions::new().with_trees(5).with_seed(7);
        let a = fit(&rows, &targets, &options);
        let b = fit(&rows, &targets, &options);

        for row in &rows {
            assert_eq!(a.predict_proba(row), b.predict_proba(row));
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (rows, targets) = toy_data();
        let forest = fit(&rows, &targets, &ForestOptions::new().with_trees(10));
        let p = forest.predict_proba(&[12.0, 1.0, 3.0]);
        assert_eq!(p.len(), 2);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_class() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![0, 0, 0];
        let refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        let forest = RandomForest::fit(&refs, &targets, 1, &ForestOptions::new().with_trees(3));
        assert_eq!(forest.predict(&[10.0]), 0);
    }

    #[test]
    fn test_depth_limit() {
        let (rows, targets) = toy_data();
        let forest = fit(
            &rows,
            &targets,
            &ForestOptions::new().with_trees(3).with_max_depth(0),
        );
        for tree in &forest.trees {
            assert_eq!(tree.nodes.len(), 1);
        }
    }

    #[test]
    fn test_rejects_cyclic_tree() {
        let json = r#"{"n_features": 1, "n_classes": 2, "trees": [{"nodes": [
            {"kind": "split", "feature": 0, "threshold": 0.5, "left": 0, "right": 0}
        ]}]}"#;
        let forest: RandomForest = serde_json::from_str(json).unwrap();
        assert!(!forest.is_consistent());

        let json = r#"{"n_features": 1, "n_classes": 2, "trees": [{"nodes": [
            {"kind": "split", "feature": 0, "threshold": 0.5, "left": 1, "right": 2},
            {"kind": "leaf", "distribution": [1.0, 0.0]},
            {"kind": "split", "feature": 0, "threshold": 0.9, "left": 1, "right": 1}
        ]}]}"#;
        let forest: RandomForest = serde_json::from_str(json).unwrap();
        assert!(!forest.is_consistent());
    }

    #[test]
    fn test_balanced_weights() {
        let weights = class_weights(&[0, 0, 0, 1], 2, true);
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((weights[3] - 2.0).abs() < 1e-12);
        assert_eq!(class_weights(&[0, 1], 2, false), [1.0, 1.0]);
    }

    #[test]
    fn test_argmax_ties_lowest() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
    }
}
