//! Linear-chain sequence labeler for per-page classification.
//!
//! Scores a page's lines jointly: each line contributes per-label emission
//! scores from its (standardized) features, and adjacent lines contribute
//! label-transition scores. Decoding is Viterbi; training is an averaged
//! structured perceptron over the page sequences.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Options for training the sequence labeler.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceOptions {
    /// Maximum passes over the training sequences
    pub max_iterations: usize,

    /// Random seed for the sequence visiting order
    pub seed: u64,
}

impl SequenceOptions {
    /// Create new sequence options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of passes.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n.max(1);
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            seed: 42,
        }
    }
}

/// Per-feature standardization fitted on the training rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Scaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Scaler {
    fn fit<'a, I>(rows: I, n_features: usize) -> Self
    where
        I: IntoIterator<Item = &'a [f64]> + Clone,
    {
        let mut mean = vec![0.0; n_features];
        let mut n = 0.0;
        for row in rows.clone() {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
            n += 1.0;
        }
        let n = f64::max(n, 1.0);
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; n_features];
        for row in rows {
            for ((s, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *s += (v - m) * (v - m);
            }
        }
        let scale = var
            .into_iter()
            .map(|s| {
                let sd = (s / n).sqrt();
                if sd > 1e-12 {
                    sd
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    fn apply(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// Weight vector layout: emissions, then transitions, then start scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Weights {
    /// `[label * (n_features + 1) + feature]`, bias in the last slot
    emission: Vec<f64>,
    /// `[previous * n_labels + current]`
    transition: Vec<f64>,
    start: Vec<f64>,
}

impl Weights {
    fn zeros(n_labels: usize, n_features: usize) -> Self {
        Self {
            emission: vec![0.0; n_labels * (n_features + 1)],
            transition: vec![0.0; n_labels * n_labels],
            start: vec![0.0; n_labels],
        }
    }

    fn add_scaled(&mut self, other: &Weights, factor: f64) {
        for (a, b) in self.emission.iter_mut().zip(&other.emission) {
            *a += b * factor;
        }
        for (a, b) in self.transition.iter_mut().zip(&other.transition) {
            *a += b * factor;
        }
        for (a, b) in self.start.iter_mut().zip(&other.start) {
            *a += b * factor;
        }
    }
}

/// A trained linear-chain labeler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceModel {
    n_features: usize,
    n_labels: usize,
    scaler: Scaler,
    weights: Weights,
}

impl SequenceModel {
    /// Train on page sequences of `(feature rows, target indices)`.
    ///
    /// Sequences must be non-empty overall, rows of equal length, and targets
    /// below `n_labels`. The caller validates these.
    pub fn fit(
        sequences: &[(Vec<&[f64]>, Vec<usize>)],
        n_labels: usize,
        options: &SequenceOptions,
    ) -> Self {
        let n_features = sequences
            .iter()
            .flat_map(|(rows, _)| rows.first())
            .map(|r| r.len())
            .next()
            .unwrap_or(0);
        let scaler = Scaler::fit(
            sequences.iter().flat_map(|(rows, _)| rows.iter().copied()),
            n_features,
        );
        let scaled: Vec<(Vec<Vec<f64>>, &[usize])> = sequences
            .iter()
            .filter(|(rows, _)| !rows.is_empty())
            .map(|(rows, targets)| {
                (
                    rows.iter().map(|r| scaler.apply(r)).collect(),
                    targets.as_slice(),
                )
            })
            .collect();

        let mut model = Self {
            n_features,
            n_labels,
            scaler,
            weights: Weights::zeros(n_labels, n_features),
        };

        let mut sum = Weights::zeros(n_labels, n_features);
        let mut steps = 0usize;
        let mut order: Vec<usize> = (0..scaled.len()).collect();
        let mut rng = StdRng::seed_from_u64(options.seed);

        for iteration in 0..options.max_iterations {
            order.shuffle(&mut rng);
            let mut mistakes = 0;

            for &s in &order {
                let (rows, gold) = &scaled[s];
                let predicted = model.viterbi(rows);
                if predicted.as_slice() != *gold {
                    mistakes += 1;
                    model.update(rows, gold, 1.0);
                    model.update(rows, &predicted, -1.0);
                }
                sum.add_scaled(&model.weights, 1.0);
                steps += 1;
            }

            log::debug!(
                "sequence iteration {}: {} of {} pages mislabeled",
                iteration + 1,
                mistakes,
                scaled.len()
            );
            if mistakes == 0 {
                break;
            }
        }

        if steps > 0 {
            let mut averaged = Weights::zeros(n_labels, n_features);
            averaged.add_scaled(&sum, 1.0 / steps as f64);
            model.weights = averaged;
        }
        model
    }

    /// Label a page's lines, given top to bottom.
    pub fn predict(&self, rows: &[&[f64]]) -> Vec<usize> {
        let scaled: Vec<Vec<f64>> = rows.iter().map(|r| self.scaler.apply(r)).collect();
        self.viterbi(&scaled)
    }

    /// Number of input features.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of labels.
    pub fn n_labels(&self) -> usize {
        self.n_labels
    }

    /// Check weight dimensions after deserialization.
    pub(crate) fn is_consistent(&self) -> bool {
        let (l, f) = (self.n_labels, self.n_features);
        self.scaler.mean.len() == f
            && self.scaler.scale.len() == f
            && self.weights.emission.len() == l * (f + 1)
            && self.weights.transition.len() == l * l
            && self.weights.start.len() == l
    }

    fn emission(&self, label: usize, row: &[f64]) -> f64 {
        let stride = self.n_features + 1;
        let w = &self.weights.emission[label * stride..(label + 1) * stride];
        row.iter().zip(w).map(|(x, w)| x * w).sum::<f64>() + w[self.n_features]
    }

    fn viterbi(&self, rows: &[Vec<f64>]) -> Vec<usize> {
        let l = self.n_labels;
        if rows.is_empty() || l == 0 {
            return Vec::new();
        }

        let mut score: Vec<f64> = (0..l)
            .map(|y| self.weights.start[y] + self.emission(y, &rows[0]))
            .collect();
        let mut back: Vec<Vec<usize>> = Vec::with_capacity(rows.len());

        for row in &rows[1..] {
            let mut next = vec![f64::NEG_INFINITY; l];
            let mut pointers = vec![0; l];
            for (y, slot) in next.iter_mut().enumerate() {
                let emit = self.emission(y, row);
                for (p, prev) in score.iter().enumerate() {
                    let s = prev + self.weights.transition[p * l + y] + emit;
                    if s > *slot {
                        *slot = s;
                        pointers[y] = p;
                    }
                }
            }
            score = next;
            back.push(pointers);
        }

        let mut last = super::forest::argmax(&score);
        let mut path = vec![last];
        for pointers in back.iter().rev() {
            last = pointers[last];
            path.push(last);
        }
        path.reverse();
        path
    }

    fn update(&mut self, rows: &[Vec<f64>], labels: &[usize], sign: f64) {
        let l = self.n_labels;
        let stride = self.n_features + 1;

        for (t, (row, &y)) in rows.iter().zip(labels).enumerate() {
            let w = &mut self.weights.emission[y * stride..(y + 1) * stride];
            for (w, x) in w.iter_mut().zip(row) {
                *w += sign * x;
            }
            w[self.n_features] += sign;

            if t == 0 {
                self.weights.start[y] += sign;
            } else {
                self.weights.transition[labels[t - 1] * l + y] += sign;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pages where a large line is a heading and the line right after a
    /// heading is always body text.
    fn toy_pages() -> Vec<(Vec<Vec<f64>>, Vec<usize>)> {
        (0..12)
            .map(|p| {
                let rows = vec![
                    vec![18.0, 1.0, 0.05 + p as f64 * 0.001],
                    vec![10.0, 0.0, 0.2],
                    vec![10.0, 0.0, 0.3],
                    vec![15.0, 1.0, 0.5],
                    vec![10.0, 0.0, 0.6],
                ];
                (rows, vec![0, 1, 1, 0, 1])
            })
            .collect()
    }

    fn as_refs(pages: &[(Vec<Vec<f64>>, Vec<usize>)]) -> Vec<(Vec<&[f64]>, Vec<usize>)> {
        pages
            .iter()
            .map(|(rows, y)| (rows.iter().map(|r| r.as_slice()).collect(), y.clone()))
            .collect()
    }

    #[test]
    fn test_learns_page_pattern() {
        let pages = toy_pages();
        let model = SequenceModel::fit(&as_refs(&pages), 2, &SequenceOptions::new());

        let page: Vec<&[f64]> = pages[0].0.iter().map(|r| r.as_slice()).collect();
        assert_eq!(model.predict(&page), vec![0, 1, 1, 0, 1]);
        assert!(model.is_consistent());
    }

    #[test]
    fn test_deterministic() {
        let pages = toy_pages();
        let options = SequenceOptions::new().with_max_iterations(5);
        let a = SequenceModel::fit(&as_refs(&pages), 2, &options);
        let b = SequenceModel::fit(&as_refs(&pages), 2, &options);
        assert_eq!(a.weights.emission, b.weights.emission);
        assert_eq!(a.weights.transition, b.weights.transition);
    }

    #[test]
    fn test_empty_page() {
        let pages = toy_pages();
        let model = SequenceModel::fit(&as_refs(&pages), 2, &SequenceOptions::new());
        assert!(model.predict(&[]).is_empty());
    }

    #[test]
    fn test_scaler_constant_column() {
        let rows = [vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = Scaler::fit(rows.iter().map(|r| r.as_slice()), 2);
        assert_eq!(scaler.mean, [2.0, 5.0]);
        assert_eq!(scaler.scale, [1.0, 1.0]);
        assert_eq!(scaler.apply(&[3.0, 5.0]), [1.0, 0.0]);
    }
}
