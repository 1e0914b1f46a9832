//! Per-label precision, recall and F1.

use super::LabelIndex;
use crate::model::HeadingLabel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// The label
    pub label: HeadingLabel,
    /// Correct predictions / all predictions of this label
    pub precision: f64,
    /// Correct predictions / all true occurrences of this label
    pub recall: f64,
    /// Harmonic mean of precision and recall
    pub f1: f64,
    /// True occurrences
    pub support: usize,
}

/// Classification report over a set of examples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Scores in label-index order
    pub scores: Vec<LabelScore>,
    correct: usize,
    total: usize,
}

impl Evaluation {
    /// Build from `(expected, predicted)` pairs.
    pub fn from_pairs(labels: &LabelIndex, pairs: &[(HeadingLabel, HeadingLabel)]) -> Self {
        let scores = labels
            .labels()
            .iter()
            .map(|label| {
                let tp = pairs
                    .iter()
                    .filter(|(e, p)| e == label && p == label)
                    .count();
                let predicted = pairs.iter().filter(|(_, p)| p == label).count();
                let support = pairs.iter().filter(|(e, _)| e == label).count();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                LabelScore {
                    label: label.clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            scores,
            correct: pairs.iter().filter(|(e, p)| e == p).count(),
            total: pairs.len(),
        }
    }

    /// Fraction of correct predictions.
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.total)
    }

    /// Number of evaluated examples.
    pub fn support(&self) -> usize {
        self.total
    }

    /// Score for a label, if it is in the vocabulary.
    pub fn score(&self, label: &str) -> Option<&LabelScore> {
        self.scores.iter().find(|s| s.label.as_str() == label)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .scores
            .iter()
            .map(|s| s.label.as_str().len())
            .max()
            .unwrap_or(0)
            .max("accuracy".len());

        writeln!(
            f,
            "{:>width$}  {:>9}  {:>6}  {:>8}  {:>7}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for s in &self.scores {
            writeln!(
                f,
                "{:>width$}  {:>9.2}  {:>6.2}  {:>8.2}  {:>7}",
                s.label.as_str(),
                s.precision,
                s.recall,
                s.f1,
                s.support
            )?;
        }
        write!(
            f,
            "{:>width$}  {:>9}  {:>6}  {:>8.2}  {:>7}",
            "accuracy",
            "",
            "",
            self.accuracy(),
            self.total
        )
    }
}
