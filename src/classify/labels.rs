//! Label ⇄ class index mapping.

use crate::error::{Error, Result};
use crate::model::HeadingLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Dense class indices for the labels seen in training.
///
/// Labels are sorted lexicographically; a label's index is its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelIndex {
    labels: Vec<HeadingLabel>,
}

impl LabelIndex {
    /// Collect the distinct labels of a training set.
    pub fn from_labels<'a, I>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a HeadingLabel>,
    {
        let distinct: BTreeSet<&HeadingLabel> = labels.into_iter().collect();
        if distinct.is_empty() {
            return Err(Error::EmptyLabelVocabulary);
        }
        Ok(Self {
            labels: distinct.into_iter().cloned().collect(),
        })
    }

    /// Index of a label.
    pub fn index_of(&self, label: &HeadingLabel) -> Result<usize> {
        self.labels
            .binary_search(label)
            .map_err(|_| Error::UnknownLabel(label.to_string()))
    }

    /// Label at an index.
    pub fn label(&self, index: usize) -> Result<&HeadingLabel> {
        self.labels
            .get(index)
            .ok_or_else(|| Error::InvalidModel(format!("class index {} out of range", index)))
    }

    /// All labels in index order.
    pub fn labels(&self) -> &[HeadingLabel] {
        &self.labels
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether there are no classes.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Check the invariants a deserialized index must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(Error::EmptyLabelVocabulary);
        }
        if self.labels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidModel(
                "labels are not sorted and distinct".to_string(),
            ));
        }
        Ok(())
    }
}
