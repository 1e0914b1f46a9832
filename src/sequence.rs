//! Per-page sequence grouping.
//!
//! Sequence-mode classifiers look at a whole page at once. Lines are grouped
//! by `(document, page)` and ordered top to bottom by relative position; ties
//! keep their original encounter order.

use crate::dataset::LabeledExample;
use std::collections::BTreeMap;

/// Grouping key: document identifier and page number.
pub type SequenceKey = (String, u32);

/// Labeled lines of one page, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSequence {
    /// Source document identifier
    pub document: String,

    /// Page number
    pub page: u32,

    /// Examples ordered by ascending `rel_y`
    pub examples: Vec<LabeledExample>,
}

impl DocumentSequence {
    /// Number of lines.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether the page has no lines.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

/// Group examples into page sequences.
pub fn group_sequences<I>(examples: I) -> BTreeMap<SequenceKey, DocumentSequence>
where
    I: IntoIterator<Item = LabeledExample>,
{
    let mut groups: BTreeMap<SequenceKey, DocumentSequence> = BTreeMap::new();

    for example in examples {
        let key = (example.document.clone(), example.page);
        groups
            .entry(key)
            .or_insert_with(|| DocumentSequence {
                document: example.document.clone(),
                page: example.page,
                examples: Vec::new(),
            })
            .examples
            .push(example);
    }

    for sequence in groups.values_mut() {
        sequence
            .examples
            .sort_by(|a, b| a.rel_y().total_cmp(&b.rel_y()));
    }

    groups
}

/// Indices of `rel_ys` in top-to-bottom order (stable).
pub fn position_order(rel_ys: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rel_ys.len()).collect();
    order.sort_by(|&a, &b| rel_ys[a].total_cmp(&rel_ys[b]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HeadingLabel, TextLine};

    fn example(doc: &str, page: u32, text: &str, rel_y: f64) -> LabeledExample {
        let line = TextLine::new(text, page).with_position(72.0, rel_y);
        LabeledExample::from_line(doc, &line, HeadingLabel::not_heading())
    }

    #[test]
    fn test_sorted_by_rel_y() {
        let groups = group_sequences(vec![
            example("a.pdf", 1, "middle", 0.5),
            example("a.pdf", 1, "top", 0.1),
            example("a.pdf", 1, "bottom", 0.9),
        ]);

        let sequence = &groups[&("a.pdf".to_string(), 1)];
        let ys: Vec<f64> = sequence.examples.iter().map(|e| e.rel_y()).collect();
        assert_eq!(ys, [0.1, 0.5, 0.9]);
    }

    #[test]
    fn test_grouped_by_document_and_page() {
        let groups = group_sequences(vec![
            example("b.pdf", 2, "x", 0.3),
            example("a.pdf", 1, "x", 0.3),
            example("b.pdf", 1, "x", 0.3),
            example("a.pdf", 1, "y", 0.4),
        ]);

        let keys: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(
            keys,
            [
                ("a.pdf".to_string(), 1),
                ("b.pdf".to_string(), 1),
                ("b.pdf".to_string(), 2)
            ]
        );
        assert_eq!(groups[&("a.pdf".to_string(), 1)].len(), 2);
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let groups = group_sequences(vec![
            example("a.pdf", 1, "one", 0.4),
            example("a.pdf", 1, "above", 0.2),
            example("a.pdf", 1, "second", 0.4),
        ]);
        let sequence = &groups[&("a.pdf".to_string(), 1)];
        let lengths: Vec<f64> = sequence
            .examples
            .iter()
            .map(|e| e.features.get(crate::features::Feature::Length))
            .collect();
        assert_eq!(lengths, [5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_position_order() {
        assert_eq!(position_order(&[0.5, 0.1, 0.9]), [1, 0, 2]);
        assert_eq!(position_order(&[0.3, 0.3, 0.1]), [2, 0, 1]);
        assert!(position_order(&[]).is_empty());
    }
}
