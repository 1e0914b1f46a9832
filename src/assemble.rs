//! Outline assembly from per-line predictions.
//!
//! Predictions arrive in document order (page, then parser line order).
//! Non-headings are dropped, every heading becomes an entry in that same
//! order, and the first line carrying the title label also provides the
//! document title. Without such a line the first surviving entry is the title.

use crate::model::{HeadingLabel, Outline, OutlineEntry, TextLine};

/// Options for assembling outlines.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembleOptions {
    /// Label whose first occurrence names the document
    pub title_label: HeadingLabel,
}

impl AssembleOptions {
    /// Create new assemble options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label that provides the title.
    pub fn with_title_label(mut self, label: impl Into<HeadingLabel>) -> Self {
        self.title_label = label.into();
        self
    }
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            title_label: HeadingLabel::new("H1"),
        }
    }
}

/// Build an outline from lines and their predicted labels.
pub fn assemble<'a, I>(predictions: I, options: &AssembleOptions) -> Outline
where
    I: IntoIterator<Item = (&'a TextLine, &'a HeadingLabel)>,
{
    let mut outline = Outline::new();
    let mut title: Option<String> = None;

    for (line, label) in predictions {
        if !label.is_heading() {
            continue;
        }
        if title.is_none() && *label == options.title_label {
            title = Some(line.text.clone());
        }
        outline.add_entry(OutlineEntry::new(label.clone(), line.text.clone(), line.page));
    }

    outline.title = title
        .or_else(|| outline.entries.first().map(|e| e.text.clone()))
        .unwrap_or_default();
    outline
}
