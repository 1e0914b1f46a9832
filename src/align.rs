//! Ground-truth label alignment.
//!
//! Training lines are labeled by looking up their trimmed text and page in an
//! annotation set. Two annotation formats are accepted: a table with columns
//! `page,text,heading_level`, or an outline document in the same JSON shape the
//! extractor produces. Lines without a match are `not_heading`.
//!
//! The `(text, page)` key is not unique: repeated short strings such as page
//! numbers collide. When several annotations share a key the first one wins.

use crate::error::{Error, Result};
use crate::model::{HeadingLabel, Outline, TextLine};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// One row of a tabular annotation file.
#[derive(Debug, Deserialize)]
struct AnnotationRow {
    page: u32,
    text: String,
    heading_level: String,
}

/// Maps `(trimmed text, page)` to a heading label.
#[derive(Debug, Clone, Default)]
pub struct LabelAligner {
    labels: HashMap<(String, u32), HeadingLabel>,
}

impl LabelAligner {
    /// Create an empty aligner (every line is `not_heading`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an annotation. Ignored if the key is already present.
    pub fn insert(&mut self, text: &str, page: u32, label: impl Into<HeadingLabel>) {
        self.labels
            .entry((text.trim().to_string(), page))
            .or_insert_with(|| label.into());
    }

    /// Build from an outline document; the title is not keyed on its own.
    pub fn from_outline(outline: &Outline) -> Self {
        let mut aligner = Self::new();
        for entry in &outline.entries {
            aligner.insert(&entry.text, entry.page, entry.level.clone());
        }
        aligner
    }

    /// Build from a `page,text,heading_level` table.
    pub fn from_table<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let mut aligner = Self::new();
        for row in csv.deserialize() {
            let row: AnnotationRow = row?;
            aligner.insert(&row.text, row.page, row.heading_level);
        }
        Ok(aligner)
    }

    /// Load annotations from a file, choosing the format by extension.
    ///
    /// `.csv` files are read as tables; anything else as an outline document.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        let is_table = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        if is_table {
            Self::from_table(file)
        } else {
            let outline: Outline = serde_json::from_reader(file)?;
            Ok(Self::from_outline(&outline))
        }
    }

    /// Label for a text and page.
    pub fn lookup(&self, text: &str, page: u32) -> HeadingLabel {
        self.labels
            .get(&(text.trim().to_string(), page))
            .cloned()
            .unwrap_or_default()
    }

    /// Label for a text line.
    pub fn label_for(&self, line: &TextLine) -> HeadingLabel {
        self.lookup(line.normalized_text(), line.page)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no annotations were loaded.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Find the annotation file for a document stem in `dir`.
///
/// Looks for `<stem>.json`, then `<stem>.csv`.
pub fn locate_ground_truth(dir: &Path, stem: &str) -> Result<PathBuf> {
    ["json", "csv"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|path| path.is_file())
        .ok_or_else(|| Error::MissingGroundTruth(stem.to_string()))
}
