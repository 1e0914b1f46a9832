//! Training-set construction and persistence.
//!
//! A training set is a flat table with one row per extracted line: the source
//! document, the raw line attributes, the aligned label, and the full fan-out
//! of derived feature columns. Rows can be turned back into
//! [`LabeledExample`]s for the classifier; features are always recomputed
//! from the raw attributes so training sees exactly what inference sees.

use crate::align::LabelAligner;
use crate::error::Result;
use crate::features::{self, Feature, FeatureVector};
use crate::model::{HeadingLabel, TextLine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Leading columns of the training table, before the derived features.
pub const BASE_COLUMNS: [&str; 12] = [
    "pdf_file",
    "page",
    "text",
    "font_size",
    "is_bold",
    "is_italic",
    "rel_y",
    "length",
    "num_words",
    "x",
    "color",
    "heading_level",
];

/// A line with its features and label, scoped to one document.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    /// Source document identifier
    pub document: String,

    /// Page number (1-indexed)
    pub page: u32,

    /// Encoded line
    pub features: FeatureVector,

    /// Target label
    pub label: HeadingLabel,
}

impl LabeledExample {
    /// Build an example from a line.
    pub fn from_line(document: impl Into<String>, line: &TextLine, label: HeadingLabel) -> Self {
        Self {
            document: document.into(),
            page: line.page,
            features: features::extract(line),
            label,
        }
    }

    /// Relative vertical position, used for sequence ordering.
    pub fn rel_y(&self) -> f64 {
        self.features.get(Feature::RelY)
    }
}

/// One row of the training table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    /// Source document file name
    pub pdf_file: String,

    /// Page number (1-indexed)
    pub page: u32,

    /// Line text
    pub text: String,

    /// Font size in points
    pub font_size: f64,

    /// 1 if bold
    pub is_bold: u8,

    /// 1 if italic
    pub is_italic: u8,

    /// Relative vertical position
    pub rel_y: f64,

    /// Character count
    pub length: usize,

    /// Word count
    pub num_words: usize,

    /// Left edge
    pub x: f64,

    /// Packed color
    pub color: i64,

    /// Aligned label
    pub heading_level: String,
}

impl TrainingRow {
    /// Create a row from a labeled line.
    pub fn new(pdf_file: impl Into<String>, line: &TextLine, label: &HeadingLabel) -> Self {
        Self {
            pdf_file: pdf_file.into(),
            page: line.page,
            text: line.text.clone(),
            font_size: line.font_size,
            is_bold: u8::from(line.is_bold),
            is_italic: u8::from(line.is_italic),
            rel_y: line.rel_y,
            length: line.length,
            num_words: line.num_words,
            x: line.x,
            color: line.color,
            heading_level: label.to_string(),
        }
    }

    /// Reconstruct the text line.
    pub fn to_line(&self) -> TextLine {
        TextLine {
            text: self.text.clone(),
            page: self.page,
            font_size: self.font_size,
            is_bold: self.is_bold != 0,
            is_italic: self.is_italic != 0,
            rel_y: self.rel_y,
            length: self.length,
            num_words: self.num_words,
            x: self.x,
            color: self.color,
        }
    }

    /// Label of this row.
    pub fn label(&self) -> HeadingLabel {
        HeadingLabel::new(self.heading_level.as_str())
    }

    /// Convert to a classifier example.
    pub fn to_example(&self) -> LabeledExample {
        LabeledExample::from_line(self.pdf_file.as_str(), &self.to_line(), self.label())
    }

    fn record(&self) -> Vec<String> {
        let mut record = vec![
            self.pdf_file.clone(),
            self.page.to_string(),
            self.text.clone(),
            self.font_size.to_string(),
            self.is_bold.to_string(),
            self.is_italic.to_string(),
            self.rel_y.to_string(),
            self.length.to_string(),
            self.num_words.to_string(),
            self.x.to_string(),
            self.color.to_string(),
            self.heading_level.clone(),
        ];
        let vector = features::extract(&self.to_line());
        record.extend(Feature::derived().iter().map(|f| format_value(vector.get(*f))));
        record
    }
}

/// Flag columns are written as integers, everything else as-is.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Accumulated training rows across documents.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    rows: Vec<TrainingRow>,
}

impl TrainingSet {
    /// Create an empty training set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Label a document's lines and append them.
    ///
    /// Returns the number of rows added.
    pub fn add_document<I>(&mut self, pdf_file: &str, lines: I, aligner: &LabelAligner) -> usize
    where
        I: IntoIterator<Item = TextLine>,
    {
        let before = self.rows.len();
        for line in lines {
            let label = aligner.label_for(&line);
            self.rows.push(TrainingRow::new(pdf_file, &line, &label));
        }
        self.rows.len() - before
    }

    /// All rows in insertion order.
    pub fn rows(&self) -> &[TrainingRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows converted to classifier examples.
    pub fn examples(&self) -> Vec<LabeledExample> {
        self.rows.iter().map(TrainingRow::to_example).collect()
    }

    /// Row count per label.
    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.heading_level.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Write the table as CSV, including derived feature columns.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        let header = BASE_COLUMNS
            .iter()
            .copied()
            .chain(Feature::derived().iter().map(|f| f.name()));
        csv.write_record(header)?;
        for row in &self.rows {
            csv.write_record(row.record())?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Read a table written by [`TrainingSet::write_csv`].
    ///
    /// Derived feature columns are ignored; they are recomputed on demand.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let rows = csv
            .deserialize()
            .collect::<std::result::Result<Vec<TrainingRow>, _>>()?;
        Ok(Self { rows })
    }

    /// Save to a CSV file, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.write_csv(BufWriter::new(File::create(path)?))
    }

    /// Load from a CSV file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_csv(BufReader::new(File::open(path)?))
    }
}
