//! # headmark
//!
//! Heading-outline extraction for PDF documents.
//!
//! This library labels each text line of a parsed PDF as a heading level
//! (e.g. "H1", "H2", "H3") or as `not_heading`, using a classifier trained on
//! annotated documents, and assembles the result into a `{title, outline}`
//! document.
//!
//! ## Quick Start
//!
//! ```no_run
//! use headmark::{obtain_model, extract_directory, PipelineOptions};
//! use std::path::Path;
//!
//! fn main() -> headmark::Result<()> {
//!     let options = PipelineOptions::default();
//!
//!     // Load the saved model, training it from the CSV if it is missing
//!     let model = obtain_model(
//!         Path::new("models/headings.json"),
//!         Path::new("datasets/train.csv"),
//!         &options,
//!     )?;
//!
//!     let report = extract_directory(Path::new("input"), Path::new("output"), &model, &options)?;
//!     println!("{} outlines written", report.processed.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Training data**: align layout lines with ground-truth annotations into a CSV
//! - **Two classifiers**: per-line random forest or page-level sequence labeling
//! - **Versioned models**: label mapping and feature schema persisted with the model
//! - **Parallel training**: forest trees are grown with Rayon

pub mod align;
pub mod assemble;
pub mod classify;
pub mod dataset;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod sequence;
pub mod source;

// Re-export commonly used types
pub use align::LabelAligner;
pub use assemble::{assemble, AssembleOptions};
pub use classify::{
    train, ClassifierMode, Evaluation, ForestOptions, HeadingModel, SequenceOptions, TrainOptions,
};
pub use dataset::{LabeledExample, TrainingRow, TrainingSet};
pub use error::{Error, Result};
pub use features::{extract, Feature, FeatureSchema, FeatureVector};
pub use model::{HeadingLabel, Outline, OutlineEntry, TextLine};
pub use pipeline::{
    build_training_set, extract_directory, extract_directory_with, extract_outline, obtain_model,
    train_from_csv, BatchReport, PipelineOptions, RetrainPolicy,
};
pub use render::JsonFormat;
pub use source::LayoutDocument;

use std::path::Path;

/// Extract the outline of a single layout dump.
///
/// # Example
///
/// ```no_run
/// use headmark::{outline_file, AssembleOptions, HeadingModel};
///
/// let model = HeadingModel::load("models/headings.json").unwrap();
/// let outline = outline_file("input/report.layout.json", &model, &AssembleOptions::default()).unwrap();
/// println!("{}", outline.title);
/// ```
pub fn outline_file<P: AsRef<Path>>(
    path: P,
    model: &HeadingModel,
    options: &AssembleOptions,
) -> Result<Outline> {
    let path = path.as_ref();
    let doc = LayoutDocument::open(path)?;
    extract_outline(&source::document_stem(path), doc.lines(), model, options)
}

/// Extract a single layout dump's outline as JSON.
pub fn outline_to_json<P: AsRef<Path>>(
    path: P,
    model: &HeadingModel,
    options: &PipelineOptions,
) -> Result<String> {
    let outline = outline_file(path, model, &options.assemble)?;
    render::to_json(&outline, options.json_format)
}

/// Get the library version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
