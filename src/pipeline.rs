//! Batch processing: training-set construction, model acquisition, and
//! outline extraction over directories of layout dumps.
//!
//! Documents are processed one at a time. Problems confined to one document
//! (no ground truth, no text, unreadable dump) are logged and the document is
//! skipped; everything else aborts the run.

use crate::align::{locate_ground_truth, LabelAligner};
use crate::assemble::{assemble, AssembleOptions};
use crate::classify::{train, HeadingModel, TrainOptions};
use crate::dataset::TrainingSet;
use crate::error::{Error, Result};
use crate::model::{Outline, TextLine};
use crate::render::{to_json, JsonFormat};
use crate::source::{document_stem, layout_files, LayoutDocument};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// When to train instead of loading a persisted model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrainPolicy {
    /// Only load; fail if the model is missing
    Never,
    /// Load if present, otherwise train and save
    #[default]
    IfMissing,
    /// Always train and overwrite the saved model
    Always,
}

/// Options for batch processing.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Training settings, used when a model has to be trained
    pub train: TrainOptions,

    /// Outline assembly settings
    pub assemble: AssembleOptions,

    /// Output JSON format
    pub json_format: JsonFormat,

    /// Load-or-train decision
    pub retrain: RetrainPolicy,
}

impl PipelineOptions {
    /// Create new pipeline options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set training options.
    pub fn with_train_options(mut self, train: TrainOptions) -> Self {
        self.train = train;
        self
    }

    /// Set assembly options.
    pub fn with_assemble_options(mut self, assemble: AssembleOptions) -> Self {
        self.assemble = assemble;
        self
    }

    /// Set output JSON format.
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    /// Set the retrain policy.
    pub fn with_retrain(mut self, policy: RetrainPolicy) -> Self {
        self.retrain = policy;
        self
    }
}

/// A document left out of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedDocument {
    /// Document stem
    pub document: String,

    /// Why it was skipped
    pub reason: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Documents processed successfully
    pub processed: Vec<String>,

    /// Documents skipped
    pub skipped: Vec<SkippedDocument>,
}

impl BatchReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed document.
    pub fn add_processed(&mut self, document: impl Into<String>) {
        self.processed.push(document.into());
    }

    /// Record and log a skipped document.
    pub fn add_skipped(&mut self, document: impl Into<String>, reason: &Error) {
        let document = document.into();
        log::warn!("Skipping {}: {}", document, reason);
        self.skipped.push(SkippedDocument {
            document,
            reason: reason.to_string(),
        });
    }

    /// Total documents seen.
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len()
    }
}

/// Read a layout dump into lines. Any failure is confined to this document.
fn read_lines(path: &Path) -> Result<Vec<TextLine>> {
    let doc = LayoutDocument::open(path).map_err(|e| match e {
        Error::Layout(_) => e,
        other => Error::Layout(format!("{}: {}", path.display(), other)),
    })?;
    Ok(doc.lines().collect())
}

/// Label the lines of every layout dump in `layout_dir` against ground truth
/// in `truth_dir`.
///
/// Rows carry `<stem>.pdf` as the document name.
pub fn build_training_set(layout_dir: &Path, truth_dir: &Path) -> Result<(TrainingSet, BatchReport)> {
    let mut set = TrainingSet::new();
    let mut report = BatchReport::new();

    for path in layout_files(layout_dir)? {
        let stem = document_stem(&path);

        let aligner = match locate_ground_truth(truth_dir, &stem) {
            Ok(truth) => match LabelAligner::from_path(&truth) {
                Ok(aligner) => aligner,
                Err(e) => {
                    report.add_skipped(&stem, &e);
                    continue;
                }
            },
            Err(e) => {
                report.add_skipped(&stem, &e);
                continue;
            }
        };

        let lines = match read_lines(&path) {
            Ok(lines) if lines.is_empty() => {
                report.add_skipped(&stem, &Error::EmptyDocument(stem.clone()));
                continue;
            }
            Ok(lines) => lines,
            Err(e) => {
                report.add_skipped(&stem, &e);
                continue;
            }
        };

        let added = set.add_document(&format!("{}.pdf", stem), lines, &aligner);
        log::info!("Labeled {} lines from {}", added, stem);
        report.add_processed(stem);
    }

    Ok((set, report))
}

/// Train a model from a training CSV.
pub fn train_from_csv(training_csv: &Path, options: &TrainOptions) -> Result<HeadingModel> {
    let set = TrainingSet::load(training_csv)?;
    if set.is_empty() {
        return Err(Error::TrainingDataEmpty);
    }
    log::info!(
        "Loaded {} training rows from {}",
        set.len(),
        training_csv.display()
    );
    train(&set.examples(), options)
}

/// Load the model at `model_path`, or train it from `training_csv`, according
/// to `options.retrain`.
///
/// This is the only place a persisted model is written; prediction never
/// trains or saves.
pub fn obtain_model(
    model_path: &Path,
    training_csv: &Path,
    options: &PipelineOptions,
) -> Result<HeadingModel> {
    let exists = model_path.is_file();
    let retrain = match options.retrain {
        RetrainPolicy::Always => true,
        RetrainPolicy::IfMissing => !exists,
        RetrainPolicy::Never if exists => false,
        RetrainPolicy::Never => return Err(Error::ModelUnavailable(model_path.to_path_buf())),
    };

    if !retrain {
        return HeadingModel::load(model_path);
    }

    log::info!("Training model from {}", training_csv.display());
    let model = train_from_csv(training_csv, &options.train)?;
    model.save(model_path)?;
    Ok(model)
}

/// Classify one document's lines and assemble its outline.
pub fn extract_outline<I>(
    document: &str,
    lines: I,
    model: &HeadingModel,
    options: &AssembleOptions,
) -> Result<Outline>
where
    I: IntoIterator<Item = TextLine>,
{
    let lines: Vec<TextLine> = lines.into_iter().collect();
    if lines.is_empty() {
        return Err(Error::EmptyDocument(document.to_string()));
    }

    let labels = model.classify_lines(&lines)?;
    Ok(assemble(lines.iter().zip(&labels), options))
}

/// Extract one layout dump and write `<stem>.json` into `output_dir`.
///
/// Returns the written path.
pub fn process_document(
    path: &Path,
    output_dir: &Path,
    model: &HeadingModel,
    options: &PipelineOptions,
) -> Result<PathBuf> {
    let stem = document_stem(path);
    let lines = read_lines(path)?;
    let outline = extract_outline(&stem, lines, model, &options.assemble)?;

    let out_path = output_dir.join(format!("{}.json", stem));
    std::fs::write(&out_path, to_json(&outline, options.json_format)?)?;
    log::info!(
        "Saved outline of {} ({} headings) to {}",
        stem,
        outline.len(),
        out_path.display()
    );
    Ok(out_path)
}

/// Extract outlines for every layout dump in `input_dir`.
pub fn extract_directory(
    input_dir: &Path,
    output_dir: &Path,
    model: &HeadingModel,
    options: &PipelineOptions,
) -> Result<BatchReport> {
    extract_directory_with(input_dir, output_dir, model, options, |_, _, _| {})
}

/// Like [`extract_directory`], calling `on_document(position, total, stem)`
/// before each document is processed.
pub fn extract_directory_with<F>(
    input_dir: &Path,
    output_dir: &Path,
    model: &HeadingModel,
    options: &PipelineOptions,
    mut on_document: F,
) -> Result<BatchReport>
where
    F: FnMut(usize, usize, &str),
{
    std::fs::create_dir_all(output_dir)?;
    let files = layout_files(input_dir)?;
    let mut report = BatchReport::new();

    for (position, path) in files.iter().enumerate() {
        let stem = document_stem(path);
        on_document(position, files.len(), &stem);
        match process_document(path, output_dir, model, options) {
            Ok(_) => report.add_processed(stem),
            Err(e) if e.is_recoverable() => report.add_skipped(stem, &e),
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}
