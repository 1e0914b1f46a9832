//! Heading classification.
//!
//! A [`HeadingModel`] bundles a trained classifier with the label mapping and
//! the feature schema it was trained against. Two classifiers are available:
//!
//! - [`ClassifierMode::Independent`]: a random forest labels each line on its
//!   own.
//! - [`ClassifierMode::Sequence`]: a linear-chain labeler sees a whole page,
//!   top to bottom, so neighboring lines inform each other.
//!
//! # Example
//!
//! ```no_run
//! use headmark::classify::{train, TrainOptions};
//! use headmark::dataset::TrainingSet;
//!
//! fn main() -> headmark::Result<()> {
//!     let set = TrainingSet::load("datasets/train.csv")?;
//!     let model = train(&set.examples(), &TrainOptions::default())?;
//!     model.save("models/headings.json")?;
//!     Ok(())
//! }
//! ```

mod chain;
mod forest;
mod labels;
mod report;

pub use chain::{SequenceModel, SequenceOptions};
pub use forest::{ForestOptions, RandomForest};
pub use labels::LabelIndex;
pub use report::{Evaluation, LabelScore};

use crate::dataset::LabeledExample;
use crate::error::{Error, Result};
use crate::features::{self, FeatureSchema, FeatureVector};
use crate::model::{HeadingLabel, TextLine};
use crate::sequence::{group_sequences, position_order};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Which classifier to train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Random forest over individual lines
    #[default]
    Independent,
    /// Linear-chain labeler over per-page line sequences
    Sequence,
}

impl fmt::Display for ClassifierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierMode::Independent => f.write_str("independent"),
            ClassifierMode::Sequence => f.write_str("sequence"),
        }
    }
}

/// Training configuration.
#[derive(Debug, Clone, Default)]
pub struct TrainOptions {
    /// Classifier to train
    pub mode: ClassifierMode,

    /// Random forest settings (independent mode)
    pub forest: ForestOptions,

    /// Sequence labeler settings (sequence mode)
    pub sequence: SequenceOptions,
}

impl TrainOptions {
    /// Create new training options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the classifier mode.
    pub fn with_mode(mut self, mode: ClassifierMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set random forest options.
    pub fn with_forest(mut self, forest: ForestOptions) -> Self {
        self.forest = forest;
        self
    }

    /// Set sequence labeler options.
    pub fn with_sequence(mut self, sequence: SequenceOptions) -> Self {
        self.sequence = sequence;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", content = "model", rename_all = "snake_case")]
enum Classifier {
    Independent(RandomForest),
    Sequence(SequenceModel),
}

/// A trained heading classifier with its label mapping and feature schema.
///
/// The model is never mutated after training, so a loaded model can be shared
/// across documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingModel {
    schema: FeatureSchema,
    labels: LabelIndex,
    trained_at: DateTime<Utc>,
    examples: usize,
    classifier: Classifier,
}

/// Train a model from labeled examples.
///
/// Fails with [`Error::TrainingDataEmpty`] when `examples` is empty and with
/// [`Error::FeatureMismatch`] when any example was not built with the current
/// feature schema.
pub fn train(examples: &[LabeledExample], options: &TrainOptions) -> Result<HeadingModel> {
    if examples.is_empty() {
        return Err(Error::TrainingDataEmpty);
    }

    let schema = FeatureSchema::current();
    for example in examples {
        ensure_dimensions(&schema, &example.features)?;
    }

    let labels = LabelIndex::from_labels(examples.iter().map(|e| &e.label))?;
    log::info!(
        "Training {} classifier on {} examples, {} labels",
        options.mode,
        examples.len(),
        labels.len()
    );

    let classifier = match options.mode {
        ClassifierMode::Independent => {
            let rows: Vec<&[f64]> = examples.iter().map(|e| e.features.values()).collect();
            let targets = examples
                .iter()
                .map(|e| labels.index_of(&e.label))
                .collect::<Result<Vec<_>>>()?;
            Classifier::Independent(RandomForest::fit(
                &rows,
                &targets,
                labels.len(),
                &options.forest,
            ))
        }
        ClassifierMode::Sequence => {
            let groups = group_sequences(examples.iter().cloned());
            let sequences = groups
                .values()
                .map(|seq| {
                    let rows: Vec<&[f64]> =
                        seq.examples.iter().map(|e| e.features.values()).collect();
                    let targets = seq
                        .examples
                        .iter()
                        .map(|e| labels.index_of(&e.label))
                        .collect::<Result<Vec<_>>>()?;
                    Ok((rows, targets))
                })
                .collect::<Result<Vec<_>>>()?;
            log::debug!("Grouped examples into {} page sequences", sequences.len());
            Classifier::Sequence(SequenceModel::fit(
                &sequences,
                labels.len(),
                &options.sequence,
            ))
        }
    };

    Ok(HeadingModel {
        schema,
        labels,
        trained_at: Utc::now(),
        examples: examples.len(),
        classifier,
    })
}

fn ensure_dimensions(schema: &FeatureSchema, vector: &FeatureVector) -> Result<()> {
    if vector.len() != schema.len() {
        return Err(Error::FeatureMismatch {
            expected: schema.len(),
            found: vector.len(),
        });
    }
    Ok(())
}

impl HeadingModel {
    /// Classifier mode of this model.
    pub fn mode(&self) -> ClassifierMode {
        match self.classifier {
            Classifier::Independent(_) => ClassifierMode::Independent,
            Classifier::Sequence(_) => ClassifierMode::Sequence,
        }
    }

    /// Label mapping.
    pub fn labels(&self) -> &LabelIndex {
        &self.labels
    }

    /// Feature schema the model was trained against.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// When the model was trained.
    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Number of training examples.
    pub fn example_count(&self) -> usize {
        self.examples
    }

    /// Classify feature vectors.
    ///
    /// In independent mode each vector is labeled on its own. In sequence mode
    /// the slice is treated as one page, already ordered top to bottom.
    pub fn predict(&self, vectors: &[FeatureVector]) -> Result<Vec<HeadingLabel>> {
        for vector in vectors {
            ensure_dimensions(&self.schema, vector)?;
        }
        let rows: Vec<&[f64]> = vectors.iter().map(|v| v.values()).collect();

        let indices: Vec<usize> = match &self.classifier {
            Classifier::Independent(forest) => rows.iter().map(|r| forest.predict(r)).collect(),
            Classifier::Sequence(chain) => chain.predict(&rows),
        };

        indices
            .into_iter()
            .map(|i| self.labels.label(i).cloned())
            .collect()
    }

    /// Classify the lines of one document, returning labels in input order.
    ///
    /// In sequence mode lines are grouped per page and ordered by `rel_y`
    /// exactly as during training, then mapped back to input order.
    pub fn classify_lines(&self, lines: &[TextLine]) -> Result<Vec<HeadingLabel>> {
        let vectors: Vec<FeatureVector> = lines.iter().map(features::extract).collect();

        if self.mode() == ClassifierMode::Independent {
            return self.predict(&vectors);
        }

        let mut pages: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, line) in lines.iter().enumerate() {
            pages.entry(line.page).or_default().push(i);
        }

        let mut result = vec![HeadingLabel::not_heading(); lines.len()];
        for members in pages.values() {
            let rel_ys: Vec<f64> = members.iter().map(|&i| lines[i].rel_y).collect();
            let ordered: Vec<usize> = position_order(&rel_ys)
                .into_iter()
                .map(|k| members[k])
                .collect();
            let page_vectors: Vec<FeatureVector> =
                ordered.iter().map(|&i| vectors[i].clone()).collect();
            for (i, label) in ordered.into_iter().zip(self.predict(&page_vectors)?) {
                result[i] = label;
            }
        }
        Ok(result)
    }

    /// Score the model against labeled examples.
    ///
    /// Sequence models are evaluated page by page, as they were trained.
    pub fn evaluate(&self, examples: &[LabeledExample]) -> Result<Evaluation> {
        let mut pairs = Vec::with_capacity(examples.len());
        match self.mode() {
            ClassifierMode::Independent => {
                let vectors: Vec<FeatureVector> =
                    examples.iter().map(|e| e.features.clone()).collect();
                let predicted = self.predict(&vectors)?;
                pairs.extend(examples.iter().map(|e| e.label.clone()).zip(predicted));
            }
            ClassifierMode::Sequence => {
                for seq in group_sequences(examples.iter().cloned()).into_values() {
                    let vectors: Vec<FeatureVector> =
                        seq.examples.iter().map(|e| e.features.clone()).collect();
                    let predicted = self.predict(&vectors)?;
                    pairs.extend(seq.examples.into_iter().map(|e| e.label).zip(predicted));
                }
            }
        }
        Ok(Evaluation::from_pairs(&self.labels, &pairs))
    }

    /// Check internal consistency and schema compatibility.
    pub fn validate(&self) -> Result<()> {
        self.schema.ensure_current()?;
        self.labels.validate()?;

        let (classes, inputs, consistent) = match &self.classifier {
            Classifier::Independent(f) => (f.n_classes(), f.n_features(), f.is_consistent()),
            Classifier::Sequence(c) => (c.n_labels(), c.n_features(), c.is_consistent()),
        };
        if classes != self.labels.len() {
            return Err(Error::InvalidModel(format!(
                "classifier has {} classes, label map has {}",
                classes,
                self.labels.len()
            )));
        }
        if inputs != self.schema.len() {
            return Err(Error::FeatureMismatch {
                expected: self.schema.len(),
                found: inputs,
            });
        }
        if !consistent {
            return Err(Error::InvalidModel("malformed classifier".to_string()));
        }
        Ok(())
    }

    /// Save as JSON, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        log::info!("Model saved to {}", path.display());
        Ok(())
    }

    /// Load a model saved with [`HeadingModel::save`] and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let model: Self = serde_json::from_reader(reader)?;
        model.validate()?;
        log::info!(
            "Loaded {} model from {} ({} labels)",
            model.mode(),
            path.display(),
            model.labels.len()
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(doc: &str, line: TextLine, label: &str) -> LabeledExample {
        LabeledExample::from_line(doc, &line, HeadingLabel::from(label))
    }

    fn heading(text: &str, page: u32, rel_y: f64) -> TextLine {
        TextLine::new(text, page)
            .with_font(18.0, true, false)
            .with_position(72.0, rel_y)
    }

    fn body(text: &str, page: u32, rel_y: f64) -> TextLine {
        TextLine::new(text, page)
            .with_font(10.0, false, false)
            .with_position(72.0, rel_y)
    }

    fn training_examples() -> Vec<LabeledExample> {
        let mut examples = Vec::new();
        for doc in 0..4 {
            let name = format!("doc{}.pdf", doc);
            for page in 1..=3 {
                examples.push(example(&name, heading("Overview", page, 0.1), "H1"));
                examples.push(example(
                    &name,
                    body("The quick brown fox jumps over the lazy dog again.", page, 0.3),
                    "not_heading",
                ));
                examples.push(example(
                    &name,
                    body("Numbers such as 42 appear in body text too.", page, 0.5),
                    "not_heading",
                ));
            }
        }
        examples
    }

    fn small_forest() -> TrainOptions {
        TrainOptions::new().with_forest(ForestOptions::new().with_trees(10))
    }

    #[test]
    fn test_empty_training_data() {
        assert!(matches!(
            train(&[], &TrainOptions::default()),
            Err(Error::TrainingDataEmpty)
        ));
    }

    #[test]
    fn test_training_rejects_wrong_dimensions() {
        let examples = vec![LabeledExample {
            document: "a.pdf".to_string(),
            page: 1,
            features: FeatureVector::from_values(vec![12.0; 8]),
            label: HeadingLabel::from("H1"),
        }];
        assert!(matches!(
            train(&examples, &small_forest()),
            Err(Error::FeatureMismatch {
                expected: 27,
                found: 8
            })
        ));
    }

    #[test]
    fn test_independent_mode() {
        let model = train(&training_examples(), &small_forest()).unwrap();
        assert_eq!(model.mode(), ClassifierMode::Independent);
        assert_eq!(model.labels().len(), 2);

        let lines = vec![
            heading("Background", 1, 0.12),
            body("Some ordinary sentence that runs for a while.", 1, 0.4),
        ];
        let labels = model.classify_lines(&lines).unwrap();
        assert_eq!(labels[0].as_str(), "H1");
        assert_eq!(labels[1].as_str(), "not_heading");
    }

    #[test]
    fn test_sequence_mode_maps_back_to_input_order() {
        let options = TrainOptions::new().with_mode(ClassifierMode::Sequence);
        let model = train(&training_examples(), &options).unwrap();
        assert_eq!(model.mode(), ClassifierMode::Sequence);

        let lines = vec![
            body("Body text listed before its heading in the input.", 1, 0.4),
            heading("Background", 1, 0.1),
            heading("Results", 2, 0.1),
        ];
        let labels = model.classify_lines(&lines).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0].as_str(), "not_heading");
        assert_eq!(labels[1].as_str(), "H1");
        assert_eq!(labels[2].as_str(), "H1");
    }

    #[test]
    fn test_predict_detects_feature_mismatch() {
        let model = train(&training_examples(), &small_forest()).unwrap();
        let bad = vec![FeatureVector::from_values(vec![1.0; 26])];
        assert!(matches!(
            model.predict(&bad),
            Err(Error::FeatureMismatch {
                expected: 27,
                found: 26
            })
        ));
    }

    #[test]
    fn test_evaluate() {
        let examples = training_examples();
        let model = train(&examples, &small_forest()).unwrap();
        let evaluation = model.evaluate(&examples).unwrap();
        assert_eq!(evaluation.support(), examples.len());
        assert!(evaluation.accuracy() > 0.99);
    }

    #[test]
    fn test_save_load_keeps_label_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("headings.json");

        let model = train(&training_examples(), &small_forest()).unwrap();
        model.save(&path).unwrap();
        let loaded = HeadingModel::load(&path).unwrap();

        assert_eq!(loaded.labels(), model.labels());
        assert_eq!(loaded.mode(), model.mode());
        assert_eq!(loaded.example_count(), 36);

        let vectors: Vec<FeatureVector> = training_examples()
            .into_iter()
            .map(|e| e.features)
            .collect();
        assert_eq!(
            loaded.predict(&vectors).unwrap(),
            model.predict(&vectors).unwrap()
        );
    }

    #[test]
    fn test_load_rejects_cyclic_forest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cyclic.json");

        let model = train(&training_examples(), &small_forest()).unwrap();
        let mut value = serde_json::to_value(&model).unwrap();
        value["classifier"]["model"]["trees"][0]["nodes"] = serde_json::json!([
            {"kind": "split", "feature": 0, "threshold": 0.5, "left": 0, "right": 0}
        ]);
        std::fs::write(&path, value.to_string()).unwrap();

        assert!(matches!(
            HeadingModel::load(&path),
            Err(Error::InvalidModel(_))
        ));
    }

    #[test]
    fn test_saved_file_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("headings.json");

        let model = train(&training_examples(), &small_forest()).unwrap();
        model.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, serde_json::to_string(&model).unwrap());
    }

    #[test]
    fn test_load_rejects_other_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");

        let mut model = train(&training_examples(), &small_forest()).unwrap();
        model.schema.version += 1;
        model.save(&path).unwrap();

        assert!(matches!(
            HeadingModel::load(&path),
            Err(Error::SchemaMismatch { .. })
        ));
    }
}
