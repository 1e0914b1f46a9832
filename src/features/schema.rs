//! Named, versioned feature layout.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Version of the feature layout produced by this build.
///
/// Bump whenever a feature is added, removed, reordered, or its definition
/// changes; models trained on another version are rejected on load.
pub const SCHEMA_VERSION: u32 = 1;

/// One dimension of the feature vector, in vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    FontSize,
    IsBold,
    IsItalic,
    RelY,
    Length,
    NumWords,
    X,
    Color,
    TextLength,
    StartsWithNumber,
    EndsWithColon,
    AllCaps,
    TitleCase,
    HasNumbers,
    HasSpecialChars,
    FontSizeLarge,
    FontSizeMedium,
    FontSizeSmall,
    PositionTop,
    PositionMiddle,
    PositionBottom,
    ShortText,
    MediumText,
    LongText,
    SingleWord,
    FewWords,
    ManyWords,
}

impl Feature {
    /// Number of dimensions.
    pub const COUNT: usize = 27;

    /// All dimensions in vector order.
    pub const ALL: [Feature; Feature::COUNT] = [
        Feature::FontSize,
        Feature::IsBold,
        Feature::IsItalic,
        Feature::RelY,
        Feature::Length,
        Feature::NumWords,
        Feature::X,
        Feature::Color,
        Feature::TextLength,
        Feature::StartsWithNumber,
        Feature::EndsWithColon,
        Feature::AllCaps,
        Feature::TitleCase,
        Feature::HasNumbers,
        Feature::HasSpecialChars,
        Feature::FontSizeLarge,
        Feature::FontSizeMedium,
        Feature::FontSizeSmall,
        Feature::PositionTop,
        Feature::PositionMiddle,
        Feature::PositionBottom,
        Feature::ShortText,
        Feature::MediumText,
        Feature::LongText,
        Feature::SingleWord,
        Feature::FewWords,
        Feature::ManyWords,
    ];

    /// Raw line attributes passed through unchanged.
    pub const RAW: [Feature; 8] = [
        Feature::FontSize,
        Feature::IsBold,
        Feature::IsItalic,
        Feature::RelY,
        Feature::Length,
        Feature::NumWords,
        Feature::X,
        Feature::Color,
    ];

    /// Position of this dimension in the vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name used in training tables and model schemas.
    pub fn name(self) -> &'static str {
        match self {
            Feature::FontSize => "font_size",
            Feature::IsBold => "is_bold",
            Feature::IsItalic => "is_italic",
            Feature::RelY => "rel_y",
            Feature::Length => "length",
            Feature::NumWords => "num_words",
            Feature::X => "x",
            Feature::Color => "color",
            Feature::TextLength => "text_length",
            Feature::StartsWithNumber => "starts_with_number",
            Feature::EndsWithColon => "ends_with_colon",
            Feature::AllCaps => "all_caps",
            Feature::TitleCase => "title_case",
            Feature::HasNumbers => "has_numbers",
            Feature::HasSpecialChars => "has_special_chars",
            Feature::FontSizeLarge => "font_size_large",
            Feature::FontSizeMedium => "font_size_medium",
            Feature::FontSizeSmall => "font_size_small",
            Feature::PositionTop => "position_top",
            Feature::PositionMiddle => "position_middle",
            Feature::PositionBottom => "position_bottom",
            Feature::ShortText => "short_text",
            Feature::MediumText => "medium_text",
            Feature::LongText => "long_text",
            Feature::SingleWord => "single_word",
            Feature::FewWords => "few_words",
            Feature::ManyWords => "many_words",
        }
    }

    /// Dimensions derived from the line, i.e. everything after the raw block.
    pub fn derived() -> &'static [Feature] {
        &Feature::ALL[Feature::RAW.len()..]
    }
}

/// Feature layout a model was trained against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Layout version
    pub version: u32,

    /// Dimension names in vector order
    pub names: Vec<String>,
}

impl FeatureSchema {
    /// The layout produced by [`crate::features::extract`].
    pub fn current() -> Self {
        Self {
            version: SCHEMA_VERSION,
            names: Feature::ALL.iter().map(|f| f.name().to_string()).collect(),
        }
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the schema has no dimensions.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Check that this schema matches the extractor of this build.
    pub fn ensure_current(&self) -> Result<()> {
        let current = Self::current();
        if self.version != current.version {
            return Err(Error::SchemaMismatch {
                model: self.version,
                current: current.version,
            });
        }
        if self.names.len() != current.names.len() {
            return Err(Error::FeatureMismatch {
                expected: self.names.len(),
                found: current.names.len(),
            });
        }
        if let Some((have, want)) = self
            .names
            .iter()
            .zip(&current.names)
            .find(|(have, want)| have != want)
        {
            return Err(Error::InvalidModel(format!(
                "feature '{}' where '{}' was expected",
                have, want
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_order() {
        for (i, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(), i);
        }
        assert_eq!(Feature::ManyWords.index(), Feature::COUNT - 1);
    }

    #[test]
    fn test_derived_columns() {
        let derived = Feature::derived();
        assert_eq!(derived.len(), 19);
        assert_eq!(derived[0], Feature::TextLength);
        assert_eq!(derived[18], Feature::ManyWords);
    }

    #[test]
    fn test_current_schema_is_current() {
        let schema = FeatureSchema::current();
        assert_eq!(schema.len(), 27);
        assert!(schema.ensure_current().is_ok());
    }

    #[test]
    fn test_old_schema_rejected() {
        let mut schema = FeatureSchema::current();
        schema.version = 0;
        assert!(matches!(
            schema.ensure_current(),
            Err(Error::SchemaMismatch { model: 0, .. })
        ));
    }

    #[test]
    fn test_truncated_schema_rejected() {
        let mut schema = FeatureSchema::current();
        schema.names.truncate(8);
        assert!(matches!(
            schema.ensure_current(),
            Err(Error::FeatureMismatch {
                expected: 8,
                found: 27
            })
        ));
    }

    #[test]
    fn test_reordered_schema_rejected() {
        let mut schema = FeatureSchema::current();
        schema.names.swap(0, 1);
        assert!(matches!(
            schema.ensure_current(),
            Err(Error::InvalidModel(_))
        ));
    }
}
