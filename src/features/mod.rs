//! Line feature extraction.
//!
//! Every text line is encoded as a fixed-order vector of 27 numbers: the raw
//! typography and position attributes, lexical flags on the text, and
//! thresholded bins. Training and inference both go through [`extract`], so
//! the encoding cannot drift between the two.
//!
//! # Example
//!
//! ```
//! use headmark::features::{extract, Feature};
//! use headmark::model::TextLine;
//!
//! let line = TextLine::new("1. Introduction", 1).with_font(16.0, true, false);
//! let features = extract(&line);
//!
//! assert_eq!(features.len(), Feature::COUNT);
//! assert_eq!(features.get(Feature::StartsWithNumber), 1.0);
//! assert_eq!(features.get(Feature::FontSizeLarge), 1.0);
//! ```

mod schema;

pub use schema::{Feature, FeatureSchema, SCHEMA_VERSION};

use crate::model::TextLine;
use serde::{Deserialize, Serialize};

/// Numeric encoding of one text line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Wrap precomputed values.
    ///
    /// The classifier validates the length against its schema before use.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Value of one dimension.
    ///
    /// Returns 0.0 if the vector is shorter than the schema.
    pub fn get(&self, feature: Feature) -> f64 {
        self.values.get(feature.index()).copied().unwrap_or(0.0)
    }

    /// All values in schema order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no dimensions.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Encode a text line.
pub fn extract(line: &TextLine) -> FeatureVector {
    let text = line.text.as_str();
    let font_size = line.font_size;
    let rel_y = line.rel_y;
    let length = line.length;
    let num_words = line.num_words;

    let values = vec![
        font_size,
        flag(line.is_bold),
        flag(line.is_italic),
        rel_y,
        length as f64,
        num_words as f64,
        line.x,
        line.color as f64,
        text.chars().count() as f64,
        flag(text.chars().next().is_some_and(|c| c.is_ascii_digit())),
        flag(text.ends_with(':')),
        flag(is_all_caps(text)),
        flag(is_title_case(text)),
        flag(text.chars().any(|c| c.is_ascii_digit())),
        flag(text.chars().any(|c| "()[]{}".contains(c))),
        flag(font_size > 14.0),
        flag((10.0..=14.0).contains(&font_size)),
        flag(font_size < 10.0),
        flag(rel_y < 0.2),
        flag((0.2..=0.8).contains(&rel_y)),
        flag(rel_y > 0.8),
        flag(length < 20),
        flag((20..=50).contains(&length)),
        flag(length > 50),
        flag(num_words == 1),
        flag((2..=5).contains(&num_words)),
        flag(num_words > 5),
    ];
    debug_assert_eq!(values.len(), Feature::COUNT);

    FeatureVector { values }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// At least one cased character and no lowercase ones.
fn is_all_caps(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

/// Every word starts with an uppercase letter followed only by lowercase ones.
///
/// A word is a run of cased characters; digits and punctuation separate words.
fn is_title_case(text: &str) -> bool {
    let mut cased = false;
    let mut previous_cased = false;

    for c in text.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else {
            previous_cased = false;
        }
    }

    cased
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> TextLine {
        TextLine::new(text, 1)
    }

    fn bins(v: &FeatureVector, triplet: [Feature; 3]) -> f64 {
        triplet.iter().map(|f| v.get(*f)).sum()
    }

    #[test]
    fn test_raw_attributes_pass_through() {
        let l = TextLine::new("Revenue by region", 4)
            .with_font(11.5, true, true)
            .with_position(56.7, 0.43)
            .with_color(255);
        let v = extract(&l);

        assert_eq!(v.get(Feature::FontSize), 11.5);
        assert_eq!(v.get(Feature::IsBold), 1.0);
        assert_eq!(v.get(Feature::IsItalic), 1.0);
        assert_eq!(v.get(Feature::RelY), 0.43);
        assert_eq!(v.get(Feature::Length), 17.0);
        assert_eq!(v.get(Feature::NumWords), 3.0);
        assert_eq!(v.get(Feature::X), 56.7);
        assert_eq!(v.get(Feature::Color), 255.0);
        assert_eq!(v.get(Feature::TextLength), 17.0);
    }

    #[test]
    fn test_deterministic() {
        let l = TextLine::new("Appendix A: Glossary", 9)
            .with_font(13.0, false, false)
            .with_position(90.0, 0.81);
        assert_eq!(extract(&l), extract(&l.clone()));
    }

    #[test]
    fn test_lexical_flags() {
        let v = extract(&line("3 RESULTS:"));
        assert_eq!(v.get(Feature::StartsWithNumber), 1.0);
        assert_eq!(v.get(Feature::EndsWithColon), 1.0);
        assert_eq!(v.get(Feature::AllCaps), 1.0);
        assert_eq!(v.get(Feature::TitleCase), 0.0);
        assert_eq!(v.get(Feature::HasNumbers), 1.0);
        assert_eq!(v.get(Feature::HasSpecialChars), 0.0);

        let v = extract(&line("Table Of Contents (draft)"));
        assert_eq!(v.get(Feature::StartsWithNumber), 0.0);
        assert_eq!(v.get(Feature::AllCaps), 0.0);
        assert_eq!(v.get(Feature::TitleCase), 0.0);
        assert_eq!(v.get(Feature::HasSpecialChars), 1.0);
    }

    #[test]
    fn test_numeric_symbols_are_not_digits() {
        let v = extract(&line("Ⅳ Results ½"));
        assert_eq!(v.get(Feature::StartsWithNumber), 0.0);
        assert_eq!(v.get(Feature::HasNumbers), 0.0);

        let v = extract(&line("Appendix 2"));
        assert_eq!(v.get(Feature::StartsWithNumber), 0.0);
        assert_eq!(v.get(Feature::HasNumbers), 1.0);
    }

    #[test]
    fn test_empty_text_flags() {
        let v = extract(&line(""));
        for feature in [
            Feature::TextLength,
            Feature::StartsWithNumber,
            Feature::EndsWithColon,
            Feature::AllCaps,
            Feature::TitleCase,
            Feature::HasNumbers,
            Feature::HasSpecialChars,
        ] {
            assert_eq!(v.get(feature), 0.0, "{}", feature.name());
        }
    }

    #[test]
    fn test_title_case() {
        assert!(is_title_case("Introduction"));
        assert!(is_title_case("Scope Of Work"));
        assert!(is_title_case("2. Background And Motivation"));
        assert!(is_title_case("Q&A"));
        assert!(!is_title_case("Scope of work"));
        assert!(!is_title_case("HTML Parser"));
        assert!(!is_title_case("1234"));
        assert!(!is_title_case(""));
    }

    #[test]
    fn test_all_caps() {
        assert!(is_all_caps("SUMMARY"));
        assert!(is_all_caps("PART 2 - RESULTS"));
        assert!(!is_all_caps("Summary"));
        assert!(!is_all_caps("2024"));
    }

    #[test]
    fn test_font_bins_exclusive() {
        for size in [0.0, 6.5, 9.99, 10.0, 12.0, 14.0, 14.01, 28.0] {
            let v = extract(&line("x").with_font(size, false, false));
            let triplet = [
                Feature::FontSizeLarge,
                Feature::FontSizeMedium,
                Feature::FontSizeSmall,
            ];
            assert_eq!(bins(&v, triplet), 1.0, "font size {}", size);
        }
        let v = extract(&line("x").with_font(14.0, false, false));
        assert_eq!(v.get(Feature::FontSizeMedium), 1.0);
        let v = extract(&line("x").with_font(10.0, false, false));
        assert_eq!(v.get(Feature::FontSizeMedium), 1.0);
    }

    #[test]
    fn test_position_bins_exclusive() {
        for rel_y in [0.0, 0.19, 0.2, 0.5, 0.8, 0.81, 1.0] {
            let v = extract(&line("x").with_position(0.0, rel_y));
            let triplet = [
                Feature::PositionTop,
                Feature::PositionMiddle,
                Feature::PositionBottom,
            ];
            assert_eq!(bins(&v, triplet), 1.0, "rel_y {}", rel_y);
        }
        let v = extract(&line("x").with_position(0.0, 0.8));
        assert_eq!(v.get(Feature::PositionMiddle), 1.0);
    }

    #[test]
    fn test_length_bins_exclusive() {
        for n in [1, 19, 20, 35, 50, 51, 200] {
            let v = extract(&line(&"a".repeat(n)));
            let triplet = [Feature::ShortText, Feature::MediumText, Feature::LongText];
            assert_eq!(bins(&v, triplet), 1.0, "length {}", n);
        }
        assert_eq!(extract(&line(&"a".repeat(20))).get(Feature::MediumText), 1.0);
        assert_eq!(extract(&line(&"a".repeat(50))).get(Feature::MediumText), 1.0);
    }

    #[test]
    fn test_word_bins_exclusive() {
        for n in 1..=9 {
            let text = vec!["word"; n].join(" ");
            let v = extract(&line(&text));
            let triplet = [Feature::SingleWord, Feature::FewWords, Feature::ManyWords];
            assert_eq!(bins(&v, triplet), 1.0, "words {}", n);
        }
        assert_eq!(extract(&line("one")).get(Feature::SingleWord), 1.0);
        assert_eq!(extract(&line("a b c d e")).get(Feature::FewWords), 1.0);
        assert_eq!(extract(&line("a b c d e f")).get(Feature::ManyWords), 1.0);
    }
}
