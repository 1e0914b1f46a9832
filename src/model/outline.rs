//! Document outline types.

use super::HeadingLabel;
use serde::{Deserialize, Serialize};

/// A document outline: a title plus headings in encounter order.
///
/// This is both the extraction output and the ground-truth format read by the
/// label aligner, serialized as `{"title": ..., "outline": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    /// Document title
    #[serde(default)]
    pub title: String,

    /// Heading entries, in page order then line order
    #[serde(rename = "outline", default)]
    pub entries: Vec<OutlineEntry>,
}

impl Outline {
    /// Create a new empty outline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to the outline.
    pub fn add_entry(&mut self, entry: OutlineEntry) {
        self.entries.push(entry);
    }

    /// Check if the outline has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries carrying the given level.
    pub fn entries_at<'a>(&'a self, level: &'a str) -> impl Iterator<Item = &'a OutlineEntry> {
        self.entries.iter().filter(move |e| e.level.as_str() == level)
    }
}

/// A single heading in an outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Heading level (never `not_heading`)
    pub level: HeadingLabel,

    /// Heading text
    pub text: String,

    /// Page number (1-indexed)
    pub page: u32,
}

impl OutlineEntry {
    /// Create a new outline entry.
    pub fn new(level: impl Into<HeadingLabel>, text: impl Into<String>, page: u32) -> Self {
        Self {
            level: level.into(),
            text: text.into(),
            page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_new() {
        let outline = Outline::new();
        assert!(outline.is_empty());
        assert_eq!(outline.title, "");
    }

    #[test]
    fn test_outline_json_shape() {
        let mut outline = Outline::new();
        outline.title = "Annual Report".to_string();
        outline.add_entry(OutlineEntry::new("H1", "Summary", 1));

        let json = serde_json::to_value(&outline).unwrap();
        assert_eq!(json["title"], "Annual Report");
        assert_eq!(json["outline"][0]["level"], "H1");
        assert_eq!(json["outline"][0]["text"], "Summary");
        assert_eq!(json["outline"][0]["page"], 1);
    }

    #[test]
    fn test_outline_parse_without_title() {
        let outline: Outline =
            serde_json::from_str(r#"{"outline":[{"level":"H2","text":"Scope","page":4}]}"#)
                .unwrap();
        assert_eq!(outline.title, "");
        assert_eq!(outline.len(), 1);
        assert_eq!(outline.entries_at("H2").count(), 1);
    }
}
