//! Text line records produced by the layout parser.

use serde::{Deserialize, Serialize};

/// One non-empty text line with its typography and position.
///
/// Lines are produced by a line source (see [`crate::source`]) and never
/// mutated afterwards. Within a document a line is identified by its trimmed
/// text and page number, which is not guaranteed to be unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// The line text (spans joined by a single space)
    pub text: String,

    /// Page number (1-indexed)
    pub page: u32,

    /// Font size of the first span, in points
    pub font_size: f64,

    /// Whether the first span's font is bold
    pub is_bold: bool,

    /// Whether the first span's font is italic or oblique
    pub is_italic: bool,

    /// Top of the line divided by page height
    pub rel_y: f64,

    /// Character count
    pub length: usize,

    /// Whitespace-separated word count
    pub num_words: usize,

    /// Left edge of the line
    pub x: f64,

    /// Packed sRGB color of the first span
    pub color: i64,
}

impl TextLine {
    /// Create a line from its text, deriving `length` and `num_words`.
    ///
    /// Typography and position default to a 12pt regular line at the top-left
    /// corner; use the `with_*` builders to set them.
    pub fn new(text: impl Into<String>, page: u32) -> Self {
        let text = text.into();
        let length = text.chars().count();
        let num_words = text.split_whitespace().count();
        Self {
            text,
            page,
            font_size: 12.0,
            is_bold: false,
            is_italic: false,
            rel_y: 0.0,
            length,
            num_words,
            x: 0.0,
            color: 0,
        }
    }

    /// Set font size and style.
    pub fn with_font(mut self, font_size: f64, is_bold: bool, is_italic: bool) -> Self {
        self.font_size = font_size;
        self.is_bold = is_bold;
        self.is_italic = is_italic;
        self
    }

    /// Set the horizontal offset and relative vertical position.
    pub fn with_position(mut self, x: f64, rel_y: f64) -> Self {
        self.x = x;
        self.rel_y = rel_y;
        self
    }

    /// Set the text color.
    pub fn with_color(mut self, color: i64) -> Self {
        self.color = color;
        self
    }

    /// The alignment key text: surrounding whitespace stripped.
    pub fn normalized_text(&self) -> &str {
        self.text.trim()
    }
}
