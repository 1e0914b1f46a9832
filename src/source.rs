//! Text line source backed by layout dumps.
//!
//! PDF parsing happens upstream. The parser's per-page output (blocks of
//! lines, each line a list of styled spans with a bounding box) is stored as a
//! `*.layout.json` file, and this module turns it into [`TextLine`] records:
//!
//! ```json
//! {"pages": [{"width": 612, "height": 792, "blocks": [
//!   {"type": 0, "lines": [{"bbox": [72, 70, 300, 88],
//!     "spans": [{"text": "Overview", "size": 16, "font": "Helvetica-Bold", "color": 0}]}]}
//! ]}]}
//! ```
//!
//! Block type 0 is text; every other block type (images, drawings) is skipped.

use crate::error::{Error, Result};
use crate::model::TextLine;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// File suffix of layout dumps.
pub const LAYOUT_SUFFIX: &str = ".layout.json";

/// Block type code for text blocks.
const TEXT_BLOCK: u32 = 0;

/// A parsed document as emitted by the layout parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutDocument {
    /// Pages in document order
    #[serde(default)]
    pub pages: Vec<LayoutPage>,
}

/// One page of a layout dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutPage {
    /// Page width in points
    pub width: f64,

    /// Page height in points
    pub height: f64,

    /// Content blocks in reading order
    #[serde(default)]
    pub blocks: Vec<LayoutBlock>,
}

/// A block of lines, or a non-text block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutBlock {
    /// Block type (0 = text)
    #[serde(rename = "type", default)]
    pub kind: u32,

    /// Lines of a text block
    #[serde(default)]
    pub lines: Vec<LayoutLine>,
}

/// A line: spans sharing a baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutLine {
    /// Bounding box `[x0, y0, x1, y1]`, y growing downwards
    pub bbox: [f64; 4],

    /// Spans in left-to-right order
    #[serde(default)]
    pub spans: Vec<LayoutSpan>,
}

/// A run of text in a single font.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSpan {
    /// Span text
    pub text: String,

    /// Font size in points
    pub size: f64,

    /// Font name (e.g., "Helvetica-Bold")
    #[serde(default)]
    pub font: String,

    /// Packed sRGB color
    #[serde(default)]
    pub color: i64,
}

impl LayoutSpan {
    /// Whether the span's font is bold.
    pub fn is_bold(&self) -> bool {
        self.font.contains("Bold")
    }

    /// Whether the span's font is italic or oblique.
    pub fn is_italic(&self) -> bool {
        self.font.contains("Italic") || self.font.contains("Oblique")
    }
}

impl LayoutDocument {
    /// Parse a layout dump.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let doc: Self = serde_json::from_reader(reader)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Parse a layout dump from a string.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Load a layout dump file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    fn validate(&self) -> Result<()> {
        for (i, page) in self.pages.iter().enumerate() {
            if !(page.height.is_finite() && page.height > 0.0) {
                return Err(Error::Layout(format!(
                    "page {} has invalid height {}",
                    i + 1,
                    page.height
                )));
            }
        }
        Ok(())
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Non-empty text lines, page by page, in parser order.
    pub fn lines(&self) -> impl Iterator<Item = TextLine> + '_ {
        self.pages
            .iter()
            .enumerate()
            .flat_map(|(i, page)| page.lines(i as u32 + 1))
    }
}

impl LayoutPage {
    /// Non-empty text lines of this page.
    pub fn lines(&self, page: u32) -> impl Iterator<Item = TextLine> + '_ {
        self.blocks
            .iter()
            .filter(|block| block.kind == TEXT_BLOCK)
            .flat_map(|block| block.lines.iter())
            .filter_map(move |line| self.text_line(line, page))
    }

    fn text_line(&self, line: &LayoutLine, page: u32) -> Option<TextLine> {
        let first = line.spans.first()?;
        let joined = line
            .spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let text = joined.trim();
        if text.is_empty() {
            return None;
        }

        Some(
            TextLine::new(text, page)
                .with_font(first.size, first.is_bold(), first.is_italic())
                .with_position(line.bbox[0], line.bbox[1] / self.height)
                .with_color(first.color),
        )
    }
}

/// Layout dumps in a directory, sorted by file name.
pub fn layout_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_layout = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(LAYOUT_SUFFIX));
        if is_layout && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Document stem of a layout dump (`report.layout.json` → `report`).
pub fn document_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(LAYOUT_SUFFIX) {
        Some(stem) => stem.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(name),
    }
}
