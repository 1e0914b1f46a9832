//! Heading labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A heading level assigned to a line.
///
/// The vocabulary is open: whatever labels appear in training data are valid
/// (conventionally `Title`, `H1`, `H2`, `H3`). The sentinel
/// [`HeadingLabel::NOT_HEADING`] marks ordinary body text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeadingLabel(String);

impl HeadingLabel {
    /// Label string of the non-heading sentinel.
    pub const NOT_HEADING: &'static str = "not_heading";

    /// Create a label from its string form.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The non-heading sentinel.
    pub fn not_heading() -> Self {
        Self(Self::NOT_HEADING.to_string())
    }

    /// Whether this label denotes a heading of any level.
    pub fn is_heading(&self) -> bool {
        self.0 != Self::NOT_HEADING
    }

    /// Label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HeadingLabel {
    fn default() -> Self {
        Self::not_heading()
    }
}

impl fmt::Display for HeadingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HeadingLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for HeadingLabel {
    fn from(label: String) -> Self {
        Self(label)
    }
}
