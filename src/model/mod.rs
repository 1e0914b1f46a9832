//! Document model types for heading classification.
//!
//! These types sit between the layout parser and the outline output: text
//! lines coming in, labels assigned by the classifier, outlines going out.

mod label;
mod line;
mod outline;

pub use label::HeadingLabel;
pub use line::TextLine;
pub use outline::{Outline, OutlineEntry};
