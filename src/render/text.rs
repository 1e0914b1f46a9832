//! Plain text rendering for outlines.

use crate::model::Outline;

/// Render an outline as an indented list.
///
/// Levels ending in a number (`H1`, `H2`, ...) are indented two spaces per
/// level below the first; other labels are not indented.
pub fn to_text(outline: &Outline) -> String {
    let mut output = String::new();
    output.push_str(&outline.title);
    output.push('\n');

    for entry in &outline.entries {
        let depth = level_depth(entry.level.as_str());
        output.push_str(&"  ".repeat(depth));
        output.push_str(&format!(
            "{} {} (p. {})\n",
            entry.level, entry.text, entry.page
        ));
    }

    output.trim_end().to_string()
}

fn level_depth(level: &str) -> usize {
    let digits = level.trim_start_matches(|c: char| !c.is_ascii_digit());
    digits.parse::<usize>().map(|n| n.saturating_sub(1)).unwrap_or(0)
}
