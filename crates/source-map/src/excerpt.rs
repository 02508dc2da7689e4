//! Labelled single-line excerpts with a caret under the reported column.

use crate::line_index::{LineCol, LineIndex};

/// Number of dashes printed before the caret.
///
/// The excerpt line is printed as `label + trimmed_line`, so the caret moves
/// right by the label width and left by the stripped leading whitespace.
/// Columns that point into the stripped whitespace clamp to zero.
pub fn caret_offset(column: u32, label_len: usize, leading_ws: usize) -> usize {
    (column.saturating_sub(1) as usize + label_len).saturating_sub(leading_ws)
}

/// One source line ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt {
    /// The `"N: "` prefix.
    pub label: String,
    /// The line with surrounding whitespace removed.
    pub text: String,
    /// Dash count before the caret.
    pub caret_offset: usize,
}

impl Excerpt {
    /// Builds the excerpt for a 1-based `line`/`column` in `source`.
    ///
    /// Returns `None` when the line does not exist in `source`.
    pub fn new(source: &str, index: &LineIndex, line: u32, column: u32) -> Option<Self> {
        let position = LineCol::from_one_based(line, column)?;
        let original = index.line_text(source, position.line)?;
        let text = original.trim();
        let leading_ws = original.chars().count() - original.trim_start().chars().count();
        let label = format!("{line}: ");
        let caret_offset = caret_offset(column, label.chars().count(), leading_ws);

        Some(Self {
            text: text.to_string(),
            caret_offset,
            label,
        })
    }

    /// Convenience for a one-off lookup without a prebuilt index.
    pub fn from_source(source: &str, line: u32, column: u32) -> Option<Self> {
        Self::new(source, &LineIndex::new(source), line, column)
    }

    /// Renders the two excerpt lines, each terminated by a newline.
    pub fn render(&self) -> String {
        format!(
            "{}{}\n{} ^\n",
            self.label,
            self.text,
            "-".repeat(self.caret_offset)
        )
    }
}
