//! Line index for 1-based checker positions and line lookup.

use text_size::TextSize;

/// A line and column position (0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LineCol {
    /// 0-indexed line number.
    pub line: u32,
    /// 0-indexed column (byte offset within the line).
    pub col: u32,
}

impl LineCol {
    /// Converts a 1-based checker position into a 0-based one.
    ///
    /// Returns `None` for line 0, which no checker reports for a real location.
    pub fn from_one_based(line: u32, column: u32) -> Option<Self> {
        let line = line.checked_sub(1)?;
        Some(Self {
            line,
            col: column.saturating_sub(1),
        })
    }
}

/// Byte offsets of the start of every line in a source text.
///
/// Lines are separated by `\n`; a trailing `\r` is not part of the line text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// `line_starts[i]` is the offset where line `i` begins.
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    /// Creates a new line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];

        for (offset, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(TextSize::from((offset + 1) as u32));
            }
        }

        Self { line_starts }
    }

    /// Returns the text of a 0-indexed line without its terminator.
    ///
    /// `text` must be the string this index was built from.
    pub fn line_text<'a>(&self, text: &'a str, line: u32) -> Option<&'a str> {
        let line = line as usize;
        let start = usize::from(*self.line_starts.get(line)?);
        let end = self
            .line_starts
            .get(line + 1)
            .map(|&next| usize::from(next) - 1)
            .unwrap_or(text.len());

        let slice = text.get(start..end)?;
        Some(slice.strip_suffix('\r').unwrap_or(slice))
    }
}
