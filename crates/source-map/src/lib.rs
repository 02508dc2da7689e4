//! Source position lookup for template-check.
//!
//! Checker diagnostics carry 1-based line/column pairs into the sources that
//! were handed to the checker. This crate resolves such a pair against the
//! original text and renders the trimmed, labelled excerpt with a caret
//! aligned under the reported column.

mod excerpt;
mod line_index;

pub use excerpt::{caret_offset, Excerpt};
pub use line_index::{LineCol, LineIndex};
