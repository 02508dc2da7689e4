//! Module id extraction from transpiled output.

use thiserror::Error;

const DECLARATION_OPEN: &str = "goog.module('";
const DECLARATION_CLOSE: &str = "')";

/// The transpiled text did not start with a module declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleIdError {
    /// The transpiler produced no text at all.
    #[error("transpiled interface is empty")]
    Empty,

    /// The first statement is not `goog.module('...')`.
    #[error("transpiled interface does not start with a module declaration: {first_line}")]
    MissingDeclaration { first_line: String },
}

/// Extracts `<name>` from `goog.module('<name>')` at the start of `text`.
///
/// Only the first line is considered and the capture runs to the last `')`
/// on that line.
pub fn parse_module_id(text: &str) -> Result<String, ModuleIdError> {
    if text.is_empty() {
        return Err(ModuleIdError::Empty);
    }

    let first_line = text.lines().next().unwrap_or_default();
    first_line
        .strip_prefix(DECLARATION_OPEN)
        .and_then(|rest| rest.rfind(DECLARATION_CLOSE).map(|end| &rest[..end]))
        .map(str::to_string)
        .ok_or_else(|| ModuleIdError::MissingDeclaration {
            first_line: first_line.to_string(),
        })
}
