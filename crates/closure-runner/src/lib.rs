//! Type-checker runner for template-check.
//!
//! A compilation unit is an ordered list of virtual source files. The checker
//! sees only virtual paths; nothing is written to disk. Errors and warnings
//! come back in the order the checker reported them, errors first.
//!
//! # Example
//!
//! ```ignore
//! use closure_runner::{Checker, CheckerFlags, NodeClosureChecker, VirtualSourceFile};
//!
//! let sources = vec![VirtualSourceFile::new("a.js", "goog.module('a');")];
//! let output = checker.compile(&sources, &CheckerFlags::default()).await?;
//! for diag in output.into_diagnostics() {
//!     println!("{}:{}: {}", diag.virtual_path, diag.line, diag.message);
//! }
//! ```

mod checker;
mod diagnostic;
mod externs;

pub use checker::{Checker, CheckerError, CheckerFlags, NodeClosureChecker, WarningLevel};
pub use diagnostic::{CheckerOutput, Diagnostic, DiagnosticSeverity, VirtualSourceFile};
pub use externs::{find_polymer_externs, POLYMER_EXTERNS_PATH};
