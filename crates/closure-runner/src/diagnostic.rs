//! Compilation unit and diagnostic types.

use serde::{Deserialize, Serialize};

/// One source handed to the checker under a virtual path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualSourceFile {
    /// Path the checker reports diagnostics against.
    pub path: String,
    /// Source text.
    #[serde(rename = "src")]
    pub source: String,
}

impl VirtualSourceFile {
    /// Creates a virtual source file.
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

impl DiagnosticSeverity {
    /// Convert to display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
        }
    }
}

/// A diagnostic reported by the checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Virtual path of the file the diagnostic refers to; empty when the
    /// checker did not attribute it to a file.
    pub virtual_path: String,
    /// The checker's description.
    pub message: String,
    /// The checker's diagnostic type (e.g. `JSC_TYPE_MISMATCH`).
    pub kind: String,
    /// Error or warning.
    pub severity: DiagnosticSeverity,
    /// 1-indexed line number.
    pub line: u32,
    /// Column as reported by the checker.
    pub column: u32,
}

/// A raw diagnostic in the checker's wire format.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDiagnostic {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub line_no: i64,
    #[serde(default)]
    pub char_no: i64,
}

impl RawDiagnostic {
    fn into_diagnostic(self, severity: DiagnosticSeverity) -> Diagnostic {
        Diagnostic {
            virtual_path: self.file.unwrap_or_default(),
            message: self.description,
            kind: self.kind,
            severity,
            line: clamp_position(self.line_no),
            column: clamp_position(self.char_no),
        }
    }
}

fn clamp_position(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

/// Everything one checker invocation reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckerOutput {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl CheckerOutput {
    pub(crate) fn from_raw(errors: Vec<RawDiagnostic>, warnings: Vec<RawDiagnostic>) -> Self {
        Self {
            errors: errors
                .into_iter()
                .map(|raw| raw.into_diagnostic(DiagnosticSeverity::Error))
                .collect(),
            warnings: warnings
                .into_iter()
                .map(|raw| raw.into_diagnostic(DiagnosticSeverity::Warning))
                .collect(),
        }
    }

    /// Whether the checker reported nothing.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Errors followed by warnings, each in reported order.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        let mut diagnostics = self.errors;
        diagnostics.extend(self.warnings);
        diagnostics
    }
}
