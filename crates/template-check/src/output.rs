//! Output formatting.

use crate::locator::LocatedDiagnostic;
use crate::orchestrator::{BatchReport, CheckResult};
use camino::Utf8Path;
use clap::ValueEnum;
use serde::Serialize;
use std::time::Duration;

/// Rule printed under the interface header.
const INTERFACE_RULE: &str = "-------------";
/// Banner between the interface and the diagnostics.
const ERRORS_BANNER: &str = "--- Errors --";

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable report (default)
    #[default]
    Human,
    /// JSON array of diagnostics
    Json,
}

/// Renders the report section of one request: the generated interface for
/// debugging, then every diagnostic. Empty when there is nothing to report.
pub fn render_report(
    template: &Utf8Path,
    generated_interface: &str,
    diagnostics: &[LocatedDiagnostic],
) -> String {
    if diagnostics.is_empty() {
        return String::new();
    }

    let mut report = format!("GENERATED INTERFACE from {template}\n{INTERFACE_RULE}\n");
    report.push_str(generated_interface);
    if !generated_interface.ends_with('\n') {
        report.push('\n');
    }
    report.push_str(ERRORS_BANNER);
    report.push('\n');
    for diagnostic in diagnostics {
        report.push_str(&diagnostic.render());
        report.push('\n');
    }
    report
}

/// A diagnostic for JSON output.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct JsonDiagnostic {
    /// Template of the request the diagnostic belongs to.
    pub request: String,
    /// Virtual path the checker reported.
    pub filename: String,
    /// Error or Warning.
    #[serde(rename = "type")]
    pub diagnostic_type: String,
    /// The checker's diagnostic code.
    pub code: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    /// Rendered excerpt with caret, when the source is known.
    pub excerpt: Option<String>,
}

/// Flattens results into JSON-ready diagnostics, in result order.
pub fn json_diagnostics(results: &[CheckResult]) -> Vec<JsonDiagnostic> {
    results
        .iter()
        .flat_map(|result| {
            result.diagnostics.iter().map(|located| {
                let diag = &located.diagnostic;
                JsonDiagnostic {
                    request: result.request.template.to_string(),
                    filename: diag.virtual_path.clone(),
                    diagnostic_type: diag.severity.as_str().to_string(),
                    code: diag.kind.clone(),
                    line: diag.line,
                    column: diag.column,
                    message: diag.message.clone(),
                    excerpt: located.excerpt.as_ref().map(|e| e.render()),
                }
            })
        })
        .collect()
}

/// Formats results as a JSON array.
pub fn format_json(results: &[CheckResult]) -> String {
    serde_json::to_string_pretty(&json_diagnostics(results)).unwrap_or_default()
}

/// Summary of a check run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    /// Number of requests checked.
    pub total: usize,
    /// Requests that reported diagnostics or errored.
    pub failed: usize,
    pub elapsed: Duration,
}

impl CheckSummary {
    /// Summarizes a finished run.
    pub fn from_report(report: &BatchReport) -> Self {
        Self {
            total: report.total,
            failed: report.failed_count(),
            elapsed: report.elapsed,
        }
    }

    /// Whether every request passed.
    pub fn passed(&self) -> bool {
        self.failed == 0
    }

    /// Formats the summary line.
    pub fn format(&self) -> String {
        let seconds = self.elapsed.as_secs_f64();
        if self.passed() {
            format!("{} checks completed in {seconds:.3} seconds", self.total)
        } else {
            format!(
                "{} of {} checks failed in {seconds:.3} seconds",
                self.failed, self.total
            )
        }
    }
}
