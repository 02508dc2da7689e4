//! Runs check requests through synthesis, transpilation and the checker.

use crate::locator::{LocatedDiagnostic, Locator};
use crate::output::render_report;
use crate::registry::{stable_module_name, RegistryError, SourceRegistry, UnitMember};
use crate::request::CheckRequest;
use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use closure_runner::{Checker, CheckerError, CheckerFlags, CheckerOutput, Diagnostic};
use futures::future::try_join_all;
use interface_gen::{synthetic_name, InterfaceSynthesizer, SynthesisError};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use transpile_runner::{compile_interface, InterfaceArtifact, TranspileError, Transpiler};

/// How requests are grouped into compilation units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// One compilation unit shared by every request.
    #[default]
    Batch,
    /// One compilation unit per request.
    Single,
}

/// Options fixed for a whole run.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub mode: CheckMode,
    /// Framework externs text, registered first in every unit.
    pub externs: String,
    pub flags: CheckerFlags,
    /// Relative view-model paths resolve against this directory.
    pub workspace: Utf8PathBuf,
}

impl CheckOptions {
    /// Batch-mode options with default checker flags.
    pub fn new(externs: impl Into<String>, workspace: impl Into<Utf8PathBuf>) -> Self {
        Self {
            mode: CheckMode::default(),
            externs: externs.into(),
            flags: CheckerFlags::default(),
            workspace: workspace.into(),
        }
    }

    /// Sets the mode.
    pub fn with_mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }
}

/// The three external collaborators.
#[derive(Clone)]
pub struct Toolchain {
    pub synthesizer: Arc<dyn InterfaceSynthesizer>,
    pub transpiler: Arc<dyn Transpiler>,
    pub checker: Arc<dyn Checker>,
}

/// Errors that stop a compilation unit.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The interface generator failed for a template.
    #[error("request {index} ({template}): {source}")]
    Synthesis {
        index: usize,
        template: Utf8PathBuf,
        source: SynthesisError,
    },

    /// The view-model source could not be read.
    #[error("request {index}: failed to read view-model {path}: {source}")]
    ReadViewModel {
        index: usize,
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    /// The generated interface could not be transpiled.
    #[error("request {index} ({template}): {source}")]
    Transpile {
        index: usize,
        template: Utf8PathBuf,
        source: TranspileError,
    },

    /// The compilation unit could not be assembled.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The checker itself failed.
    #[error(transparent)]
    Checker(#[from] CheckerError),
}

impl CheckError {
    /// The request the error is specific to, if any.
    pub fn request_index(&self) -> Option<usize> {
        match self {
            Self::Synthesis { index, .. }
            | Self::ReadViewModel { index, .. }
            | Self::Transpile { index, .. } => Some(*index),
            Self::Registry(_) | Self::Checker(_) => None,
        }
    }
}

/// Verdict for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub request: CheckRequest,
    /// Position of the request in the run.
    pub index: usize,
    /// Transpiled interface the view-model was checked against.
    pub generated_interface: String,
    /// Diagnostics attributed to this request, in checker order.
    pub diagnostics: Vec<LocatedDiagnostic>,
    /// Human report; empty when the request passed.
    pub formatted_report: String,
}

impl CheckResult {
    /// Whether the checker reported nothing for this request.
    pub fn passed(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Number of requests in the run.
    pub total: usize,
    pub results: Vec<CheckResult>,
    /// Units that stopped before producing results.
    pub errors: Vec<CheckError>,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Requests without a passing result.
    pub fn failed_count(&self) -> usize {
        self.total - self.results.iter().filter(|r| r.passed()).count()
    }

    /// Whether every request produced a passing result.
    pub fn passed(&self) -> bool {
        self.failed_count() == 0 && self.errors.is_empty()
    }

    /// The results, or an error when any request failed or errored.
    pub fn into_result(self) -> Result<Vec<CheckResult>, AggregateCheckError> {
        if self.passed() {
            return Ok(self.results);
        }
        Err(AggregateCheckError {
            failed: self.failed_count(),
            total: self.total,
            results: self.results,
            errors: self.errors,
        })
    }
}

/// At least one request failed.
#[derive(Debug, Error)]
#[error("{failed} of {total} checks failed")]
pub struct AggregateCheckError {
    pub failed: usize,
    pub total: usize,
    pub results: Vec<CheckResult>,
    pub errors: Vec<CheckError>,
}

/// A request whose interface is transpiled and whose view-model is loaded.
struct Prepared {
    view_source: String,
    artifact: InterfaceArtifact,
}

/// Checks view-models against the interfaces their templates imply.
pub struct TemplateChecker {
    toolchain: Toolchain,
    options: CheckOptions,
}

impl TemplateChecker {
    /// Creates a checker.
    pub fn new(toolchain: Toolchain, options: CheckOptions) -> Self {
        Self { toolchain, options }
    }

    /// Run options.
    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Checks every request and reports per-request results.
    ///
    /// In batch mode a failing unit fails every request. In single mode each
    /// request is its own unit, so one request's error leaves the others
    /// untouched.
    pub async fn run(&self, requests: &[CheckRequest]) -> BatchReport {
        let start = Instant::now();
        let mut report = BatchReport {
            total: requests.len(),
            ..Default::default()
        };
        let indexed: Vec<(usize, &CheckRequest)> = requests.iter().enumerate().collect();

        if !indexed.is_empty() {
            match self.options.mode {
                CheckMode::Batch => match self.check_unit(&indexed).await {
                    Ok(results) => report.results = results,
                    Err(err) => report.errors.push(err),
                },
                CheckMode::Single => {
                    for entry in &indexed {
                        match self.check_unit(std::slice::from_ref(entry)).await {
                            Ok(results) => report.results.extend(results),
                            Err(err) => report.errors.push(err),
                        }
                    }
                }
            }
        }

        report.elapsed = start.elapsed();
        info!(
            total = report.total,
            failed = report.failed_count(),
            elapsed = ?report.elapsed,
            "check run finished"
        );
        report
    }

    /// Checks one compilation unit. Every artifact created for the unit is
    /// released before this returns, whatever the outcome.
    async fn check_unit(
        &self,
        requests: &[(usize, &CheckRequest)],
    ) -> Result<Vec<CheckResult>, CheckError> {
        // On failure the artifacts prepared so far are dropped, which
        // deletes their files.
        let prepared = try_join_all(
            requests
                .iter()
                .enumerate()
                .map(|(slot, (index, request))| self.prepare(slot, *index, request)),
        )
        .await?;

        let checked = self.compile(requests, &prepared).await;
        let aliases = ModuleAliases::new(prepared.iter().map(|p| p.artifact.module_id()));
        let interfaces: Vec<String> = prepared
            .iter()
            .map(|p| aliases.apply(p.artifact.compiled()))
            .collect();
        release_all(prepared);
        let (registry, output) = checked?;

        let diagnostics: Vec<Diagnostic> = output
            .into_diagnostics()
            .into_iter()
            .map(|mut diagnostic| {
                diagnostic.message = aliases.apply(&diagnostic.message);
                diagnostic
            })
            .collect();
        let locator = Locator::new(&registry);
        let partitioned = locator.partition(&diagnostics);

        Ok(requests
            .iter()
            .zip(partitioned)
            .zip(interfaces)
            .map(|(((index, request), owned), interface)| {
                let located: Vec<LocatedDiagnostic> =
                    owned.iter().map(|d| locator.locate(d)).collect();
                let formatted_report = render_report(&request.template, &interface, &located);
                CheckResult {
                    request: (*request).clone(),
                    index: *index,
                    generated_interface: interface,
                    diagnostics: located,
                    formatted_report,
                }
            })
            .collect())
    }

    async fn prepare(
        &self,
        slot: usize,
        index: usize,
        request: &CheckRequest,
    ) -> Result<Prepared, CheckError> {
        let name = synthetic_name(slot);
        let interface = self
            .toolchain
            .synthesizer
            .synthesize(&request.template, &name)
            .await
            .map_err(|source| CheckError::Synthesis {
                index,
                template: request.template.clone(),
                source,
            })?;

        let view_path = self.resolve(&request.view_model);
        let view_source = tokio::fs::read_to_string(&view_path)
            .await
            .map_err(|source| CheckError::ReadViewModel {
                index,
                path: view_path.clone(),
                source,
            })?;

        let artifact = compile_interface(self.toolchain.transpiler.as_ref(), &interface, &name)
            .await
            .map_err(|source| CheckError::Transpile {
                index,
                template: request.template.clone(),
                source,
            })?;
        debug!(
            index,
            module = artifact.module_id(),
            path = %artifact.temp_path(),
            "prepared request"
        );

        Ok(Prepared {
            view_source,
            artifact,
        })
    }

    async fn compile(
        &self,
        requests: &[(usize, &CheckRequest)],
        prepared: &[Prepared],
    ) -> Result<(SourceRegistry, CheckerOutput), CheckError> {
        let members: Vec<UnitMember<'_>> = requests
            .iter()
            .zip(prepared)
            .map(|((_, request), p)| UnitMember {
                request,
                view_source: &p.view_source,
                compiled_interface: p.artifact.compiled(),
                module_id: p.artifact.module_id(),
                synthetic_name: p.artifact.synthetic_name(),
            })
            .collect();

        let registry = SourceRegistry::assemble(&self.options.externs, &members)?;
        let output = self
            .toolchain
            .checker
            .compile(&registry.to_virtual_files(), &self.options.flags)
            .await?;
        Ok((registry, output))
    }

    fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.options.workspace.join(path)
        }
    }
}

/// Stable names for the module ids the transpiler derived from temporary
/// file paths.
///
/// The temporary file name changes on every run, and so does the module id
/// built from it. Reports name each generated module after its slot instead,
/// in both the declared (`a.b`) and the checker-mangled (`a$b`) spelling.
struct ModuleAliases {
    replacements: Vec<(String, String)>,
}

impl ModuleAliases {
    /// Aliases for the module ids of a unit, in slot order.
    fn new<'a>(module_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut replacements = Vec::new();
        for (slot, module_id) in module_ids.into_iter().enumerate() {
            if module_id.is_empty() {
                continue;
            }
            let stable = stable_module_name(slot);
            let mangled = module_id.replace('.', "$");
            if mangled != module_id {
                replacements.push((mangled, stable.clone()));
            }
            replacements.push((module_id.to_string(), stable));
        }
        // Longest first, so no id is rewritten inside a longer one.
        replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { replacements }
    }

    fn apply(&self, text: &str) -> String {
        self.replacements
            .iter()
            .fold(text.to_string(), |text, (from, to)| text.replace(from, to))
    }
}

fn release_all(prepared: Vec<Prepared>) {
    for Prepared { artifact, .. } in prepared {
        let path = artifact.temp_path().to_path_buf();
        if let Err(err) = artifact.release() {
            warn!(path = %path, error = %err, "failed to remove temporary interface file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(index: usize, diagnostics: usize) -> CheckResult {
        let diagnostic = closure_runner::Diagnostic {
            virtual_path: format!("view-source{index}.js"),
            message: "bad".to_string(),
            kind: "JSC_TYPE_MISMATCH".to_string(),
            severity: closure_runner::DiagnosticSeverity::Error,
            line: 1,
            column: 1,
        };
        CheckResult {
            request: CheckRequest::new("a.html", "a.js", "foo.a"),
            index,
            generated_interface: String::new(),
            diagnostics: vec![
                LocatedDiagnostic {
                    diagnostic,
                    excerpt: None,
                };
                diagnostics
            ],
            formatted_report: String::new(),
        }
    }

    #[test]
    fn test_module_aliases() {
        let aliases = ModuleAliases::new([
            "_tmp.tmp_dT8qji.html_interface_0",
            "_tmp.tmp_i6xh8A.html_interface_1",
        ]);
        assert_eq!(
            aliases.apply("goog.module('_tmp.tmp_i6xh8A.html_interface_1');"),
            "goog.module('generated-html-interface1');"
        );
        assert_eq!(
            aliases.apply(
                "required: module$contents$_tmp$tmp_dT8qji$html_interface_0_html_interface_0"
            ),
            "required: module$contents$generated-html-interface0_html_interface_0"
        );
        assert_eq!(aliases.apply("found: View0"), "found: View0");
    }

    #[test]
    fn test_empty_module_id_is_not_aliased() {
        let aliases = ModuleAliases::new([""]);
        assert_eq!(aliases.apply("abc"), "abc");
    }

    #[test]
    fn test_mode_parsing() {
        let mode: CheckMode = serde_json::from_str(r#""single""#).unwrap();
        assert_eq!(mode, CheckMode::Single);
        assert_eq!(CheckMode::default(), CheckMode::Batch);
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            total: 3,
            results: vec![result(0, 0), result(1, 2), result(2, 0)],
            ..Default::default()
        };
        assert_eq!(report.failed_count(), 1);
        assert!(!report.passed());

        let err = report.into_result().unwrap_err();
        assert_eq!(err.to_string(), "1 of 3 checks failed");
        assert_eq!(err.results.len(), 3);
    }

    #[test]
    fn test_errored_requests_count_as_failed() {
        let report = BatchReport {
            total: 2,
            results: vec![result(1, 0)],
            errors: vec![CheckError::Checker(CheckerError::InvalidInput(
                "bad".to_string(),
            ))],
            ..Default::default()
        };
        assert_eq!(report.failed_count(), 1);
        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_passing_report() {
        let report = BatchReport {
            total: 1,
            results: vec![result(0, 0)],
            ..Default::default()
        };
        assert_eq!(report.into_result().unwrap().len(), 1);
    }

    #[test]
    fn test_request_index() {
        let err = CheckError::ReadViewModel {
            index: 4,
            path: "missing.js".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.request_index(), Some(4));
        assert_eq!(
            err.to_string(),
            "request 4: failed to read view-model missing.js: gone"
        );
    }
}
