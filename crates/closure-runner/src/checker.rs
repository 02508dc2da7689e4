//! Checker invocation.

use crate::diagnostic::{CheckerOutput, RawDiagnostic, VirtualSourceFile};
use async_trait::async_trait;
use node_runner::{NodeError, NodeRunner, NodeScript};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const CHECKER_SCRIPT: NodeScript = NodeScript::new(
    "template-check-compile.mjs",
    r#"import { createRequire } from 'node:module';
import { pathToFileURL } from 'node:url';

let input = '';
for await (const chunk of process.stdin) input += chunk;
const req = JSON.parse(input);

const require = createRequire(pathToFileURL(process.cwd() + '/'));
const { compile } = require('google-closure-compiler-js');

let result;
try {
  result = compile({
    polymerVersion: req.polymerVersion,
    warningLevel: req.warningLevel,
    jsCode: req.jsCode
  });
} catch (err) {
  const message = err && err.message ? err.message : String(err);
  process.stdout.write(JSON.stringify({ error: message }) + '\n');
  process.exit(0);
}

const pick = (m) => ({
  file: m.file || null,
  description: m.description || '',
  type: m.type || '',
  lineNo: m.lineNo || 0,
  charNo: m.charNo || 0
});

process.stdout.write(JSON.stringify({
  errors: (result.errors || []).map(pick),
  warnings: (result.warnings || []).map(pick)
}) + '\n');
"#,
);

/// Error types for the checker runner.
#[derive(Debug, Error)]
pub enum CheckerError {
    /// The checker process failed.
    #[error("checker failed: {0}")]
    Node(#[from] NodeError),

    /// The checker rejected the compilation unit itself.
    #[error("checker rejected the compilation unit: {0}")]
    InvalidInput(String),
}

/// Checker diagnostic verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WarningLevel {
    Quiet,
    Default,
    #[default]
    Verbose,
}

/// Fixed checker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerFlags {
    /// Framework-aware mode: the component framework version.
    pub polymer_version: u8,
    /// Diagnostic verbosity.
    pub warning_level: WarningLevel,
}

impl Default for CheckerFlags {
    fn default() -> Self {
        Self {
            polymer_version: 1,
            warning_level: WarningLevel::Verbose,
        }
    }
}

/// Checks a whole compilation unit in one call.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Runs the checker over `sources` with `flags`.
    async fn compile(
        &self,
        sources: &[VirtualSourceFile],
        flags: &CheckerFlags,
    ) -> Result<CheckerOutput, CheckerError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompileRequest<'a> {
    #[serde(flatten)]
    flags: &'a CheckerFlags,
    js_code: &'a [VirtualSourceFile],
}

#[derive(Debug, Deserialize)]
struct CompileResponse {
    #[serde(default)]
    errors: Vec<RawDiagnostic>,
    #[serde(default)]
    warnings: Vec<RawDiagnostic>,
    error: Option<String>,
}

impl CompileResponse {
    fn into_output(self) -> Result<CheckerOutput, CheckerError> {
        match self.error {
            Some(error) => Err(CheckerError::InvalidInput(error)),
            None => Ok(CheckerOutput::from_raw(self.errors, self.warnings)),
        }
    }
}

/// Checker backed by the `google-closure-compiler-js` node package.
#[derive(Debug, Clone)]
pub struct NodeClosureChecker {
    node: NodeRunner,
}

impl NodeClosureChecker {
    /// Creates a checker using `node`.
    pub fn new(node: NodeRunner) -> Self {
        Self { node }
    }
}

#[async_trait]
impl Checker for NodeClosureChecker {
    async fn compile(
        &self,
        sources: &[VirtualSourceFile],
        flags: &CheckerFlags,
    ) -> Result<CheckerOutput, CheckerError> {
        debug!(files = sources.len(), ?flags, "running checker");
        let response: CompileResponse = self
            .node
            .invoke(
                &CHECKER_SCRIPT,
                &CompileRequest {
                    flags,
                    js_code: sources,
                },
            )
            .await?;

        let output = response.into_output()?;
        debug!(
            errors = output.errors.len(),
            warnings = output.warnings.len(),
            "checker finished"
        );
        Ok(output)
    }
}
