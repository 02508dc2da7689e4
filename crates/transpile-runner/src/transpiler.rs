//! Transpiler adapter.

use crate::artifact::InterfaceArtifact;
use crate::module_id::{parse_module_id, ModuleIdError};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use node_runner::{NodeError, NodeRunner, NodeScript};
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;
use tracing::{debug, error};

/// Extension of the temporary interface file.
pub const INTERFACE_SUFFIX: &str = ".ts";

const TRANSPILER_SCRIPT: NodeScript = NodeScript::new(
    "template-check-transpile.mjs",
    r#"import { createRequire } from 'node:module';
import { pathToFileURL } from 'node:url';

let input = '';
for await (const chunk of process.stdin) input += chunk;
const req = JSON.parse(input);

const require = createRequire(pathToFileURL(process.cwd() + '/'));
const { toClosureJS } = require('tsickle/built/src/main');

const describe = (d) => {
  const text = typeof d.messageText === 'string'
    ? d.messageText
    : (d.messageText && d.messageText.messageText) || String(d);
  return d.file ? `${d.file.fileName}: ${text}` : text;
};

const diagnostics = [];
const closure = toClosureJS(
  { sourceMap: false, experimentalDecorators: true },
  [req.path],
  { isTyped: true },
  diagnostics
);

const files = closure === null ? null : Array.from(closure.jsFiles.entries());
process.stdout.write(JSON.stringify({ files, diagnostics: diagnostics.map(describe) }) + '\n');
"#,
);

/// Errors from interface transpilation.
#[derive(Debug, Error)]
pub enum TranspileError {
    /// Could not create or write the temporary interface file.
    #[error("failed to prepare temporary interface file: {0}")]
    TempFile(#[from] std::io::Error),

    /// The temporary directory is not valid UTF-8.
    #[error("temporary interface path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    /// The transpiler produced no output.
    #[error("Unable to generate JS from typescript interface. Please file a bug. ({} diagnostics)", .diagnostics.len())]
    InterfaceCompilation { diagnostics: Vec<String> },

    /// The output did not declare a module.
    #[error("failed to extract module id from transpiled interface: {0}")]
    ModuleId(#[from] ModuleIdError),

    /// node failed.
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Result of one transpiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranspileOutput {
    /// Output files in emission order.
    Emitted { files: Vec<(Utf8PathBuf, String)> },
    /// The transpiler gave up; its diagnostics explain why.
    Failed { diagnostics: Vec<String> },
}

/// Translates one TypeScript file into checker-native JavaScript.
///
/// Implementations run with "typed, no source maps, decorator-compatible"
/// settings.
#[async_trait]
pub trait Transpiler: Send + Sync {
    /// Transpiles the file at `path`.
    async fn transpile(&self, path: &Utf8Path) -> Result<TranspileOutput, TranspileError>;
}

/// Writes `interface_source` to a temporary file, transpiles it, and
/// returns the artifact that owns the file.
///
/// On any error the temporary file is deleted before returning.
pub async fn compile_interface(
    transpiler: &dyn Transpiler,
    interface_source: &str,
    synthetic_name: &str,
) -> Result<InterfaceArtifact, TranspileError> {
    let mut file = tempfile::Builder::new()
        .prefix("tmp-")
        .suffix(INTERFACE_SUFFIX)
        .tempfile()?;
    file.write_all(interface_source.as_bytes())?;
    file.flush()?;
    let temp_path = file.into_temp_path();

    let path = Utf8PathBuf::try_from(temp_path.to_path_buf())
        .map_err(|e| TranspileError::NonUtf8Path(e.into_path_buf().display().to_string()))?;
    debug!(path = %path, name = synthetic_name, "transpiling generated interface");

    let files = match transpiler.transpile(&path).await? {
        TranspileOutput::Emitted { files } if !files.is_empty() => files,
        TranspileOutput::Emitted { .. } => {
            error!(path = %path, "transpiler emitted no files");
            return Err(TranspileError::InterfaceCompilation {
                diagnostics: Vec::new(),
            });
        }
        TranspileOutput::Failed { diagnostics } => {
            for diagnostic in &diagnostics {
                error!(path = %path, "{diagnostic}");
            }
            return Err(TranspileError::InterfaceCompilation { diagnostics });
        }
    };

    let compiled = files
        .into_iter()
        .next()
        .map(|(_, text)| text)
        .unwrap_or_default();
    let module_id = parse_module_id(&compiled)?;

    Ok(InterfaceArtifact {
        interface_source: interface_source.to_string(),
        synthetic_name: synthetic_name.to_string(),
        compiled,
        module_id,
        temp_path,
    })
}

#[derive(Debug, Serialize)]
struct TranspileRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranspileResponse {
    files: Option<Vec<(String, String)>>,
    #[serde(default)]
    diagnostics: Vec<String>,
}

impl From<TranspileResponse> for TranspileOutput {
    fn from(response: TranspileResponse) -> Self {
        match response.files {
            Some(files) => TranspileOutput::Emitted {
                files: files
                    .into_iter()
                    .map(|(path, text)| (Utf8PathBuf::from(path), text))
                    .collect(),
            },
            None => TranspileOutput::Failed {
                diagnostics: response.diagnostics,
            },
        }
    }
}

/// Transpiler backed by the `tsickle` node package.
#[derive(Debug, Clone)]
pub struct NodeTranspiler {
    node: NodeRunner,
}

impl NodeTranspiler {
    /// Creates a transpiler using `node`.
    pub fn new(node: NodeRunner) -> Self {
        Self { node }
    }
}

#[async_trait]
impl Transpiler for NodeTranspiler {
    async fn transpile(&self, path: &Utf8Path) -> Result<TranspileOutput, TranspileError> {
        let response: TranspileResponse = self
            .node
            .invoke(
                &TRANSPILER_SCRIPT,
                &TranspileRequest {
                    path: path.as_str(),
                },
            )
            .await?;
        Ok(response.into())
    }
}
