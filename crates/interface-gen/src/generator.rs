//! Interface generator adapter.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use node_runner::{NodeError, NodeRunner, NodeScript};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const GENERATOR_SCRIPT: NodeScript = NodeScript::new(
    "template-check-generate.mjs",
    r#"import { createRequire } from 'node:module';
import { pathToFileURL } from 'node:url';

let input = '';
for await (const chunk of process.stdin) input += chunk;
const req = JSON.parse(input);

let generateInterface;
try {
  const require = createRequire(pathToFileURL(process.cwd() + '/'));
  generateInterface = require('twinkie/index').generateInterface;
} catch (err) {
  const message = err && err.message ? err.message : String(err);
  process.stdout.write(JSON.stringify({ kind: 'internal', error: `failed to load twinkie: ${message}` }) + '\n');
  process.exit(0);
}

try {
  const source = generateInterface(req.template, req.name);
  process.stdout.write(JSON.stringify({ source }) + '\n');
} catch (err) {
  const message = err && err.message ? err.message : String(err);
  process.stdout.write(JSON.stringify({ kind: 'parse', error: message }) + '\n');
}
"#,
);

/// Name given to the interface generated for the request at `index`.
pub fn synthetic_name(index: usize) -> String {
    format!("html_interface_{index}")
}

/// Errors from interface synthesis.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The generator rejected the template.
    #[error("failed to parse template {template}: {message}")]
    TemplateParse {
        template: Utf8PathBuf,
        message: String,
    },

    /// The template file does not exist.
    #[error("template not found: {0}")]
    TemplateNotFound(Utf8PathBuf),

    /// The generator could not be loaded or crashed.
    #[error("interface generator failed: {0}")]
    Generator(String),

    /// node failed.
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Turns a template into interface source text.
#[async_trait]
pub trait InterfaceSynthesizer: Send + Sync {
    /// Generates the interface for `template`, naming the type `synthetic_name`.
    async fn synthesize(
        &self,
        template: &Utf8Path,
        synthetic_name: &str,
    ) -> Result<String, SynthesisError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    template: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    source: Option<String>,
    kind: Option<String>,
    error: Option<String>,
}

/// Generator backed by the `twinkie` node package.
#[derive(Debug, Clone)]
pub struct NodeInterfaceGenerator {
    node: NodeRunner,
}

impl NodeInterfaceGenerator {
    /// Creates a generator using `node`.
    pub fn new(node: NodeRunner) -> Self {
        Self { node }
    }
}

#[async_trait]
impl InterfaceSynthesizer for NodeInterfaceGenerator {
    async fn synthesize(
        &self,
        template: &Utf8Path,
        synthetic_name: &str,
    ) -> Result<String, SynthesisError> {
        let template = if template.is_relative() {
            self.node.workspace_root().join(template)
        } else {
            template.to_owned()
        };
        if !template.exists() {
            return Err(SynthesisError::TemplateNotFound(template));
        }

        debug!(template = %template, name = synthetic_name, "generating interface");
        let response: GenerateResponse = self
            .node
            .invoke(
                &GENERATOR_SCRIPT,
                &GenerateRequest {
                    template: template.as_str(),
                    name: synthetic_name,
                },
            )
            .await?;

        interpret_response(&template, response)
    }
}

fn interpret_response(
    template: &Utf8Path,
    response: GenerateResponse,
) -> Result<String, SynthesisError> {
    if let Some(source) = response.source {
        return Ok(source);
    }

    let message = response
        .error
        .unwrap_or_else(|| "generator returned neither source nor error".to_string());
    match response.kind.as_deref() {
        Some("parse") => Err(SynthesisError::TemplateParse {
            template: template.to_owned(),
            message,
        }),
        _ => Err(SynthesisError::Generator(message)),
    }
}
