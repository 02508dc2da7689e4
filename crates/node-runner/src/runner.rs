//! node process runner.

use blake3::Hasher;
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const CACHE_DIR_NAME: &str = "template-check";

/// Error types for node runner.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Failed to spawn node process.
    #[error("failed to spawn node: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// node process exited with error.
    #[error("node exited with code {code}: {stderr}")]
    ProcessFailed { code: i32, stderr: String },

    /// node binary not found.
    #[error("node binary not found (searched {0}, node_modules/.bin and PATH)")]
    NotFound(String),

    /// Failed to place a helper script in the cache directory.
    #[error("failed to install helper script: {0}")]
    ScriptInstallFailed(String),

    /// Request/response protocol error.
    #[error("node helper protocol error: {0}")]
    ProtocolError(String),

    /// Failed to parse the helper response.
    #[error("failed to parse node helper response: {0}")]
    ParseError(String),
}

/// An embedded helper script.
#[derive(Debug, Clone, Copy)]
pub struct NodeScript {
    /// File name inside the cache directory.
    pub file_name: &'static str,
    /// Script source.
    pub source: &'static str,
}

impl NodeScript {
    /// Declares a helper script.
    pub const fn new(file_name: &'static str, source: &'static str) -> Self {
        Self { file_name, source }
    }
}

/// Runs helper scripts with a resolved node binary.
#[derive(Debug, Clone)]
pub struct NodeRunner {
    node_path: Utf8PathBuf,
    workspace_root: Utf8PathBuf,
    cache_dir: Option<Utf8PathBuf>,
}

impl NodeRunner {
    /// Creates a new node runner.
    pub fn new(node_path: Utf8PathBuf, workspace_root: Utf8PathBuf) -> Self {
        Self {
            node_path,
            workspace_root,
            cache_dir: None,
        }
    }

    /// Uses `cache_dir` for helper scripts instead of the per-user cache.
    pub fn with_cache_dir(mut self, cache_dir: Utf8PathBuf) -> Self {
        self.cache_dir = Some(cache_dir);
        self
    }

    /// Resolves node, preferring an explicit path.
    pub fn resolve(explicit: Option<&Utf8Path>, workspace_root: &Utf8Path) -> Result<Self, NodeError> {
        let node_path = match explicit {
            Some(path) if path.exists() => path.to_owned(),
            Some(path) => return Err(NodeError::NotFound(path.to_string())),
            None => Self::find_node(Some(workspace_root))
                .ok_or_else(|| NodeError::NotFound(workspace_root.to_string()))?,
        };
        debug!(node = %node_path, "resolved node binary");
        Ok(Self::new(node_path, workspace_root.to_owned()))
    }

    /// Attempts to find node in the workspace or on PATH.
    ///
    /// Search order:
    /// 1. Workspace node_modules/.bin/node (if workspace_root provided)
    /// 2. System PATH
    pub fn find_node(workspace_root: Option<&Utf8Path>) -> Option<Utf8PathBuf> {
        if let Some(workspace) = workspace_root {
            let bin = workspace.join("node_modules/.bin");
            if let Some(path) = find_node_in_bin(&bin) {
                return Some(path);
            }
        }

        if let Ok(path) = which::which("node") {
            if let Ok(utf8_path) = Utf8PathBuf::try_from(path) {
                return Some(utf8_path);
            }
        }

        None
    }

    /// Gets the cache directory for template-check.
    pub fn get_cache_dir() -> Option<Utf8PathBuf> {
        dirs::cache_dir()
            .and_then(|p| Utf8PathBuf::try_from(p).ok())
            .map(|p| p.join(CACHE_DIR_NAME))
    }

    /// The workspace node runs in.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Runs `script` with one JSON request and decodes its JSON response.
    ///
    /// The response is the last non-empty stdout line, so tools that log to
    /// stdout do not corrupt the exchange.
    pub async fn invoke<Req, Resp>(&self, script: &NodeScript, request: &Req) -> Result<Resp, NodeError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let cache_dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => Self::get_cache_dir().ok_or_else(|| {
                NodeError::ScriptInstallFailed("could not determine cache directory".into())
            })?,
        };
        let script_path = ensure_script(&cache_dir, script)?;

        let payload = serde_json::to_vec(request)
            .map_err(|e| NodeError::ProtocolError(format!("failed to serialize request: {e}")))?;

        debug!(script = script.file_name, bytes = payload.len(), "invoking node helper");

        let mut child = Command::new(&self.node_path)
            .arg(&script_path)
            .current_dir(&self.workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(NodeError::SpawnFailed)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| NodeError::ProtocolError("failed to open node stdin".to_string()))?;

        let write = async move {
            stdin.write_all(&payload).await?;
            stdin.write_all(b"\n").await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(NodeError::SpawnFailed)?;

        if !output.status.success() {
            return Err(NodeError::ProcessFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        written.map_err(|e| NodeError::ProtocolError(format!("failed to write request: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| {
                NodeError::ProtocolError(format!("{} produced no response", script.file_name))
            })?;

        serde_json::from_str(line).map_err(|e| NodeError::ParseError(format!("{e} ({line})")))
    }
}

fn find_node_in_bin(bin: &Utf8Path) -> Option<Utf8PathBuf> {
    let candidates: &[&str] = if cfg!(windows) {
        &["node.exe", "node.cmd", "node"]
    } else {
        &["node"]
    };

    candidates
        .iter()
        .map(|candidate| bin.join(candidate))
        .find(|path| path.exists())
}

/// Writes `script` into `cache_dir` unless an identical copy is already there.
fn ensure_script(cache_dir: &Utf8Path, script: &NodeScript) -> Result<Utf8PathBuf, NodeError> {
    fs::create_dir_all(cache_dir)
        .map_err(|e| NodeError::ScriptInstallFailed(format!("failed to create cache dir: {e}")))?;

    let script_path = cache_dir.join(script.file_name);
    let expected_hash = blake3::hash(script.source.as_bytes());

    if is_current(&script_path, &expected_hash) {
        return Ok(script_path);
    }

    // Several checks may start at once; serialize the rewrite.
    let lock_path = cache_dir.join(format!("{}.lock", script.file_name));
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| NodeError::ScriptInstallFailed(format!("failed to open lock: {e}")))?;
    lock.lock_exclusive()
        .map_err(|e| NodeError::ScriptInstallFailed(format!("failed to lock: {e}")))?;

    if !is_current(&script_path, &expected_hash) {
        debug!(path = %script_path, "writing node helper script");
        fs::write(&script_path, script.source).map_err(|e| {
            NodeError::ScriptInstallFailed(format!("failed to write {}: {e}", script.file_name))
        })?;
    }

    let _ = FileExt::unlock(&lock);
    Ok(script_path)
}

fn is_current(path: &Utf8Path, expected: &blake3::Hash) -> bool {
    match fs::read(path) {
        Ok(existing) => {
            let mut hasher = Hasher::new();
            hasher.update(&existing);
            hasher.finalize() == *expected
        }
        Err(_) => false,
    }
}
