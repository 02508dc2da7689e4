//! Configuration loading.

use crate::orchestrator::CheckMode;
use crate::request::{AdditionalSource, CheckRequest};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use thiserror::Error;
use tracing::debug;

/// Config file looked up in the workspace when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "template-check.json";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid.
    #[error("invalid config {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        source: serde_json::Error,
    },

    /// An additional source sets neither or both of `src` and `file`.
    #[error("additional source {position} of {template} must set exactly one of `src` or `file`")]
    SourceText { template: String, position: usize },

    /// An additional source file could not be read.
    #[error("failed to read additional source {path}: {source}")]
    ReadSource {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
}

/// Contents of `template-check.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    /// Grouping of requests into compilation units.
    pub mode: Option<CheckMode>,

    /// Framework externs file.
    pub externs: Option<String>,

    /// Requests to check.
    #[serde(default)]
    pub requests: Vec<RequestConfig>,
}

/// One configured request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestConfig {
    pub template: String,
    pub view_model: String,
    /// Module id the view-model declares.
    pub module: String,
    #[serde(default)]
    pub additional_sources: Vec<SourceConfig>,
}

/// One configured additional source, inline or from a file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Virtual path; defaults to the file name for `file` sources.
    pub path: Option<String>,
    /// Inline source text.
    pub src: Option<String>,
    /// File to read the source from, relative to the workspace.
    pub file: Option<String>,
}

impl ProjectConfig {
    /// Parses config text; `//` and `/* */` comments are allowed.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(&remove_json_comments(text))
    }

    /// Loads a config file.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `explicit`, or the default config file of `workspace` if it
    /// exists. A missing explicit file is an error; a missing default is not.
    pub fn find(
        workspace: &Utf8Path,
        explicit: Option<&Utf8Path>,
    ) -> Result<Option<(Utf8PathBuf, Self)>, ConfigError> {
        let path = match explicit {
            Some(path) => expand_path(path.as_str(), workspace),
            None => {
                let path = workspace.join(DEFAULT_CONFIG_FILE);
                if !path.exists() {
                    return Ok(None);
                }
                path
            }
        };
        debug!(path = %path, "loading config");
        Self::load(&path).map(|config| Some((path, config)))
    }

    /// Externs path from the config, resolved against `workspace`.
    pub fn externs_path(&self, workspace: &Utf8Path) -> Option<Utf8PathBuf> {
        self.externs
            .as_deref()
            .map(|raw| expand_path(raw, workspace))
    }

    /// Builds the configured requests, reading file-backed sources.
    pub fn into_requests(self, workspace: &Utf8Path) -> Result<Vec<CheckRequest>, ConfigError> {
        self.requests
            .into_iter()
            .map(|request| request.into_request(workspace))
            .collect()
    }
}

impl RequestConfig {
    /// Builds the request, reading file-backed sources.
    pub fn into_request(self, workspace: &Utf8Path) -> Result<CheckRequest, ConfigError> {
        let mut request = CheckRequest::new(
            shellexpand::tilde(&self.template).into_owned(),
            shellexpand::tilde(&self.view_model).into_owned(),
            self.module,
        );
        for (position, source) in self.additional_sources.into_iter().enumerate() {
            let additional = source.into_source(workspace, &self.template, position)?;
            request = request.with_additional_source(additional);
        }
        Ok(request)
    }
}

impl SourceConfig {
    fn into_source(
        self,
        workspace: &Utf8Path,
        template: &str,
        position: usize,
    ) -> Result<AdditionalSource, ConfigError> {
        match (self.src, self.file) {
            (Some(src), None) => Ok(AdditionalSource {
                virtual_path: self.path,
                source: src,
            }),
            (None, Some(file)) => {
                let path = expand_path(&file, workspace);
                let source = fs::read_to_string(&path)
                    .map_err(|source| ConfigError::ReadSource {
                        path: path.clone(),
                        source,
                    })?;
                let virtual_path = self
                    .path
                    .or_else(|| path.file_name().map(str::to_string));
                Ok(AdditionalSource {
                    virtual_path,
                    source,
                })
            }
            _ => Err(ConfigError::SourceText {
                template: template.to_string(),
                position,
            }),
        }
    }
}

/// Expands `~` and resolves relative paths against `workspace`.
pub fn expand_path(raw: &str, workspace: &Utf8Path) -> Utf8PathBuf {
    let expanded = Utf8PathBuf::from(shellexpand::tilde(raw).into_owned());
    if expanded.is_absolute() {
        expanded
    } else {
        workspace.join(expanded)
    }
}

/// Removes single-line and multi-line comments from JSON.
fn remove_json_comments(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if c == '"' {
                in_string = false;
            } else if c == '\\' {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
        } else if c == '"' {
            result.push(c);
            in_string = true;
        } else if c == '/' {
            match chars.peek() {
                Some('/') => {
                    chars.next();
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                Some('*') => {
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next == '*' && chars.peek() == Some(&'/') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {
                    result.push(c);
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}
