//! Check requests.

use camino::Utf8PathBuf;

/// Extra declarations the checker needs to resolve symbols the view-model
/// uses but does not define.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalSource {
    /// Virtual path to register the source under; a default is chosen when
    /// absent.
    pub virtual_path: Option<String>,
    /// Source text.
    pub source: String,
}

impl AdditionalSource {
    /// A source registered under `virtual_path`.
    pub fn named(virtual_path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            virtual_path: Some(virtual_path.into()),
            source: source.into(),
        }
    }

    /// A source registered under a generated path.
    pub fn anonymous(source: impl Into<String>) -> Self {
        Self {
            virtual_path: None,
            source: source.into(),
        }
    }
}

/// One template/view-model pair to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    /// The markup template.
    pub template: Utf8PathBuf,
    /// The view-model source file.
    pub view_model: Utf8PathBuf,
    /// Module id the view-model declares.
    pub view_model_module: String,
    /// Extra declarations.
    pub additional_sources: Vec<AdditionalSource>,
}

impl CheckRequest {
    /// Creates a request without additional sources.
    pub fn new(
        template: impl Into<Utf8PathBuf>,
        view_model: impl Into<Utf8PathBuf>,
        view_model_module: impl Into<String>,
    ) -> Self {
        Self {
            template: template.into(),
            view_model: view_model.into(),
            view_model_module: view_model_module.into(),
            additional_sources: Vec::new(),
        }
    }

    /// Adds an extra declaration source.
    pub fn with_additional_source(mut self, source: AdditionalSource) -> Self {
        self.additional_sources.push(source);
        self
    }
}
