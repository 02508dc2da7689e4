//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::Parser;
use template_check::{AdditionalSource, CheckMode, CheckRequest, OutputFormat};

/// Checks that view-models satisfy the interfaces implied by their templates.
#[derive(Debug, Parser)]
#[command(name = "template-check")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Working directory for the check
    #[arg(long, default_value = ".")]
    pub workspace: Utf8PathBuf,

    /// Path to the config file (default: <workspace>/template-check.json)
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,

    /// Share one compilation unit (batch) or check requests one by one (single)
    #[arg(long, value_enum)]
    pub mode: Option<CheckMode>,

    /// Framework externs file
    #[arg(long)]
    pub externs: Option<Utf8PathBuf>,

    /// Path to the node binary
    #[arg(long)]
    pub node: Option<Utf8PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub output: OutputFormat,

    /// Print timing breakdowns
    #[arg(long)]
    pub timings: bool,

    /// Template of an ad-hoc request
    #[arg(long, requires_all = ["view_model", "module"])]
    pub template: Option<Utf8PathBuf>,

    /// View-model source of the ad-hoc request
    #[arg(long = "view-model", requires = "template")]
    pub view_model: Option<Utf8PathBuf>,

    /// Module id the ad-hoc view-model declares
    #[arg(long, requires = "template")]
    pub module: Option<String>,

    /// Inline additional source for the ad-hoc request, as `[path=]source`
    #[arg(long = "extra-source", requires = "template")]
    pub extra_sources: Vec<String>,
}

impl Args {
    /// The ad-hoc request given on the command line, if any.
    pub fn adhoc_request(&self) -> Option<CheckRequest> {
        let (template, view_model, module) = match (&self.template, &self.view_model, &self.module)
        {
            (Some(template), Some(view_model), Some(module)) => (template, view_model, module),
            _ => return None,
        };

        let request = self.extra_sources.iter().fold(
            CheckRequest::new(template.clone(), view_model.clone(), module.clone()),
            |request, raw| request.with_additional_source(parse_extra_source(raw)),
        );
        Some(request)
    }
}

/// Parses `path=source`; text without a `.js` path before `=` is anonymous.
fn parse_extra_source(raw: &str) -> AdditionalSource {
    match raw.split_once('=') {
        Some((path, source)) if path.ends_with(".js") && !path.contains(char::is_whitespace) => {
            AdditionalSource::named(path, source)
        }
        _ => AdditionalSource::anonymous(raw),
    }
}
