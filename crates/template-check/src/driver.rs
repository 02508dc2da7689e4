//! Wires CLI arguments, config and node collaborators into a check run.

use crate::cli::Args;
use camino::{Utf8Path, Utf8PathBuf};
use closure_runner::{find_polymer_externs, NodeClosureChecker, POLYMER_EXTERNS_PATH};
use interface_gen::NodeInterfaceGenerator;
use node_runner::{NodeError, NodeRunner};
use std::sync::Arc;
use std::time::Instant;
use template_check::config::expand_path;
use template_check::output::format_json;
use template_check::{
    CheckError, CheckOptions, CheckSummary, ConfigError, OutputFormat, ProjectConfig,
    TemplateChecker, Toolchain,
};
use thiserror::Error;
use tracing::debug;
use transpile_runner::NodeTranspiler;

/// Errors that stop a run before any request is checked.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Node(#[from] NodeError),

    /// No externs given and none installed.
    #[error(
        "framework externs not found; pass --externs or install {externs} under {0}",
        externs = POLYMER_EXTERNS_PATH
    )]
    ExternsNotFound(Utf8PathBuf),

    /// The externs file could not be read.
    #[error("failed to read externs {path}: {source}")]
    ReadExterns {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    /// Nothing to check.
    #[error("no check requests; add them to template-check.json or pass --template")]
    NoRequests,
}

/// Runs the check described by `args` and prints the reports.
pub async fn run(args: Args) -> Result<CheckSummary, DriverError> {
    let total_start = Instant::now();
    let workspace = resolve_workspace(&args.workspace);
    let timings_enabled = args.timings || read_env_bool("TEMPLATE_CHECK_TIMINGS").unwrap_or(false);

    let setup_start = Instant::now();
    let config = ProjectConfig::find(&workspace, args.config.as_deref())?
        .map(|(path, config)| {
            debug!(path = %path, requests = config.requests.len(), "loaded config");
            config
        })
        .unwrap_or_default();

    let mode = args.mode.or(config.mode).unwrap_or_default();
    let externs_path = args
        .externs
        .as_ref()
        .map(|path| expand_path(path.as_str(), &workspace))
        .or_else(|| config.externs_path(&workspace))
        .or_else(|| find_polymer_externs(&workspace))
        .ok_or_else(|| DriverError::ExternsNotFound(workspace.clone()))?;
    let externs = tokio::fs::read_to_string(&externs_path)
        .await
        .map_err(|source| DriverError::ReadExterns {
            path: externs_path.clone(),
            source,
        })?;

    let mut requests = config.into_requests(&workspace)?;
    requests.extend(args.adhoc_request());
    if requests.is_empty() {
        return Err(DriverError::NoRequests);
    }

    let node = NodeRunner::resolve(args.node.as_deref(), &workspace)?;
    let toolchain = Toolchain {
        synthesizer: Arc::new(NodeInterfaceGenerator::new(node.clone())),
        transpiler: Arc::new(NodeTranspiler::new(node.clone())),
        checker: Arc::new(NodeClosureChecker::new(node)),
    };
    let options = CheckOptions::new(externs, workspace.clone()).with_mode(mode);
    let setup_time = setup_start.elapsed();
    debug!(externs = %externs_path, ?mode, requests = requests.len(), "starting check");

    let checker = TemplateChecker::new(toolchain, options);
    let report = checker.run(&requests).await;

    match args.output {
        OutputFormat::Human => {
            for result in report.results.iter().filter(|r| !r.passed()) {
                println!("{}", result.formatted_report);
            }
        }
        OutputFormat::Json => println!("{}", format_json(&report.results)),
    }
    eprint!("{}", format_errors(&report.errors));

    if timings_enabled {
        eprintln!("=== template-check timings ===");
        eprintln!("setup: {setup_time:?}");
        eprintln!("check: {:?} ({} requests, {mode:?})", report.elapsed, report.total);
        eprintln!("total: {:?}", total_start.elapsed());
    }

    let summary = CheckSummary::from_report(&report);
    eprintln!("{}", summary.format());
    Ok(summary)
}

/// One `Error:` line per unit that stopped before producing results.
fn format_errors(errors: &[CheckError]) -> String {
    errors.iter().map(|err| format!("Error: {err}\n")).collect()
}

fn resolve_workspace(path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .ok()
        .and_then(|cwd| Utf8PathBuf::try_from(cwd).ok())
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|| path.to_path_buf())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
