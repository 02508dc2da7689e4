//! template-check: verifies view-models against their templates' bindings.

mod cli;
mod driver;

use clap::Parser;
use cli::Args;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::filter::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Reports go to stdout; keep logs on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("warn"))
                .into_diagnostic()?,
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match driver::run(args).await {
        Ok(summary) => {
            if !summary.passed() {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
