//! berth - provision a VPS to host your apps

use std::process::ExitCode;

use berth_cli::cli::Cli;
use berth_cli::output::colors_enabled;
use clap::Parser;
use console::Term;
use tracing_subscriber::EnvFilter;

/// Filter directives for diagnostics on stderr.
const LOG_ENV: &str = "BERTH_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_ansi(colors_enabled(cli.no_color) && Term::stderr().is_term())
        .with_writer(std::io::stderr)
        .init();

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
