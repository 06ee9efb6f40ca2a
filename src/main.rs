//! fusion-query command-line entry point.

use clap::Parser;
use fusion_query::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = execute(&cli)?;
    if !output.is_empty() {
        #[allow(clippy::print_stdout)]
        {
            print!("{output}");
            if !output.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing(verbose: bool) {
    let default = if verbose { "fusion_query=debug" } else { "fusion_query=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}
