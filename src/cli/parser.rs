//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fusion-query: ask questions across web analytics and an SEO audit.
///
/// Routes each question to the analytics specialist, the SEO specialist,
/// or both, and fuses their answers.
#[derive(Parser, Debug)]
#[command(name = "fusion-query")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory containing prompt template files.
    #[arg(long, global = true, env = "FQ_PROMPT_DIR")]
    pub prompt_dir: Option<PathBuf>,

    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one question and print the result.
    #[command(after_help = r#"Examples:
  fusion-query query "How many users visited in the last 14 days?" --property-id 123456
  fusion-query query "What percent of pages are missing titles?" --spreadsheet-id 1AbC...
  fusion-query --format json query "Traffic for pages with broken titles"
"#)]
    Query {
        /// The question.
        query: String,

        /// Reporting property id (defaults to FQ_DEFAULT_PROPERTY_ID).
        #[arg(long)]
        property_id: Option<String>,

        /// Audit spreadsheet id (defaults to FQ_DEFAULT_SPREADSHEET_ID).
        #[arg(long)]
        spreadsheet_id: Option<String>,
    },

    /// Serve `POST /query` over HTTP.
    #[cfg(feature = "server")]
    #[command(after_help = r#"Examples:
  fusion-query serve                      # 0.0.0.0:8080
  fusion-query serve --port 9000
  FQ_HOST=127.0.0.1 fusion-query serve
"#)]
    Serve {
        /// Bind address (defaults to FQ_HOST or 0.0.0.0).
        #[arg(long)]
        host: Option<String>,

        /// Bind port (defaults to FQ_PORT or 8080).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Write the default prompt templates for editing.
    ///
    /// Existing files are left untouched.
    #[command(after_help = r#"Examples:
  fusion-query init-prompts                     # ~/.config/fusion-query/prompts/
  fusion-query init-prompts --dir ./prompts     # Custom directory
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/fusion-query/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_args() {
        let cli = Cli::try_parse_from([
            "fusion-query",
            "--format",
            "json",
            "query",
            "how many users?",
            "--property-id",
            "42",
        ])
        .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Query {
                query,
                property_id,
                spreadsheet_id,
            } => {
                assert_eq!(query, "how many users?");
                assert_eq!(property_id.as_deref(), Some("42"));
                assert!(spreadsheet_id.is_none());
            }
            other => unreachable!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["fusion-query", "init-prompts", "--verbose", "--dir", "/tmp/p"])
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::InitPrompts { dir: Some(_) }));
    }
}
