//! CLI layer for fusion-query.
//!
//! Provides the command-line interface using clap, with commands for
//! answering a question, serving the HTTP endpoint and writing prompt
//! templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
