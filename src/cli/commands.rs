//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::sync::Arc;

use crate::agent::{AgentConfig, Orchestrator, PromptSet, QueryOutcome, QueryRequest, create_provider};
use crate::cli::output::OutputFormat;
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Result};
use crate::sources::{Ga4Source, SheetsSource, SourceConfig};

/// Executes the CLI command.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Query {
            query,
            property_id,
            spreadsheet_id,
        } => {
            let request = QueryRequest {
                query: query.clone(),
                property_id: property_id.clone(),
                spreadsheet_id: spreadsheet_id.clone(),
            };
            cmd_query(request, cli.prompt_dir.as_deref(), format)
        }
        #[cfg(feature = "server")]
        Commands::Serve { host, port } => cmd_serve(host.as_deref(), *port, cli.prompt_dir.as_deref()),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Builds the orchestrator from the environment and live HTTP sources.
fn build_orchestrator(prompt_dir: Option<&Path>) -> Result<Orchestrator> {
    let mut builder = AgentConfig::builder();
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = builder
        .from_env()
        .build()
        .map_err(|e| CommandError::ExecutionFailed(format!("Agent configuration error: {e}")))?;

    let provider = create_provider(&config)
        .map_err(|e| CommandError::ExecutionFailed(format!("Provider creation failed: {e}")))?;

    let sources = SourceConfig::from_env();
    let analytics = Ga4Source::new(&sources)
        .map_err(|e| CommandError::ExecutionFailed(format!("Analytics source setup failed: {e}")))?;
    let audit = SheetsSource::new(&sources)
        .map_err(|e| CommandError::ExecutionFailed(format!("Audit source setup failed: {e}")))?;

    Ok(Orchestrator::new(
        Arc::from(provider),
        config,
        Arc::new(analytics),
        Arc::new(audit),
    ))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into())
}

fn cmd_query(request: QueryRequest, prompt_dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let orchestrator = build_orchestrator(prompt_dir)?;
    let outcome = runtime()?
        .block_on(orchestrator.run(request))
        .map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;

    match format {
        OutputFormat::Text => Ok(render_outcome(&outcome)),
        OutputFormat::Json => serde_json::to_string_pretty(&outcome)
            .map_err(|e| CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into()),
    }
}

/// Answer text followed by a one-line run summary.
fn render_outcome(outcome: &QueryOutcome) -> String {
    let mut output = outcome.answer.clone();
    let intent = outcome.intent.map_or("-", |i| i.as_str());
    let tasks = outcome
        .tasks
        .iter()
        .map(|t| format!("{} {}", t.specialist, t.status.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = write!(
        output,
        "\n\n---\nIntent: {intent} | Route: {route} | Tasks: [{tasks}] | Time: {secs:.1}s",
        route = serde_json::to_value(outcome.route)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
        secs = outcome.elapsed.as_secs_f64(),
    );
    output
}

#[cfg(feature = "server")]
fn cmd_serve(host: Option<&str>, port: Option<u16>, prompt_dir: Option<&Path>) -> Result<String> {
    use crate::server::{ServerConfig, serve};

    let mut config = ServerConfig::from_env();
    if let Some(host) = host {
        config.host = host.to_string();
    }
    if let Some(port) = port {
        config.port = port;
    }

    let orchestrator = Arc::new(build_orchestrator(prompt_dir)?);
    runtime()?
        .block_on(serve(orchestrator, &config))
        .map_err(|e| CommandError::ExecutionFailed(format!("Server error: {e}")))?;

    Ok(String::new())
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(std::path::PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed("Could not determine home directory for default prompt path".to_string())
        })?;

    let written = PromptSet::write_defaults(&target_dir)
        .map_err(|e| CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}")))?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let _ = writeln!(
                    output,
                    "  {}",
                    path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown")
                );
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}
