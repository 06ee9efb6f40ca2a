//! Analytics specialist: question → reporting query → rows → answer.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use super::answer::{AgentAnswer, Specialist};
use super::config::AgentConfig;
use super::prompt::{PromptSet, build_analytics_plan_prompt, build_analytics_summary_prompt};
use super::provider::LlmProvider;
use super::retry::RetryPolicy;
use super::traits::{Agent, InferenceCall, execute_json};
use crate::core::validate::validate_analytics;
use crate::core::{AnalyticsQuery, TabularResult};
use crate::error::{AgentError, SourceErrorKind};
use crate::sources::AnalyticsSource;

/// Analytics specialist agent.
///
/// Plans a reporting query with one model call, validates it against the
/// metric and dimension allow-lists, runs it through the source, and
/// summarizes the rows with a second call. Never returns an error: every
/// failure becomes an [`AgentAnswer`].
pub struct AnalyticsAgent {
    plan_call: InferenceCall,
    summary_call: InferenceCall,
    source: Arc<dyn AnalyticsSource>,
    max_summary_rows: usize,
}

impl AnalyticsAgent {
    /// Creates the agent.
    #[must_use]
    pub fn new(config: &AgentConfig, prompts: &PromptSet, source: Arc<dyn AnalyticsSource>) -> Self {
        let retry = RetryPolicy::new(config.single_shot_attempts);
        Self {
            plan_call: InferenceCall::json::<AnalyticsQuery>(
                "analytics_plan",
                &config.specialist_model,
                &prompts.analytics_plan,
            )
            .with_max_tokens(config.specialist_max_tokens)
            .with_retry(retry),
            summary_call: InferenceCall::text(
                "analytics_summary",
                &config.specialist_model,
                &prompts.analytics_summary,
            )
            .with_temperature(0.2)
            .with_max_tokens(config.specialist_max_tokens)
            .with_retry(retry),
            source,
            max_summary_rows: config.max_summary_rows,
        }
    }

    /// Answers `query` against `property_id`.
    ///
    /// `context` carries an earlier task's answer when this runs inside a plan.
    #[instrument(skip_all, fields(specialist = "analytics", property_id = %property_id))]
    pub async fn answer(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        property_id: &str,
        context: Option<&str>,
        today: NaiveDate,
    ) -> AgentAnswer {
        match self.run(provider, query, property_id, context, today).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(error = %err, "analytics agent failed");
                AgentAnswer::error(Specialist::Analytics, err)
            }
        }
    }

    async fn run(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        property_id: &str,
        context: Option<&str>,
        today: NaiveDate,
    ) -> Result<AgentAnswer, AgentError> {
        let prompt = build_analytics_plan_prompt(query, today, context);
        let plan: AnalyticsQuery = execute_json(&self.plan_call, provider, &prompt).await?;

        if let Err(err) = validate_analytics(&plan) {
            warn!(error = %err, "analytics query rejected");
            return Ok(AgentAnswer::rejected(Specialist::Analytics, err));
        }
        info!(metrics = ?plan.metrics, dimensions = ?plan.dimensions, "analytics query validated");

        let result = match self.source.run(property_id, &plan).await {
            Ok(result) if !result.is_empty() => result,
            Ok(_) => return Ok(AgentAnswer::no_data(Specialist::Analytics, no_rows_message(&plan))),
            Err(err) => {
                warn!(error = %err, "analytics source failed");
                return Ok(AgentAnswer::no_data(Specialist::Analytics, source_failure_message(&err)));
            }
        };
        info!(rows = result.rows.len(), row_count = result.row_count, "analytics rows fetched");

        let summary = self
            .summary_call
            .execute(provider, &build_analytics_summary_prompt(query, &result, self.max_summary_rows))
            .await?;

        let text = summary.content.trim();
        if text.is_empty() {
            return Ok(AgentAnswer::answered(Specialist::Analytics, rows_fallback(&result)));
        }
        Ok(AgentAnswer::answered(Specialist::Analytics, text))
    }
}

fn no_rows_message(plan: &AnalyticsQuery) -> String {
    let period = plan
        .date_ranges
        .iter()
        .map(|r| format!("{} to {}", r.start_date, r.end_date))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "The analytics property returned no data for {} over {period}.",
        plan.metrics.join(", ")
    )
}

fn source_failure_message(err: &crate::error::SourceError) -> String {
    match err.kind {
        SourceErrorKind::Unauthorized => {
            "Analytics data is unavailable: access to the reporting property was denied.".to_string()
        }
        SourceErrorKind::NotFound => {
            "Analytics data is unavailable: the reporting property was not found.".to_string()
        }
        _ => format!("Analytics data is unavailable right now ({}).", err.kind),
    }
}

fn rows_fallback(result: &TabularResult) -> String {
    format!(
        "The report returned {} rows but no summary could be written.",
        result.row_count
    )
}
