//! SEO specialist: question → audit query → local reduction → answer.
//!
//! Row counting never happens in the model. The sheet is fetched, normalized
//! and reduced here; the summarization call only phrases the exact figures.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use super::answer::{AgentAnswer, Specialist};
use super::config::AgentConfig;
use super::prompt::{PromptSet, build_seo_plan_prompt, build_seo_summary_prompt};
use super::provider::LlmProvider;
use super::retry::RetryPolicy;
use super::traits::{Agent, InferenceCall, execute_json};
use crate::core::normalize::normalize_rows;
use crate::core::validate::validate_audit;
use crate::core::{AuditQuery, reduce};
use crate::error::{AgentError, SourceErrorKind};
use crate::sources::AuditSource;

/// SEO specialist agent.
pub struct SeoAgent {
    plan_call: InferenceCall,
    summary_call: InferenceCall,
    source: Arc<dyn AuditSource>,
    sample_size: usize,
}

impl SeoAgent {
    /// Creates the agent.
    #[must_use]
    pub fn new(config: &AgentConfig, prompts: &PromptSet, source: Arc<dyn AuditSource>) -> Self {
        let retry = RetryPolicy::new(config.single_shot_attempts);
        Self {
            plan_call: InferenceCall::json::<AuditQuery>("seo_plan", &config.specialist_model, &prompts.seo_plan)
                .with_max_tokens(config.specialist_max_tokens)
                .with_retry(retry),
            summary_call: InferenceCall::text("seo_summary", &config.specialist_model, &prompts.seo_summary)
                .with_temperature(0.2)
                .with_max_tokens(config.specialist_max_tokens)
                .with_retry(retry),
            source,
            sample_size: config.audit_sample_size,
        }
    }

    /// Answers `query` against the audit sheet `spreadsheet_id`.
    #[instrument(skip_all, fields(specialist = "seo", spreadsheet_id = %spreadsheet_id))]
    pub async fn answer(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        spreadsheet_id: &str,
        context: Option<&str>,
        today: NaiveDate,
    ) -> AgentAnswer {
        match self.run(provider, query, spreadsheet_id, context, today).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(error = %err, "seo agent failed");
                AgentAnswer::error(Specialist::Seo, err)
            }
        }
    }

    async fn run(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        spreadsheet_id: &str,
        context: Option<&str>,
        today: NaiveDate,
    ) -> Result<AgentAnswer, AgentError> {
        let prompt = build_seo_plan_prompt(query, today, context);
        let plan: AuditQuery = execute_json(&self.plan_call, provider, &prompt).await?;

        if let Err(err) = validate_audit(&plan) {
            warn!(error = %err, "audit query rejected");
            return Ok(AgentAnswer::rejected(Specialist::Seo, err));
        }

        let raw = match self.source.fetch(spreadsheet_id).await {
            Ok(result) if !result.is_empty() => result,
            Ok(_) => {
                return Ok(AgentAnswer::no_data(
                    Specialist::Seo,
                    "The audit sheet contains no rows to analyze.",
                ));
            }
            Err(err) => {
                warn!(error = %err, "audit source failed");
                let text = match err.kind {
                    SourceErrorKind::Unauthorized => {
                        "Audit data is unavailable: access to the spreadsheet was denied.".to_string()
                    }
                    SourceErrorKind::NotFound => {
                        "Audit data is unavailable: the spreadsheet was not found.".to_string()
                    }
                    kind => format!("Audit data is unavailable right now ({kind})."),
                };
                return Ok(AgentAnswer::no_data(Specialist::Seo, text));
            }
        };

        let rows = normalize_rows(&raw.rows);
        let summary = match reduce(&rows, &plan, self.sample_size) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "audit reduction failed");
                return Ok(AgentAnswer::no_data(
                    Specialist::Seo,
                    format!("The audit could not be evaluated: {err}."),
                ));
            }
        };
        info!(
            total = summary.total_rows,
            matched = summary.matched_rows,
            groups = summary.groups.len(),
            "audit reduced"
        );

        let response = self
            .summary_call
            .execute(provider, &build_seo_summary_prompt(query, &summary))
            .await?;

        let mut text = response.content.trim().to_string();
        if !summary.is_stated_in(&text) {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(&summary.ground_truth());
        }
        Ok(AgentAnswer::answered(Specialist::Seo, text))
    }
}
