//! Orchestrator: one pass per request.
//!
//! Validates the query, injects default identifiers, classifies intent, then
//! either calls one specialist directly or runs planner → sequential tasks →
//! aggregator. Every failure past input validation ends as answer text.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{Instrument, info, info_span, warn};

use super::aggregator::{Aggregator, SpecialistResults, merge_answer};
use super::analytics::AnalyticsAgent;
use super::answer::{AgentAnswer, QueryOutcome, Route, Specialist, TaskRecord};
use super::config::AgentConfig;
use super::planner::{ExecutionPlan, Planner};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::router::{Classification, Intent, IntentRouter};
use super::seo::SeoAgent;
use crate::error::AgentError;
use crate::sources::{AnalyticsSource, AuditSource};

/// Sent back when the router cannot classify the query.
pub const CLARIFICATION: &str = "I could not tell whether this question is about site traffic \
or the technical SEO audit. Could you rephrase it and say which data you are interested in?";

/// Inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryRequest {
    /// Natural-language question.
    pub query: String,
    /// Reporting property; the configured default when absent.
    #[serde(default, alias = "propertyId")]
    pub property_id: Option<String>,
    /// Audit spreadsheet; the configured default when absent.
    #[serde(default, alias = "spreadsheetId")]
    pub spreadsheet_id: Option<String>,
}

impl QueryRequest {
    /// A request with no explicit identifiers.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Sets the reporting property.
    #[must_use]
    pub fn with_property_id(mut self, id: impl Into<String>) -> Self {
        self.property_id = Some(id.into());
        self
    }

    /// Sets the audit spreadsheet.
    #[must_use]
    pub fn with_spreadsheet_id(mut self, id: impl Into<String>) -> Self {
        self.spreadsheet_id = Some(id.into());
        self
    }
}

/// Identifiers after default injection.
#[derive(Debug, Clone, Default)]
struct Identifiers {
    property_id: Option<String>,
    spreadsheet_id: Option<String>,
}

impl Identifiers {
    fn for_specialist(&self, specialist: Specialist) -> Option<&str> {
        match specialist {
            Specialist::Analytics => self.property_id.as_deref(),
            Specialist::Seo => self.spreadsheet_id.as_deref(),
        }
    }
}

/// Coordinates routing, planning, specialists and aggregation.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
    router: IntentRouter,
    planner: Planner,
    analytics: AnalyticsAgent,
    seo: SeoAgent,
    aggregator: Aggregator,
}

impl Orchestrator {
    /// Creates an orchestrator, loading prompts from
    /// [`AgentConfig::prompt_dir`] with compiled-in fallbacks.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: AgentConfig,
        analytics_source: Arc<dyn AnalyticsSource>,
        audit_source: Arc<dyn AuditSource>,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, config, &prompts, analytics_source, audit_source)
    }

    /// Creates an orchestrator with an explicit prompt set.
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        config: AgentConfig,
        prompts: &PromptSet,
        analytics_source: Arc<dyn AnalyticsSource>,
        audit_source: Arc<dyn AuditSource>,
    ) -> Self {
        Self {
            router: IntentRouter::new(&config, prompts.router.clone()),
            planner: Planner::new(&config, prompts.planner.clone()),
            analytics: AnalyticsAgent::new(&config, prompts, analytics_source),
            seo: SeoAgent::new(&config, prompts, audit_source),
            aggregator: Aggregator::new(&config, prompts.aggregator.clone()),
            provider,
            config,
        }
    }

    /// Answers one request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmptyQuery`] or [`AgentError::QueryTooLong`] for
    /// a bad request. Every other failure is reported in the answer text.
    pub async fn run(&self, request: QueryRequest) -> Result<QueryOutcome, AgentError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(AgentError::EmptyQuery);
        }
        let len = query.chars().count();
        if len > self.config.max_query_len {
            return Err(AgentError::QueryTooLong {
                len,
                max: self.config.max_query_len,
            });
        }

        let ids = self.inject_defaults(request.property_id, request.spreadsheet_id);
        let span = info_span!(
            "query",
            has_property = ids.property_id.is_some(),
            has_spreadsheet = ids.spreadsheet_id.is_some()
        );
        let start = Instant::now();
        let mut outcome = self.dispatch(query, &ids).instrument(span).await;
        outcome.elapsed = start.elapsed();

        info!(
            route = ?outcome.route,
            intent = outcome.intent.map_or("none", Intent::as_str),
            tasks = outcome.tasks.len(),
            elapsed_ms = u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
            "query answered"
        );
        Ok(outcome)
    }

    /// Answers one request, returning only the text.
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::run`].
    pub async fn answer(&self, request: QueryRequest) -> Result<String, AgentError> {
        self.run(request).await.map(|outcome| outcome.answer)
    }

    fn inject_defaults(&self, property_id: Option<String>, spreadsheet_id: Option<String>) -> Identifiers {
        let pick = |given: Option<String>, default: &Option<String>| {
            given
                .filter(|id| !id.trim().is_empty())
                .or_else(|| default.clone())
        };
        Identifiers {
            property_id: pick(property_id, &self.config.default_property_id),
            spreadsheet_id: pick(spreadsheet_id, &self.config.default_spreadsheet_id),
        }
    }

    async fn dispatch(&self, query: &str, ids: &Identifiers) -> QueryOutcome {
        let provider = self.provider.as_ref();
        let decision = match self.router.classify(provider, query).await {
            Ok(Classification::Classified(decision)) => decision,
            Ok(Classification::Unclassifiable { raw }) => {
                warn!(raw = %raw, "query could not be classified");
                return outcome(CLARIFICATION.to_string(), Route::Unclassified);
            }
            Err(err) => {
                warn!(error = %err, "routing failed");
                return outcome(format!("Orchestration Error: {err}"), Route::Failed);
            }
        };

        let today = chrono::Local::now().date_naive();
        let mut result = match decision.intent {
            Intent::Analytics => self.single(query, Specialist::Analytics, ids, today).await,
            Intent::Seo => self.single(query, Specialist::Seo, ids, today).await,
            Intent::Fusion => self.fusion(query, ids, today).await,
        };
        result.intent = Some(decision.intent);
        result.rationale = Some(decision.rationale).filter(|r| !r.is_empty());
        result
    }

    async fn single(&self, query: &str, specialist: Specialist, ids: &Identifiers, today: NaiveDate) -> QueryOutcome {
        let Some(id) = ids.for_specialist(specialist) else {
            return outcome(missing_identifier(specialist), Route::MissingIdentifier);
        };
        let answer = self.invoke(specialist, query, id, None, today).await;
        let mut result = outcome(answer.text, Route::Single);
        result.tasks.push(TaskRecord {
            id: 1,
            specialist,
            status: answer.status,
        });
        result
    }

    async fn fusion(&self, query: &str, ids: &Identifiers, today: NaiveDate) -> QueryOutcome {
        if ids.property_id.is_none() && ids.spreadsheet_id.is_none() {
            let text = format!(
                "{} {}",
                missing_identifier(Specialist::Analytics),
                missing_identifier(Specialist::Seo)
            );
            return outcome(text, Route::MissingIdentifier);
        }

        let plan = self.planner.plan(self.provider.as_ref(), query, today).await;
        let (results, tasks) = self.execute_plan(&plan, ids, today).await;
        let answer = self.aggregator.synthesize(self.provider.as_ref(), query, &results).await;

        let mut result = outcome(answer, Route::Fusion);
        result.tasks = tasks;
        result
    }

    /// Runs plan tasks strictly in order, feeding each dependency's answer
    /// forward as context.
    async fn execute_plan(
        &self,
        plan: &ExecutionPlan,
        ids: &Identifiers,
        today: NaiveDate,
    ) -> (SpecialistResults, Vec<TaskRecord>) {
        let mut results = SpecialistResults::new();
        let mut records = Vec::with_capacity(plan.tasks.len());
        let mut by_task: HashMap<u32, String> = HashMap::new();

        for task in &plan.tasks {
            let context = task.depends_on.and_then(|dep| by_task.get(&dep)).map(String::as_str);
            info!(
                task = task.id,
                agent = %task.agent,
                depends_on = ?task.depends_on,
                "running task"
            );

            let answer = match ids.for_specialist(task.agent) {
                Some(id) => self.invoke(task.agent, &task.description, id, context, today).await,
                None => AgentAnswer::no_data(task.agent, missing_identifier(task.agent)),
            };
            info!(task = task.id, status = answer.status.as_str(), "task finished");

            records.push(TaskRecord {
                id: task.id,
                specialist: task.agent,
                status: answer.status,
            });
            by_task.insert(task.id, answer.text.clone());
            merge_answer(&mut results, answer);
        }
        (results, records)
    }

    async fn invoke(
        &self,
        specialist: Specialist,
        query: &str,
        id: &str,
        context: Option<&str>,
        today: NaiveDate,
    ) -> AgentAnswer {
        let provider = self.provider.as_ref();
        match specialist {
            Specialist::Analytics => self.analytics.answer(provider, query, id, context, today).await,
            Specialist::Seo => self.seo.answer(provider, query, id, context, today).await,
        }
    }
}

fn outcome(answer: String, route: Route) -> QueryOutcome {
    QueryOutcome {
        answer,
        intent: None,
        rationale: None,
        route,
        tasks: Vec::new(),
        elapsed: std::time::Duration::ZERO,
    }
}

fn missing_identifier(specialist: Specialist) -> String {
    match specialist {
        Specialist::Analytics => "A reporting property id is required for traffic questions. \
            Pass propertyId with the request or set FQ_DEFAULT_PROPERTY_ID."
            .to_string(),
        Specialist::Seo => "An audit spreadsheet id is required for SEO questions. \
            Pass spreadsheetId with the request or set FQ_DEFAULT_SPREADSHEET_ID."
            .to_string(),
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_camel_case() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"query":"q","propertyId":"1","spreadsheet_id":"s"}"#)
                .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(request.property_id.as_deref(), Some("1"));
        assert_eq!(request.spreadsheet_id.as_deref(), Some("s"));
    }

    #[test]
    fn test_missing_identifier_names_env_var() {
        assert!(missing_identifier(Specialist::Analytics).contains("FQ_DEFAULT_PROPERTY_ID"));
        assert!(missing_identifier(Specialist::Seo).contains("spreadsheetId"));
    }
}
