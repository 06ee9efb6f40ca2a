//! Fusion planner: decomposes a query into ordered specialist tasks.
//!
//! The planner never fails. Malformed output, an empty task list or an
//! invocation error all degrade to a one-task plan that sends the whole
//! query to the analytics specialist.

use async_trait::async_trait;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::answer::Specialist;
use super::config::AgentConfig;
use super::message::ResponseSchema;
use super::prompt::build_planner_prompt;
use super::provider::LlmProvider;
use super::retry::RetryPolicy;
use super::traits::{Agent, execute_json};

/// Name carried by the degraded plan.
pub const FALLBACK_PLAN_NAME: &str = "Fallback Plan";

/// One unit of work bound to one specialist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    /// Task id, unique within the plan.
    pub id: u32,
    /// Specialist that runs it.
    pub agent: Specialist,
    /// Self-contained sub-query sent to the specialist.
    pub description: String,
    /// What the task should establish.
    #[serde(default)]
    pub goal: String,
    /// Earlier task whose answer is injected as context.
    #[serde(default, alias = "requires_context_from")]
    pub depends_on: Option<u32>,
}

/// Ordered task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionPlan {
    /// Plan label (observability only).
    #[serde(default)]
    pub plan_name: String,
    /// Tasks, executed in order.
    pub tasks: Vec<Task>,
}

impl ExecutionPlan {
    /// One analytics task carrying the whole query.
    #[must_use]
    pub fn fallback(query: &str) -> Self {
        Self {
            plan_name: FALLBACK_PLAN_NAME.to_string(),
            tasks: vec![Task {
                id: 1,
                agent: Specialist::Analytics,
                description: query.to_string(),
                goal: "Answer query".to_string(),
                depends_on: None,
            }],
        }
    }

    /// Whether this is the degraded plan.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.plan_name == FALLBACK_PLAN_NAME
    }

    /// Drops dependencies that do not point at an earlier task, and
    /// blank descriptions.
    fn sanitize(mut self, query: &str) -> Self {
        let mut seen: Vec<u32> = Vec::with_capacity(self.tasks.len());
        for task in &mut self.tasks {
            if let Some(dep) = task.depends_on
                && !seen.contains(&dep)
            {
                warn!(task = task.id, depends_on = dep, "dropping dependency on a task that has not run");
                task.depends_on = None;
            }
            if task.description.trim().is_empty() {
                task.description = query.to_string();
            }
            seen.push(task.id);
        }
        self
    }
}

/// Agent that produces the fusion [`ExecutionPlan`].
pub struct Planner {
    model: String,
    max_tokens: u32,
    system_prompt: String,
    retry: RetryPolicy,
}

impl Planner {
    /// Creates a planner with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.planner_model.clone(),
            max_tokens: config.coordination_max_tokens,
            system_prompt,
            retry: RetryPolicy::new(config.coordination_attempts),
        }
    }

    /// Plans `query`, degrading to [`ExecutionPlan::fallback`] on any failure.
    pub async fn plan(&self, provider: &dyn LlmProvider, query: &str, today: NaiveDate) -> ExecutionPlan {
        let prompt = build_planner_prompt(query, today);
        match execute_json::<ExecutionPlan>(self, provider, &prompt).await {
            Ok(plan) if !plan.tasks.is_empty() => {
                let plan = plan.sanitize(query);
                info!(
                    plan = %plan.plan_name,
                    tasks = plan.tasks.len(),
                    "execution plan built"
                );
                plan
            }
            Ok(_) => {
                warn!("planner returned no tasks, using fallback plan");
                ExecutionPlan::fallback(query)
            }
            Err(err) => {
                warn!(error = %err, "planning failed, using fallback plan");
                ExecutionPlan::fallback(query)
            }
        }
    }
}

#[async_trait]
impl Agent for Planner {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn response_schema(&self) -> Option<ResponseSchema> {
        Some(ResponseSchema::of::<ExecutionPlan>("execution_plan"))
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}
