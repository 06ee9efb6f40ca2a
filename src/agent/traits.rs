//! Agent trait definition and the structured inference call.
//!
//! Every model call in the system goes through [`Agent::execute`], which
//! builds the [`ChatRequest`] from the agent's configuration and wraps the
//! provider call in the agent's [`RetryPolicy`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::message::{ChatRequest, ResponseSchema, TokenUsage, system_message, user_message};
use super::parse::parse_json;
use super::provider::LlmProvider;
use super::retry::RetryPolicy;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role (routing, planning, specialist
/// inference, aggregation) with a fixed system prompt, model configuration
/// and retry budget.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Strict output shape, if any.
    fn response_schema(&self) -> Option<ResponseSchema> {
        None
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Retry budget for throttled calls.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::single_shot()
    }

    /// Executes the agent with the given user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] once the retry budget is spent or on any
    /// non-transient failure.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let schema = self.response_schema();
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode() || schema.is_some(),
            response_schema: schema,
        };

        let response = self
            .retry_policy()
            .run(self.name(), || provider.chat(&request))
            .await?;

        debug!(
            agent = self.name(),
            total_tokens = response.usage.total_tokens,
            finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
            "model call finished"
        );

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Executes `agent` and parses its output as `T`.
///
/// # Errors
///
/// Returns the execution error, or [`AgentError::ResponseParse`] when the
/// output does not match `T`.
pub async fn execute_json<T: DeserializeOwned>(
    agent: &dyn Agent,
    provider: &dyn LlmProvider,
    user_msg: &str,
) -> Result<T, AgentError> {
    let response = agent.execute(provider, user_msg).await?;
    parse_json(&response.content, agent.name())
}

/// A single configurable model call.
///
/// Specialists make two of these per invocation (plan, then summarize); the
/// struct carries everything [`Agent::execute`] needs so each call site only
/// states what differs.
#[derive(Debug, Clone)]
pub struct InferenceCall {
    name: &'static str,
    model: String,
    system_prompt: String,
    schema: Option<ResponseSchema>,
    json_mode: bool,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl InferenceCall {
    /// A free-text call.
    pub fn text(name: &'static str, model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name,
            model: model.into(),
            system_prompt: system_prompt.into(),
            schema: None,
            json_mode: false,
            temperature: 0.0,
            max_tokens: 2048,
            retry: RetryPolicy::single_shot(),
        }
    }

    /// A JSON call whose output must match `T`'s schema.
    pub fn json<T: schemars::JsonSchema>(
        name: &'static str,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            schema: Some(ResponseSchema::of::<T>(name)),
            json_mode: true,
            ..Self::text(name, model, system_prompt)
        }
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Agent for InferenceCall {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        self.json_mode
    }

    fn response_schema(&self) -> Option<ResponseSchema> {
        self.schema.clone()
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::ChatResponse;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyProvider {
        calls: AtomicUsize,
        fail_first: usize,
        last_request: Mutex<Option<ChatRequest>>,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            if let Ok(mut slot) = self.last_request.lock() {
                *slot = Some(request.clone());
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(AgentError::RateLimited {
                    message: "429".to_string(),
                })
            } else {
                Ok(ChatResponse::text(r#"{"intent":"seo"}"#))
            }
        }
    }

    fn provider(fail_first: usize) -> FlakyProvider {
        FlakyProvider {
            calls: AtomicUsize::new(0),
            fail_first,
            last_request: Mutex::new(None),
        }
    }

    #[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
    struct Probe {
        intent: String,
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_retries_with_policy() {
        let provider = provider(2);
        let call = InferenceCall::text("probe", "m", "sys").with_retry(RetryPolicy::coordination());
        let response = call.execute(&provider, "hi").await;
        assert!(response.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_gives_up_after_budget() {
        let provider = provider(10);
        let call = InferenceCall::text("probe", "m", "sys").with_retry(RetryPolicy::coordination());
        let result = call.execute(&provider, "hi").await;
        assert!(matches!(result, Err(AgentError::RateLimited { .. })));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_json_call_sends_schema() {
        let provider = provider(0);
        let call = InferenceCall::json::<Probe>("intent", "m", "sys");
        let probe: Probe = execute_json(&call, &provider, "hi")
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(probe.intent, "seo");

        let request = provider
            .last_request
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .unwrap_or_else(|| unreachable!());
        assert!(request.json_mode);
        assert_eq!(request.response_schema.as_ref().map(|s| s.name.as_str()), Some("intent"));
        assert_eq!(request.last_user_content(), Some("hi"));
    }
}
