//! Intent routing: one model call classifies a query as analytics, seo or fusion.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use super::config::AgentConfig;
use super::message::ResponseSchema;
use super::prompt::build_router_prompt;
use super::provider::LlmProvider;
use super::retry::RetryPolicy;
use super::traits::{Agent, execute_json};
use crate::error::AgentError;

/// Classification of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Traffic reporting only.
    Analytics,
    /// Technical SEO audit only.
    Seo,
    /// Needs both sources.
    Fusion,
}

impl Intent {
    /// Wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::Seo => "seo",
            Self::Fusion => "fusion",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "analytics" | "ga4" | "traffic" => Ok(Self::Analytics),
            "seo" | "audit" => Ok(Self::Seo),
            "fusion" | "both" | "multi" => Ok(Self::Fusion),
            other => Err(format!("unknown intent: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for Intent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Router output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct RouterDecision {
    /// Classified intent.
    pub intent: Intent,
    /// Why (observability only).
    #[serde(default, alias = "reasoning")]
    pub rationale: String,
}

/// Result of routing one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A recognized intent.
    Classified(RouterDecision),
    /// The model answered but not with a recognized intent.
    Unclassifiable {
        /// Raw model output, for logs.
        raw: String,
    },
}

/// Agent that classifies query intent.
pub struct IntentRouter {
    model: String,
    max_tokens: u32,
    system_prompt: String,
    retry: RetryPolicy,
}

impl IntentRouter {
    /// Creates a router with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.router_model.clone(),
            max_tokens: config.coordination_max_tokens,
            system_prompt,
            retry: RetryPolicy::new(config.coordination_attempts),
        }
    }

    /// Classifies `query`.
    ///
    /// Unparseable output or an unknown intent yields
    /// [`Classification::Unclassifiable`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the model call itself fails.
    pub async fn classify(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
    ) -> Result<Classification, AgentError> {
        match execute_json::<RouterDecision>(self, provider, &build_router_prompt(query)).await {
            Ok(decision) => {
                info!(intent = %decision.intent, rationale = %decision.rationale, "intent classified");
                Ok(Classification::Classified(decision))
            }
            Err(AgentError::ResponseParse { message, content }) => {
                warn!(%message, "router output not recognized");
                Ok(Classification::Unclassifiable { raw: content })
            }
            Err(other) => Err(other),
        }
    }
}

#[async_trait]
impl Agent for IntentRouter {
    fn name(&self) -> &'static str {
        "router"
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
        Some(ResponseSchema::of::<RouterDecision>("intent"))
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
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::agent::prompt::ROUTER_SYSTEM_PROMPT;
    use test_case::test_case;

    struct Canned(&'static str);

    #[async_trait]
    impl LlmProvider for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            Ok(ChatResponse::text(self.0))
        }
    }

    struct Broken;

    #[async_trait]
    impl LlmProvider for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            Err(AgentError::ApiRequest {
                message: "upstream down".to_string(),
                status: Some(503),
            })
        }
    }

    fn router() -> IntentRouter {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        IntentRouter::new(&config, ROUTER_SYSTEM_PROMPT.to_string())
    }

    #[test_case(r#"{"intent":"analytics","rationale":"traffic"}"#, Intent::Analytics)]
    #[test_case(r#"{"intent":"SEO","reasoning":"audit"}"#, Intent::Seo)]
    #[test_case(r#"{"intent":"both"}"#, Intent::Fusion)]
    #[test_case("```json\n{\"intent\":\"fusion\"}\n```", Intent::Fusion)]
    #[tokio::test]
    async fn test_classify(output: &'static str, expected: Intent) {
        let result = router().classify(&Canned(output), "q").await;
        match result {
            Ok(Classification::Classified(decision)) => assert_eq!(decision.intent, expected),
            other => unreachable!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_intent_is_unclassifiable() {
        let result = router().classify(&Canned(r#"{"intent":"weather"}"#), "q").await;
        assert!(matches!(result, Ok(Classification::Unclassifiable { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_propagates() {
        let result = router().classify(&Broken, "q").await;
        assert!(matches!(result, Err(AgentError::ApiRequest { .. })));
    }

    #[test]
    fn test_agent_properties() {
        let router = router();
        assert_eq!(router.name(), "router");
        assert_eq!(router.retry_policy(), RetryPolicy::coordination());
        assert!(router.response_schema().is_some());
    }
}
