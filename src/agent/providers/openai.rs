//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, LiteLLM, Gemini's
//! compatibility endpoint, local proxies) via the base URL override in
//! [`AgentConfig`].

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use backoff::ExponentialBackoff;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;

/// `OpenAI`-compatible LLM provider.
///
/// The SDK's own retry loop is switched off; throttling surfaces as
/// [`AgentError::RateLimited`] and the agent's retry policy decides.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Creates a new provider from agent configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] if the HTTP client cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::ApiRequest {
                message: e.to_string(),
                status: None,
            })?;

        let single_attempt = ExponentialBackoff {
            max_elapsed_time: Some(std::time::Duration::ZERO),
            ..ExponentialBackoff::default()
        };

        Ok(Self {
            client: Client::with_config(openai_config)
                .with_http_client(http)
                .with_backoff(single_attempt),
        })
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        let response_format = match (&request.response_schema, request.json_mode) {
            (Some(schema), _) => Some(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: schema.name.clone(),
                    schema: Some(schema.schema.clone()),
                    // Optional plan fields are absent from `required`, which strict mode rejects.
                    strict: Some(false),
                },
            }),
            (None, true) => Some(ResponseFormat::JsonObject),
            (None, false) => None,
        };

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature.filter(|&t| t != 0.0),
            max_completion_tokens: request.max_tokens,
            response_format,
            ..Default::default()
        }
    }
}

/// Maps an SDK error onto the agent taxonomy, isolating throttling.
fn classify_error(err: &OpenAIError) -> AgentError {
    let message = err.to_string();
    let status = match err {
        OpenAIError::Reqwest(e) => e.status().map(|s| s.as_u16()),
        _ => None,
    };
    let throttled_type = matches!(
        err,
        OpenAIError::ApiError(api) if api.r#type.as_deref() == Some("rate_limit_exceeded")
    );
    if status == Some(429) || throttled_type || is_rate_limit_message(&message) {
        AgentError::RateLimited { message }
    } else {
        AgentError::ApiRequest { message, status }
    }
}

/// Whether an upstream error message signals throttling.
pub(crate) fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["rate limit", "rate_limit", "429", "resource_exhausted", "too many requests"]
        .iter()
        .any(|needle| lower.contains(needle))
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let openai_request = Self::build_request(request);

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(|e| classify_error(&e))?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let finish_reason = choice.and_then(|c| {
            c.finish_reason
                .as_ref()
                .map(|fr| format!("{fr:?}").to_lowercase())
        });

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        Ok(ChatResponse {
            content,
            usage,
            finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{self, ResponseSchema};
    use test_case::test_case;

    fn request(json_mode: bool, schema: Option<ResponseSchema>) -> ChatRequest {
        ChatRequest {
            model: "gemini-2.5-flash".to_string(),
            messages: vec![message::system_message("sys"), message::user_message("test")],
            temperature: Some(0.0),
            max_tokens: Some(100),
            json_mode,
            response_schema: schema,
        }
    }

    #[test]
    fn test_convert_system_message() {
        let msg = message::system_message("test");
        let converted = OpenAiProvider::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn test_convert_user_message() {
        let msg = message::user_message("hello");
        let converted = OpenAiProvider::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_build_request_plain_text() {
        let built = OpenAiProvider::build_request(&request(false, None));
        assert!(built.response_format.is_none());
        assert!(built.temperature.is_none());
        assert_eq!(built.max_completion_tokens, Some(100));
        assert_eq!(built.messages.len(), 2);
    }

    #[test]
    fn test_build_request_json_mode() {
        let built = OpenAiProvider::build_request(&request(true, None));
        assert!(matches!(built.response_format, Some(ResponseFormat::JsonObject)));
    }

    #[test]
    fn test_build_request_schema_wins() {
        let schema = ResponseSchema {
            name: "intent".to_string(),
            schema: serde_json::json!({"type": "object"}),
        };
        let built = OpenAiProvider::build_request(&request(true, Some(schema)));
        match built.response_format {
            Some(ResponseFormat::JsonSchema { json_schema }) => {
                assert_eq!(json_schema.name, "intent");
                assert_eq!(json_schema.schema, Some(serde_json::json!({"type": "object"})));
                assert_eq!(json_schema.strict, Some(false));
            }
            _ => unreachable!("expected a JSON schema response format"),
        }
    }

    #[test_case("Rate limit reached for gemini-2.5-flash", true)]
    #[test_case("Error code: 429", true)]
    #[test_case("RESOURCE_EXHAUSTED: quota", true)]
    #[test_case("Too Many Requests", true)]
    #[test_case("invalid_api_key", false)]
    #[test_case("model not found", false)]
    fn test_rate_limit_detection(message: &str, expected: bool) {
        assert_eq!(is_rate_limit_message(message), expected);
    }

    #[test]
    fn test_classify_invalid_argument() {
        let err = classify_error(&OpenAIError::InvalidArgument("bad".to_string()));
        assert!(matches!(err, AgentError::ApiRequest { status: None, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_classify_rate_limited_api_error() {
        let err = classify_error(&OpenAIError::ApiError(async_openai::error::ApiError {
            message: "slow down".to_string(),
            r#type: Some("rate_limit_exceeded".to_string()),
            param: None,
            code: None,
        }));
        assert!(err.is_transient());
    }
}
