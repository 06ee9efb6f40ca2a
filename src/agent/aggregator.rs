//! Aggregator: fuses the specialists' answers into one response.

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::answer::{AgentAnswer, AnswerStatus, Specialist};
use super::config::AgentConfig;
use super::prompt::build_aggregator_prompt;
use super::provider::LlmProvider;
use super::retry::RetryPolicy;
use super::traits::{Agent, InferenceCall};

/// Returned without a model call when no specialist produced data.
pub const INSUFFICIENT_DATA: &str = "I could not find enough data to answer this question. \
Neither the analytics report nor the SEO audit returned usable results. \
Check the property and spreadsheet identifiers, or rephrase the question.";

/// Specialist results keyed by specialist. An absent key means no task ran for it.
pub type SpecialistResults = BTreeMap<Specialist, AgentAnswer>;

/// Adds `answer` to `results`.
///
/// A specialist that ran more than once keeps every answer text, in order.
/// The merged status is the best of the two.
pub fn merge_answer(results: &mut SpecialistResults, answer: AgentAnswer) {
    match results.remove(&answer.specialist) {
        None => {
            results.insert(answer.specialist, answer);
        }
        Some(prior) => {
            let status = if prior.has_data() || answer.has_data() {
                AnswerStatus::Answered
            } else if matches!(prior.status, AnswerStatus::NoData) || matches!(answer.status, AnswerStatus::NoData) {
                AnswerStatus::NoData
            } else {
                AnswerStatus::Error
            };
            let merged = AgentAnswer {
                specialist: answer.specialist,
                text: format!("{}\n\n{}", prior.text, answer.text),
                status,
            };
            results.insert(merged.specialist, merged);
        }
    }
}

/// Agent that writes the fused response.
pub struct Aggregator {
    call: InferenceCall,
}

impl Aggregator {
    /// Creates an aggregator with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            call: InferenceCall::text("aggregator", &config.aggregator_model, system_prompt)
                .with_temperature(0.2)
                .with_max_tokens(config.aggregator_max_tokens)
                .with_retry(RetryPolicy::new(config.coordination_attempts)),
        }
    }

    /// Writes the final answer for `query` from `results`.
    ///
    /// Never fails. Returns [`INSUFFICIENT_DATA`] without a model call when no
    /// result carries data, and the raw results when the model call fails.
    pub async fn synthesize(&self, provider: &dyn LlmProvider, query: &str, results: &SpecialistResults) -> String {
        if !results.values().any(AgentAnswer::has_data) {
            info!(results = results.len(), "no specialist data, skipping aggregation call");
            return INSUFFICIENT_DATA.to_string();
        }

        let answers: Vec<AgentAnswer> = [Specialist::Analytics, Specialist::Seo]
            .into_iter()
            .map(|specialist| {
                results.get(&specialist).cloned().unwrap_or_else(|| {
                    AgentAnswer::no_data(specialist, "No task was run against this source.")
                })
            })
            .collect();

        match self.call.execute(provider, &build_aggregator_prompt(query, &answers)).await {
            Ok(response) if !response.content.trim().is_empty() => response.content.trim().to_string(),
            Ok(_) => {
                warn!("aggregator returned empty text, using raw results");
                raw_results(&answers)
            }
            Err(err) => {
                warn!(error = %err, "aggregation failed, using raw results");
                raw_results(&answers)
            }
        }
    }
}

fn raw_results(answers: &[AgentAnswer]) -> String {
    let mut text = String::from("The answers could not be combined. Results from each source:");
    for answer in answers {
        text.push_str("\n\n");
        text.push_str(answer.specialist.display_name());
        text.push_str(":\n");
        text.push_str(&answer.text);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::agent::prompt::AGGREGATOR_SYSTEM_PROMPT;
    use crate::error::AgentError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recording {
        reply: Result<&'static str, u16>,
        calls: AtomicUsize,
        prompt: Mutex<Option<String>>,
    }

    impl Recording {
        fn new(reply: Result<&'static str, u16>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut slot) = self.prompt.lock() {
                *slot = request.last_user_content().map(str::to_string);
            }
            self.reply.map(ChatResponse::text).map_err(|status| AgentError::ApiRequest {
                message: "down".to_string(),
                status: Some(status),
            })
        }
    }

    fn aggregator() -> Aggregator {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        Aggregator::new(&config, AGGREGATOR_SYSTEM_PROMPT.to_string())
    }

    #[tokio::test]
    async fn test_empty_results_skip_model() {
        let provider = Recording::new(Ok("unused"));
        let text = aggregator().synthesize(&provider, "q", &SpecialistResults::new()).await;
        assert_eq!(text, INSUFFICIENT_DATA);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_error_results_skip_model() {
        let provider = Recording::new(Ok("unused"));
        let mut results = SpecialistResults::new();
        merge_answer(&mut results, AgentAnswer::error(Specialist::Analytics, "boom"));
        merge_answer(&mut results, AgentAnswer::no_data(Specialist::Seo, "empty sheet"));
        let text = aggregator().synthesize(&provider, "q", &results).await;
        assert_eq!(text, INSUFFICIENT_DATA);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_side_named_in_prompt() {
        let provider = Recording::new(Ok("fused"));
        let mut results = SpecialistResults::new();
        merge_answer(&mut results, AgentAnswer::answered(Specialist::Seo, "12 pages lack titles"));
        let text = aggregator().synthesize(&provider, "q", &results).await;
        assert_eq!(text, "fused");

        let prompt = provider.prompt.lock().ok().and_then(|p| p.clone()).unwrap_or_default();
        assert!(prompt.contains("12 pages lack titles"));
        assert!(prompt.contains("specialist=\"analytics\" status=\"no_data\""));
    }

    #[tokio::test]
    async fn test_failure_returns_raw_results() {
        let provider = Recording::new(Err(500));
        let mut results = SpecialistResults::new();
        merge_answer(&mut results, AgentAnswer::answered(Specialist::Analytics, "900 sessions"));
        let text = aggregator().synthesize(&provider, "q", &results).await;
        assert!(text.contains("Analytics Agent:\n900 sessions"));
    }

    #[test]
    fn test_merge_keeps_both_texts() {
        let mut results = SpecialistResults::new();
        merge_answer(&mut results, AgentAnswer::no_data(Specialist::Seo, "first"));
        merge_answer(&mut results, AgentAnswer::answered(Specialist::Seo, "second"));
        let merged = &results[&Specialist::Seo];
        assert_eq!(merged.text, "first\n\nsecond");
        assert_eq!(merged.status, AnswerStatus::Answered);
    }
}
