//! Pluggable LLM provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls. This keeps all agent logic decoupled
//! from any particular LLM vendor, and lets tests script the model.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::AgentError;

/// Trait for LLM provider backends.
///
/// Implementations perform exactly one upstream call per [`LlmProvider::chat`]
/// and report throttling as [`AgentError::RateLimited`]; retrying is the
/// caller's job (see [`super::retry::RetryPolicy`]).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::RateLimited`] on throttling and
    /// [`AgentError::ApiRequest`] on any other upstream failure.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;
}
