//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! The resulting [`AgentConfig`] is read-only and handed to the orchestrator
//! at construction time.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default model for every role.
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default max tokens for router and planner responses.
const DEFAULT_COORDINATION_MAX_TOKENS: u32 = 1024;
/// Default max tokens for specialist plan and summary calls.
const DEFAULT_SPECIALIST_MAX_TOKENS: u32 = 2048;
/// Default max tokens for the aggregator.
const DEFAULT_AGGREGATOR_MAX_TOKENS: u32 = 4096;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Attempts for single-shot specialist calls.
const DEFAULT_SINGLE_SHOT_ATTEMPTS: u32 = 5;
/// Attempts for router, planner and aggregator calls.
const DEFAULT_COORDINATION_ATTEMPTS: u32 = 3;
/// Report rows passed to the analytics summarizer.
const DEFAULT_MAX_SUMMARY_ROWS: usize = 100;
/// Matching audit rows sampled into the SEO summary.
const DEFAULT_AUDIT_SAMPLE_SIZE: usize = 10;
/// Longest accepted query, in characters.
const DEFAULT_MAX_QUERY_LEN: usize = 4096;

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (LiteLLM proxy, Gemini compatibility endpoint).
    pub base_url: Option<String>,
    /// Model for the intent router.
    pub router_model: String,
    /// Model for the fusion planner.
    pub planner_model: String,
    /// Model for specialist plan and summary calls.
    pub specialist_model: String,
    /// Model for the aggregator.
    pub aggregator_model: String,
    /// Maximum tokens for router and planner responses.
    pub coordination_max_tokens: u32,
    /// Maximum tokens for specialist responses.
    pub specialist_max_tokens: u32,
    /// Maximum tokens for aggregator responses.
    pub aggregator_max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
    /// Attempts for single-shot specialist calls.
    pub single_shot_attempts: u32,
    /// Attempts for router, planner and aggregator calls.
    pub coordination_attempts: u32,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
    /// Report rows passed to the analytics summarizer.
    pub max_summary_rows: usize,
    /// Matching audit rows sampled into the SEO summary.
    pub audit_sample_size: usize,
    /// Longest accepted query, in characters.
    pub max_query_len: usize,
    /// Reporting property used when a request omits one.
    pub default_property_id: Option<String>,
    /// Audit spreadsheet used when a request omits one.
    pub default_spreadsheet_id: Option<String>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    router_model: Option<String>,
    planner_model: Option<String>,
    specialist_model: Option<String>,
    aggregator_model: Option<String>,
    coordination_max_tokens: Option<u32>,
    specialist_max_tokens: Option<u32>,
    aggregator_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    single_shot_attempts: Option<u32>,
    coordination_attempts: Option<u32>,
    prompt_dir: Option<PathBuf>,
    max_summary_rows: Option<usize>,
    audit_sample_size: Option<usize>,
    max_query_len: Option<usize>,
    default_property_id: Option<String>,
    default_spreadsheet_id: Option<String>,
}

fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = env_first(&["FQ_PROVIDER"]);
        }
        if self.api_key.is_none() {
            self.api_key = env_first(&["FQ_API_KEY", "LITELLM_API_KEY", "OPENAI_API_KEY"]);
        }
        if self.base_url.is_none() {
            self.base_url = env_first(&["FQ_BASE_URL", "LITELLM_BASE_URL", "OPENAI_BASE_URL"]);
        }
        if self.model.is_none() {
            self.model = env_first(&["FQ_MODEL"]);
        }
        if self.router_model.is_none() {
            self.router_model = env_first(&["FQ_ROUTER_MODEL"]);
        }
        if self.planner_model.is_none() {
            self.planner_model = env_first(&["FQ_PLANNER_MODEL"]);
        }
        if self.specialist_model.is_none() {
            self.specialist_model = env_first(&["FQ_SPECIALIST_MODEL"]);
        }
        if self.aggregator_model.is_none() {
            self.aggregator_model = env_first(&["FQ_AGGREGATOR_MODEL"]);
        }
        if self.timeout.is_none() {
            self.timeout = env_parse::<u64>("FQ_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env_first(&["FQ_PROMPT_DIR"]).map(PathBuf::from);
        }
        if self.max_summary_rows.is_none() {
            self.max_summary_rows = env_parse("FQ_MAX_SUMMARY_ROWS");
        }
        if self.audit_sample_size.is_none() {
            self.audit_sample_size = env_parse("FQ_AUDIT_SAMPLE_SIZE");
        }
        if self.default_property_id.is_none() {
            self.default_property_id = env_first(&["FQ_DEFAULT_PROPERTY_ID"]);
        }
        if self.default_spreadsheet_id.is_none() {
            self.default_spreadsheet_id = env_first(&["FQ_DEFAULT_SPREADSHEET_ID"]);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model used by every role without its own override.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the router model.
    #[must_use]
    pub fn router_model(mut self, model: impl Into<String>) -> Self {
        self.router_model = Some(model.into());
        self
    }

    /// Sets the planner model.
    #[must_use]
    pub fn planner_model(mut self, model: impl Into<String>) -> Self {
        self.planner_model = Some(model.into());
        self
    }

    /// Sets the specialist model.
    #[must_use]
    pub fn specialist_model(mut self, model: impl Into<String>) -> Self {
        self.specialist_model = Some(model.into());
        self
    }

    /// Sets the aggregator model.
    #[must_use]
    pub fn aggregator_model(mut self, model: impl Into<String>) -> Self {
        self.aggregator_model = Some(model.into());
        self
    }

    /// Sets the router and planner max tokens.
    #[must_use]
    pub const fn coordination_max_tokens(mut self, n: u32) -> Self {
        self.coordination_max_tokens = Some(n);
        self
    }

    /// Sets the specialist max tokens.
    #[must_use]
    pub const fn specialist_max_tokens(mut self, n: u32) -> Self {
        self.specialist_max_tokens = Some(n);
        self
    }

    /// Sets the aggregator max tokens.
    #[must_use]
    pub const fn aggregator_max_tokens(mut self, n: u32) -> Self {
        self.aggregator_max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the attempt budget for specialist calls.
    #[must_use]
    pub const fn single_shot_attempts(mut self, n: u32) -> Self {
        self.single_shot_attempts = Some(n);
        self
    }

    /// Sets the attempt budget for router, planner and aggregator calls.
    #[must_use]
    pub const fn coordination_attempts(mut self, n: u32) -> Self {
        self.coordination_attempts = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the number of report rows passed to the analytics summarizer.
    #[must_use]
    pub const fn max_summary_rows(mut self, n: usize) -> Self {
        self.max_summary_rows = Some(n);
        self
    }

    /// Sets the number of audit rows sampled into the SEO summary.
    #[must_use]
    pub const fn audit_sample_size(mut self, n: usize) -> Self {
        self.audit_sample_size = Some(n);
        self
    }

    /// Sets the longest accepted query.
    #[must_use]
    pub const fn max_query_len(mut self, n: usize) -> Self {
        self.max_query_len = Some(n);
        self
    }

    /// Sets the fallback reporting property id.
    #[must_use]
    pub fn default_property_id(mut self, id: impl Into<String>) -> Self {
        self.default_property_id = Some(id.into());
        self
    }

    /// Sets the fallback audit spreadsheet id.
    #[must_use]
    pub fn default_spreadsheet_id(mut self, id: impl Into<String>) -> Self {
        self.default_spreadsheet_id = Some(id.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;
        let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            router_model: self.router_model.unwrap_or_else(|| model.clone()),
            planner_model: self.planner_model.unwrap_or_else(|| model.clone()),
            specialist_model: self.specialist_model.unwrap_or_else(|| model.clone()),
            aggregator_model: self.aggregator_model.unwrap_or(model),
            coordination_max_tokens: self
                .coordination_max_tokens
                .unwrap_or(DEFAULT_COORDINATION_MAX_TOKENS),
            specialist_max_tokens: self
                .specialist_max_tokens
                .unwrap_or(DEFAULT_SPECIALIST_MAX_TOKENS),
            aggregator_max_tokens: self
                .aggregator_max_tokens
                .unwrap_or(DEFAULT_AGGREGATOR_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            single_shot_attempts: self
                .single_shot_attempts
                .unwrap_or(DEFAULT_SINGLE_SHOT_ATTEMPTS)
                .max(1),
            coordination_attempts: self
                .coordination_attempts
                .unwrap_or(DEFAULT_COORDINATION_ATTEMPTS)
                .max(1),
            prompt_dir: self.prompt_dir,
            max_summary_rows: self.max_summary_rows.unwrap_or(DEFAULT_MAX_SUMMARY_ROWS),
            audit_sample_size: self.audit_sample_size.unwrap_or(DEFAULT_AUDIT_SAMPLE_SIZE),
            max_query_len: self.max_query_len.unwrap_or(DEFAULT_MAX_QUERY_LEN),
            default_property_id: self.default_property_id,
            default_spreadsheet_id: self.default_spreadsheet_id,
        })
    }
}
