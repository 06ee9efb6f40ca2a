//! Error types for fusion-query.
//!
//! Each layer owns its error enum. Component boundaries (specialist agents,
//! planner, aggregator, orchestrator) convert these into natural-language
//! answers; only the CLI and server surfaces see [`Error`].

use thiserror::Error;

/// Result alias for top-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for CLI commands and the HTTP surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent / orchestration failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Command execution failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from CLI command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not complete.
    #[error("command failed: {0}")]
    ExecutionFailed(String),

    /// Output could not be rendered in the requested format.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}

/// Errors raised by the LLM and agent layer.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured.
    #[error("no API key configured (set FQ_API_KEY, LITELLM_API_KEY or OPENAI_API_KEY)")]
    ApiKeyMissing,

    /// Unknown provider name in configuration.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Configured provider name.
        name: String,
    },

    /// The reasoning model throttled the request. The only retryable kind.
    #[error("rate limited by the reasoning model: {message}")]
    RateLimited {
        /// Upstream message.
        message: String,
    },

    /// Any other failure talking to the reasoning model.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Upstream message.
        message: String,
        /// HTTP status when known.
        status: Option<u16>,
    },

    /// The model's output did not have the expected shape.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// The raw model output.
        content: String,
    },

    /// A structured query referenced a disallowed field.
    #[error("Validation Error: {0}")]
    InvalidField(#[from] ValidationError),

    /// A source adapter failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The audit reduction could not run.
    #[error(transparent)]
    Reduce(#[from] ReduceError),

    /// The inbound query was blank.
    #[error("query cannot be empty")]
    EmptyQuery,

    /// The inbound query exceeded the accepted length.
    #[error("query exceeds maximum length ({len} characters, max {max})")]
    QueryTooLong {
        /// Actual length in characters.
        len: usize,
        /// Accepted maximum.
        max: usize,
    },

    /// Generic orchestration failure.
    #[error("orchestration failed: {message}")]
    Orchestration {
        /// What went wrong.
        message: String,
    },
}

impl AgentError {
    /// Returns `true` for transient throttling, which the retry policy retries.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Returns `true` when the caller supplied a bad request.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyQuery | Self::QueryTooLong { .. })
    }
}

/// A structured query failed validation against its allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Field value is not in the allow-list.
    #[error("invalid {field}: {value}")]
    InvalidField {
        /// Which field (e.g. `metric`, `dimension`, `filter column`).
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// A required list was empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Which field.
        field: &'static str,
    },

    /// A date endpoint was neither a calendar date nor a relative token.
    #[error("invalid date: {value} (expected YYYY-MM-DD, today, yesterday or NdaysAgo)")]
    InvalidDate {
        /// The offending value.
        value: String,
    },

    /// A numeric operator was given a non-numeric value.
    #[error("filter on {column} needs a numeric value, got {value:?}")]
    InvalidFilterValue {
        /// Filter column.
        column: String,
        /// The offending value.
        value: String,
    },
}

/// Classification of a source adapter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Missing or rejected credentials.
    Unauthorized,
    /// Property or spreadsheet does not exist.
    NotFound,
    /// Upstream returned a non-success status.
    Upstream,
    /// Connection or timeout failure.
    Transport,
    /// Response body could not be decoded.
    Decode,
    /// The source returned no rows.
    Empty,
}

impl std::fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not found",
            Self::Upstream => "upstream error",
            Self::Transport => "transport error",
            Self::Decode => "decode error",
            Self::Empty => "empty",
        })
    }
}

/// Error returned by a source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SourceError {
    /// Failure classification.
    pub kind: SourceErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl SourceError {
    /// Creates a new source error.
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors from the local audit reduction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    /// A validated column does not exist in the fetched sheet.
    #[error("the audit data has no '{column}' column (available: {available})")]
    UnknownColumn {
        /// Missing column.
        column: String,
        /// Comma-separated list of columns present.
        available: String,
    },
}
