//! Specialist answers and the per-request outcome record.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use super::router::Intent;
use crate::error::{AgentError, ValidationError};

/// The two specialist agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
pub enum Specialist {
    /// Web-analytics reporting.
    #[serde(rename = "Analytics_Agent")]
    Analytics,
    /// Technical SEO audit.
    #[serde(rename = "SEO_Agent")]
    Seo,
}

impl Specialist {
    /// Short key used in results and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::Seo => "seo",
        }
    }

    /// Human-facing name used in error strings.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Analytics => "Analytics Agent",
            Self::Seo => "SEO Agent",
        }
    }
}

impl fmt::Display for Specialist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialist {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.trim_end_matches("_agent") {
            "analytics" | "ga4" => Ok(Self::Analytics),
            "seo" | "audit" => Ok(Self::Seo),
            _ => Err(format!("unknown agent: {s}")),
        }
    }
}

impl<'de> Deserialize<'de> for Specialist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// How a specialist invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// A grounded answer was produced.
    Answered,
    /// The source returned nothing or was unavailable.
    NoData,
    /// Validation or invocation failed.
    Error,
}

impl AnswerStatus {
    /// Wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::NoData => "no_data",
            Self::Error => "error",
        }
    }
}

/// Natural-language answer from one specialist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentAnswer {
    /// Which specialist produced it.
    pub specialist: Specialist,
    /// Answer text (always user-presentable).
    pub text: String,
    /// Outcome classification.
    pub status: AnswerStatus,
}

impl AgentAnswer {
    /// A grounded answer.
    pub fn answered(specialist: Specialist, text: impl Into<String>) -> Self {
        Self {
            specialist,
            text: text.into(),
            status: AnswerStatus::Answered,
        }
    }

    /// A deterministic no-data explanation.
    pub fn no_data(specialist: Specialist, text: impl Into<String>) -> Self {
        Self {
            specialist,
            text: text.into(),
            status: AnswerStatus::NoData,
        }
    }

    /// An error string, prefixed with the specialist's display name.
    pub fn error(specialist: Specialist, message: impl fmt::Display) -> Self {
        Self {
            specialist,
            text: format!("{} Error: {message}", specialist.display_name()),
            status: AnswerStatus::Error,
        }
    }

    /// A structured query that failed its allow-list check.
    pub fn rejected(specialist: Specialist, err: ValidationError) -> Self {
        Self {
            specialist,
            text: AgentError::from(err).to_string(),
            status: AnswerStatus::Error,
        }
    }

    /// Whether the aggregator can use this answer as data.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        matches!(self.status, AnswerStatus::Answered)
    }
}

/// Which control path handled the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// One specialist answered directly.
    Single,
    /// Planner, sequential tasks, aggregator.
    Fusion,
    /// The router could not classify the query.
    Unclassified,
    /// A required identifier was missing.
    MissingIdentifier,
    /// An orchestration failure was converted to text.
    Failed,
}

/// One executed plan task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    /// Plan task id.
    pub id: u32,
    /// Specialist that ran it.
    pub specialist: Specialist,
    /// How it ended.
    pub status: AnswerStatus,
}

/// Observability record for one request.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    /// Final answer text.
    pub answer: String,
    /// Classified intent, when routing succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    /// Router rationale (observability only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Control path taken.
    pub route: Route,
    /// Tasks executed, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskRecord>,
    /// Wall-clock time spent.
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
