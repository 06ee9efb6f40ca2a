//! Reasoning layer: provider plumbing and the agents built on it.
//!
//! # Architecture
//!
//! ```text
//! QueryRequest → Orchestrator
//!   ├── IntentRouter (analytics | seo | fusion)
//!   ├── single:  AnalyticsAgent | SeoAgent
//!   └── fusion:  Planner → tasks in order → Aggregator
//!                  └── each task runs one specialist,
//!                      prior answers injected as context
//! ```
//!
//! Every model call goes through [`Agent::execute`] and its
//! [`RetryPolicy`]. Specialists plan a structured query, validate it, call
//! their source, then summarize.

pub mod aggregator;
pub mod analytics;
pub mod answer;
pub mod client;
pub mod config;
pub mod message;
pub mod orchestrator;
pub mod parse;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod router;
pub mod seo;
pub mod traits;

// Re-export key types
pub use aggregator::{Aggregator, INSUFFICIENT_DATA, SpecialistResults};
pub use analytics::AnalyticsAgent;
pub use answer::{AgentAnswer, AnswerStatus, QueryOutcome, Route, Specialist, TaskRecord};
pub use client::create_provider;
pub use config::AgentConfig;
pub use message::{ChatMessage, ChatRequest, ChatResponse, ResponseSchema, Role, TokenUsage};
pub use orchestrator::{CLARIFICATION, Orchestrator, QueryRequest};
pub use planner::{ExecutionPlan, Planner, Task};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use retry::RetryPolicy;
pub use router::{Intent, IntentRouter, RouterDecision};
pub use seo::SeoAgent;
pub use traits::{Agent, AgentResponse, InferenceCall, execute_json};
