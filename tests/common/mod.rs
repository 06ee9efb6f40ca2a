//! Shared fixtures: a role-aware scripted provider and in-memory sources.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fusion_query::agent::{AgentConfig, ChatRequest, ChatResponse, LlmProvider, Orchestrator, PromptSet};
use fusion_query::core::{AnalyticsQuery, Row, SourceResult, TabularResult};
use fusion_query::error::AgentError;
use fusion_query::sources::{AnalyticsSource, AuditSource};
use serde_json::json;

/// Which agent a request came from, told apart by its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Router,
    Planner,
    AnalyticsPlan,
    AnalyticsSummary,
    SeoPlan,
    SeoSummary,
    Aggregator,
}

impl Role {
    fn of(request: &ChatRequest) -> Option<Self> {
        let prompts = PromptSet::defaults();
        let system = request.messages.first().map(|m| m.content.as_str())?;
        [
            (prompts.router.as_str(), Self::Router),
            (prompts.planner.as_str(), Self::Planner),
            (prompts.analytics_plan.as_str(), Self::AnalyticsPlan),
            (prompts.analytics_summary.as_str(), Self::AnalyticsSummary),
            (prompts.seo_plan.as_str(), Self::SeoPlan),
            (prompts.seo_summary.as_str(), Self::SeoSummary),
            (prompts.aggregator.as_str(), Self::Aggregator),
        ]
        .into_iter()
        .find_map(|(prompt, role)| (prompt == system).then_some(role))
    }
}

enum Reply {
    Text(String),
    RateLimited,
}

/// Provider answering from per-role queues and recording every request.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<HashMap<Role, VecDeque<Reply>>>,
    requests: Mutex<Vec<(Role, ChatRequest)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a text reply for `role`.
    pub fn reply(self, role: Role, text: impl Into<String>) -> Self {
        self.push(role, Reply::Text(text.into()));
        self
    }

    /// Queues a throttling failure for `role`.
    pub fn rate_limit(self, role: Role, times: usize) -> Self {
        for _ in 0..times {
            self.push(role, Reply::RateLimited);
        }
        self
    }

    fn push(&self, role: Role, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.entry(role).or_default().push_back(reply);
        }
    }

    /// Requests seen for `role`, in order.
    pub fn requests(&self, role: Role) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.iter().filter(|(seen, _)| *seen == role).map(|(_, req)| req.clone()).collect())
            .unwrap_or_default()
    }

    /// Last user message sent for `role`.
    pub fn last_prompt(&self, role: Role) -> String {
        self.requests(role)
            .last()
            .and_then(|r| r.last_user_content().map(str::to_string))
            .unwrap_or_default()
    }

    /// Roles in call order.
    pub fn call_order(&self) -> Vec<Role> {
        self.requests
            .lock()
            .map(|r| r.iter().map(|(role, _)| *role).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let role = Role::of(request).ok_or_else(|| AgentError::ApiRequest {
            message: "unknown system prompt".to_string(),
            status: None,
        })?;
        if let Ok(mut seen) = self.requests.lock() {
            seen.push((role, request.clone()));
        }
        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.get_mut(&role).and_then(VecDeque::pop_front));
        match reply {
            Some(Reply::Text(text)) => Ok(ChatResponse::text(text)),
            Some(Reply::RateLimited) => Err(AgentError::RateLimited {
                message: "429 Too Many Requests".to_string(),
            }),
            None => Err(AgentError::ApiRequest {
                message: format!("no scripted reply for {role:?}"),
                status: None,
            }),
        }
    }
}

/// Analytics source returning a fixed result and recording calls.
pub struct MemoryAnalytics {
    result: SourceResult,
    calls: Mutex<Vec<(String, AnalyticsQuery)>>,
}

impl MemoryAnalytics {
    pub fn new(result: SourceResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, AnalyticsQuery)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AnalyticsSource for MemoryAnalytics {
    async fn run(&self, property_id: &str, query: &AnalyticsQuery) -> SourceResult {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((property_id.to_string(), query.clone()));
        }
        self.result.clone()
    }
}

/// Audit source returning a fixed sheet and recording calls.
pub struct MemorySheet {
    result: SourceResult,
    calls: Mutex<Vec<String>>,
}

impl MemorySheet {
    pub fn new(result: SourceResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditSource for MemorySheet {
    async fn fetch(&self, spreadsheet_id: &str) -> SourceResult {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(spreadsheet_id.to_string());
        }
        self.result.clone()
    }
}

/// Configuration with both default identifiers set.
pub fn config() -> AgentConfig {
    AgentConfig::builder()
        .api_key("test")
        .default_property_id("prop-default")
        .default_spreadsheet_id("sheet-default")
        .build()
        .unwrap_or_else(|_| unreachable!())
}

/// Configuration with no default identifiers.
pub fn config_without_defaults() -> AgentConfig {
    AgentConfig::builder()
        .api_key("test")
        .build()
        .unwrap_or_else(|_| unreachable!())
}

pub fn orchestrator(
    config: AgentConfig,
    provider: &Arc<ScriptedProvider>,
    analytics: &Arc<MemoryAnalytics>,
    sheet: &Arc<MemorySheet>,
) -> Orchestrator {
    Orchestrator::with_prompts(
        Arc::clone(provider) as Arc<dyn LlmProvider>,
        config,
        &PromptSet::defaults(),
        Arc::clone(analytics) as Arc<dyn AnalyticsSource>,
        Arc::clone(sheet) as Arc<dyn AuditSource>,
    )
}

/// `days` daily rows of `activeUsers`, 100 each.
pub fn daily_users(days: usize) -> SourceResult {
    let rows: Vec<Row> = (0..days)
        .map(|i| {
            [
                ("date".to_string(), json!(format!("202503{:02}", i + 1))),
                ("activeUsers".to_string(), json!("100")),
            ]
            .into_iter()
            .collect()
        })
        .collect();
    Ok(TabularResult::from_rows(rows))
}

/// Crawler export with raw headers: `total` pages, the first `missing`
/// without a title.
pub fn crawl_sheet(total: usize, missing: usize) -> SourceResult {
    let rows: Vec<Row> = (0..total)
        .map(|i| {
            let (title, length) = if i < missing {
                (String::new(), String::new())
            } else {
                let title = format!("Product page {i}");
                let length = title.chars().count().to_string();
                (title, length)
            };
            [
                ("Address".to_string(), json!(format!("https://example.com/p/{i}"))),
                ("Status Code".to_string(), json!("200")),
                ("Title 1".to_string(), json!(title)),
                ("Title 1 Length".to_string(), json!(length)),
            ]
            .into_iter()
            .collect()
        })
        .collect();
    Ok(TabularResult::from_rows(rows))
}

pub fn empty() -> SourceResult {
    Ok(TabularResult::default())
}
