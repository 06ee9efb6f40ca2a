//! Source adapters: the web-analytics reporting API and the audit spreadsheet.
//!
//! Agents depend on the [`AnalyticsSource`] and [`AuditSource`] traits only.
//! The HTTP implementations in [`ga4`] and [`sheets`] are shared across
//! concurrent requests and hold no per-call state.

pub mod ga4;
pub mod sheets;

use std::time::Duration;

use async_trait::async_trait;

use crate::core::{AnalyticsQuery, SourceResult};
use crate::error::{SourceError, SourceErrorKind};

pub use ga4::Ga4Source;
pub use sheets::SheetsSource;

/// Default request timeout for source calls.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default maximum rows requested from the reporting API.
const DEFAULT_ROW_LIMIT: u32 = 10_000;
/// Default A1 range read from the audit sheet.
const DEFAULT_SHEET_RANGE: &str = "A:Z";
const DEFAULT_ANALYTICS_BASE_URL: &str = "https://analyticsdata.googleapis.com";
const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Reporting source: structured query in, rows or typed error out.
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    /// Runs `query` against `property_id`.
    async fn run(&self, property_id: &str, query: &AnalyticsQuery) -> SourceResult;
}

/// Audit source: spreadsheet id in, raw rows (header row as keys) out.
///
/// Column names are returned as they appear in the sheet; callers normalize.
#[async_trait]
pub trait AuditSource: Send + Sync {
    /// Reads the audit sheet.
    async fn fetch(&self, spreadsheet_id: &str) -> SourceResult;
}

/// Configuration shared by the HTTP source adapters.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// OAuth bearer token for Google APIs.
    pub access_token: Option<String>,
    /// API key for publicly readable sheets.
    pub api_key: Option<String>,
    /// Reporting API root.
    pub analytics_base_url: String,
    /// Sheets API root.
    pub sheets_base_url: String,
    /// A1 range read from the audit sheet.
    pub sheet_range: String,
    /// Maximum rows requested per report.
    pub row_limit: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl SourceConfig {
    /// Creates a new builder for `SourceConfig`.
    #[must_use]
    pub fn builder() -> SourceConfigBuilder {
        SourceConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::builder().from_env().build()
    }

    /// Builds the shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a transport [`SourceError`] if the client cannot be built.
    pub fn http_client(&self) -> Result<reqwest::Client, SourceError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SourceError::new(SourceErrorKind::Transport, e.to_string()))
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`SourceConfig`].
#[derive(Debug, Clone, Default)]
pub struct SourceConfigBuilder {
    access_token: Option<String>,
    api_key: Option<String>,
    analytics_base_url: Option<String>,
    sheets_base_url: Option<String>,
    sheet_range: Option<String>,
    row_limit: Option<u32>,
    timeout: Option<Duration>,
}

impl SourceConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.access_token.is_none() {
            self.access_token = std::env::var("FQ_GOOGLE_ACCESS_TOKEN")
                .or_else(|_| std::env::var("GOOGLE_ACCESS_TOKEN"))
                .ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("FQ_GOOGLE_API_KEY").ok();
        }
        if self.analytics_base_url.is_none() {
            self.analytics_base_url = std::env::var("FQ_ANALYTICS_BASE_URL").ok();
        }
        if self.sheets_base_url.is_none() {
            self.sheets_base_url = std::env::var("FQ_SHEETS_BASE_URL").ok();
        }
        if self.sheet_range.is_none() {
            self.sheet_range = std::env::var("FQ_SHEET_RANGE").ok();
        }
        if self.row_limit.is_none() {
            self.row_limit = std::env::var("FQ_ROW_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        self
    }

    /// Sets the OAuth bearer token.
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the Sheets API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the reporting API root.
    #[must_use]
    pub fn analytics_base_url(mut self, url: impl Into<String>) -> Self {
        self.analytics_base_url = Some(url.into());
        self
    }

    /// Sets the Sheets API root.
    #[must_use]
    pub fn sheets_base_url(mut self, url: impl Into<String>) -> Self {
        self.sheets_base_url = Some(url.into());
        self
    }

    /// Sets the A1 range read from the audit sheet.
    #[must_use]
    pub fn sheet_range(mut self, range: impl Into<String>) -> Self {
        self.sheet_range = Some(range.into());
        self
    }

    /// Sets the report row limit.
    #[must_use]
    pub const fn row_limit(mut self, n: u32) -> Self {
        self.row_limit = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Builds the [`SourceConfig`].
    #[must_use]
    pub fn build(self) -> SourceConfig {
        SourceConfig {
            access_token: self.access_token,
            api_key: self.api_key,
            analytics_base_url: self
                .analytics_base_url
                .unwrap_or_else(|| DEFAULT_ANALYTICS_BASE_URL.to_string()),
            sheets_base_url: self
                .sheets_base_url
                .unwrap_or_else(|| DEFAULT_SHEETS_BASE_URL.to_string()),
            sheet_range: self
                .sheet_range
                .unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
            row_limit: self.row_limit.unwrap_or(DEFAULT_ROW_LIMIT),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

/// Maps a non-success HTTP status onto a [`SourceError`].
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> SourceError {
    let kind = match status.as_u16() {
        401 | 403 => SourceErrorKind::Unauthorized,
        404 => SourceErrorKind::NotFound,
        _ => SourceErrorKind::Upstream,
    };
    let excerpt: String = body.chars().take(200).collect();
    SourceError::new(kind, format!("HTTP {status}: {excerpt}"))
}

/// Maps a reqwest transport failure onto a [`SourceError`].
pub(crate) fn transport_error(err: &reqwest::Error) -> SourceError {
    if err.is_decode() {
        SourceError::new(SourceErrorKind::Decode, err.to_string())
    } else {
        SourceError::new(SourceErrorKind::Transport, err.to_string())
    }
}
