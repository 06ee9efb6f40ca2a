//! Request-scoped data model: structured queries, their allow-lists and
//! validation, tabular results, and the audit reduction.
//!
//! Nothing here talks to the reasoning model or the network.

pub mod analytics_query;
pub mod audit_query;
pub mod normalize;
pub mod reduce;
pub mod table;
pub mod validate;

use serde::Serialize;

pub use analytics_query::{AnalyticsQuery, DateRange, DimensionFilter};
pub use audit_query::{AuditFilter, AuditMetric, AuditQuery, FilterOperator};
pub use reduce::{AuditSummary, GroupCount, reduce};
pub use table::{Row, SourceResult, TabularResult};
pub use validate::validate;

/// A validated request understood by one source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum StructuredQuery {
    /// Web-analytics reporting query.
    Analytics(AnalyticsQuery),
    /// Spreadsheet audit query.
    Audit(AuditQuery),
}

impl From<AnalyticsQuery> for StructuredQuery {
    fn from(query: AnalyticsQuery) -> Self {
        Self::Analytics(query)
    }
}

impl From<AuditQuery> for StructuredQuery {
    fn from(query: AuditQuery) -> Self {
        Self::Audit(query)
    }
}
