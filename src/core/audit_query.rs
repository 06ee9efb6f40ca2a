//! Structured query for the spreadsheet-backed SEO audit.
//!
//! Unlike the analytics variant, the audit query runs locally: the sheet is
//! fetched whole and [`crate::core::reduce`] applies filters, grouping and
//! metrics to the normalized rows.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Canonical audit columns a query may reference.
///
/// These are the targets of [`crate::core::normalize::COLUMN_SYNONYMS`].
pub const ALLOWED_COLUMNS: &[&str] = &[
    "address",
    "content_type",
    "status_code",
    "status",
    "indexability",
    "indexability_status",
    "title",
    "title_length",
    "meta_description",
    "meta_desc_length",
    "h1",
    "h1_length",
    "canonical",
    "word_count",
    "response_time",
    "crawl_depth",
    "inlinks",
    "outlinks",
];

/// Comparison applied by an [`AuditFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum FilterOperator {
    /// Equal (numeric when both sides parse, else case-insensitive text).
    #[serde(rename = "==", alias = "=", alias = "eq", alias = "equals")]
    Eq,
    /// Not equal.
    #[serde(rename = "!=", alias = "ne", alias = "not_equals")]
    Ne,
    /// Numeric greater-than.
    #[serde(rename = ">", alias = "gt", alias = "greater_than")]
    Gt,
    /// Numeric less-than.
    #[serde(rename = "<", alias = "lt", alias = "less_than")]
    Lt,
    /// Case-insensitive substring.
    #[serde(rename = "contains")]
    Contains,
    /// Text length (in characters) greater than a number.
    #[serde(
        rename = "length_gt",
        alias = "length >",
        alias = "length_greater_than",
        alias = "len_gt"
    )]
    LengthGt,
    /// Cell absent, null or blank.
    #[serde(
        rename = "missing",
        alias = "is_empty",
        alias = "is_null",
        alias = "empty"
    )]
    Missing,
}

impl FilterOperator {
    /// Whether the filter value must parse as a number.
    #[must_use]
    pub const fn needs_number(self) -> bool {
        matches!(self, Self::Gt | Self::Lt | Self::LengthGt)
    }

    /// Wire symbol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Contains => "contains",
            Self::LengthGt => "length_gt",
            Self::Missing => "missing",
        }
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{column, operator, value}` condition. All filters must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuditFilter {
    /// Canonical column name.
    pub column: String,
    /// Comparison.
    pub operator: FilterOperator,
    /// Comparison operand; ignored by `missing`.
    #[serde(default, deserialize_with = "value_as_string")]
    #[schemars(with = "Option<String>")]
    pub value: Option<String>,
}

/// Aggregations computed over the matching rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuditMetric {
    /// Number of matching rows.
    Count,
    /// Matching rows as a share of all rows.
    Percentage,
    /// Mean of `value_column` over matching rows.
    Average,
}

/// Audit variant of a structured query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuditQuery {
    /// Conditions, all of which must hold.
    #[serde(default)]
    pub filters: Vec<AuditFilter>,
    /// Optional grouping column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    /// Requested aggregations (count is always computed).
    #[serde(default)]
    pub metrics: Vec<AuditMetric>,
    /// Column averaged by [`AuditMetric::Average`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_column: Option<String>,
}

/// Models emit numbers and booleans as bare JSON; keep their text form.
fn value_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
