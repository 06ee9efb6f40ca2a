//! Allow-list validation for structured queries.
//!
//! Runs after the model has produced a query and before any source adapter
//! call. The first offending entry fails the whole query.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::StructuredQuery;
use super::analytics_query::{ALLOWED_DIMENSIONS, ALLOWED_METRICS, AnalyticsQuery};
use super::audit_query::{ALLOWED_COLUMNS, AuditMetric, AuditQuery};
use super::table::parse_number_str;
use crate::error::ValidationError;

static RELATIVE_DAYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{1,4}daysAgo$").unwrap_or_else(|_| unreachable!("static pattern"))
});

/// Validates either variant.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate(query: &StructuredQuery) -> Result<(), ValidationError> {
    match query {
        StructuredQuery::Analytics(q) => validate_analytics(q),
        StructuredQuery::Audit(q) => validate_audit(q),
    }
}

/// Validates an analytics query: metrics, dimensions, filter field, dates.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate_analytics(query: &AnalyticsQuery) -> Result<(), ValidationError> {
    if query.metrics.is_empty() {
        return Err(ValidationError::Empty { field: "metrics" });
    }
    for metric in &query.metrics {
        check_allowed("metric", metric, ALLOWED_METRICS)?;
    }
    for dimension in &query.dimensions {
        check_allowed("dimension", dimension, ALLOWED_DIMENSIONS)?;
    }
    if let Some(filter) = &query.filter {
        check_allowed("filter dimension", &filter.field, ALLOWED_DIMENSIONS)?;
    }
    if query.date_ranges.is_empty() {
        return Err(ValidationError::Empty {
            field: "date_ranges",
        });
    }
    for range in &query.date_ranges {
        check_date(&range.start_date)?;
        check_date(&range.end_date)?;
    }
    Ok(())
}

/// Validates an audit query: filter columns, operands, grouping, metrics.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate_audit(query: &AuditQuery) -> Result<(), ValidationError> {
    for filter in &query.filters {
        check_allowed("filter column", &filter.column, ALLOWED_COLUMNS)?;
        if filter.operator.needs_number() {
            let value = filter.value.as_deref().unwrap_or_default();
            if parse_number_str(value).is_none() {
                return Err(ValidationError::InvalidFilterValue {
                    column: filter.column.clone(),
                    value: value.to_string(),
                });
            }
        }
    }
    if let Some(group_by) = &query.group_by {
        check_allowed("group_by column", group_by, ALLOWED_COLUMNS)?;
    }
    if let Some(column) = &query.value_column {
        check_allowed("value column", column, ALLOWED_COLUMNS)?;
    }
    if query.metrics.contains(&AuditMetric::Average) && query.value_column.is_none() {
        return Err(ValidationError::Empty {
            field: "value_column (required by average)",
        });
    }
    Ok(())
}

fn check_allowed(field: &'static str, value: &str, allowed: &[&str]) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidField {
            field,
            value: value.to_string(),
        })
    }
}

fn check_date(value: &str) -> Result<(), ValidationError> {
    let ok = matches!(value, "today" | "yesterday")
        || RELATIVE_DAYS.is_match(value)
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate {
            value: value.to_string(),
        })
    }
}
