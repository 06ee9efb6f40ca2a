//! Ground-truth reduction of audit rows.
//!
//! The SEO agent never lets the model count rows. Filters, grouping and
//! metrics run here over normalized rows, and the resulting figures are
//! handed to the summarization call verbatim.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::audit_query::{AuditFilter, AuditMetric, AuditQuery, FilterOperator};
use super::table::{Row, cell_text, is_missing, parse_number, parse_number_str};
use crate::error::ReduceError;

/// A number as written in prose: `13`, `1,204`, `30.0%`.
static FIGURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:[.,]\d+)*%?").unwrap_or_else(|_| unreachable!("static pattern"))
});

/// Group label used for rows whose grouping cell is blank.
pub const MISSING_GROUP: &str = "(missing)";

/// Row count for one `group_by` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    /// Cell value.
    pub key: String,
    /// Matching rows with that value.
    pub count: usize,
}

/// Exact figures computed from the audit rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditSummary {
    /// Rows in the sheet.
    pub total_rows: usize,
    /// Rows satisfying every filter.
    pub matched_rows: usize,
    /// `matched_rows / total_rows * 100`, or 0 for an empty sheet.
    pub percentage: f64,
    /// Mean of `value_column` over matching rows with a numeric cell.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    /// Column the average was taken over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_column: Option<String>,
    /// Per-group counts, largest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupCount>,
    /// Up to N matching rows.
    pub sample: Vec<Row>,
}

impl AuditSummary {
    /// Percentage rendered with one decimal, e.g. `"30.0%"`.
    #[must_use]
    pub fn percentage_text(&self) -> String {
        format!("{:.1}%", self.percentage)
    }

    /// One sentence carrying the exact figures.
    #[must_use]
    pub fn ground_truth(&self) -> String {
        let mut sentence = format!(
            "{} of {} rows ({}) matched the audit filters.",
            self.matched_rows,
            self.total_rows,
            self.percentage_text()
        );
        if let (Some(avg), Some(column)) = (self.average, &self.value_column) {
            sentence.push_str(&format!(" Average {column}: {avg:.2}."));
        }
        sentence
    }

    /// Whether `text` already states the matched count and percentage.
    ///
    /// Figures are compared as whole numbers, so a count of `3` is not
    /// found inside `13` or `30.0%`.
    #[must_use]
    pub fn is_stated_in(&self, text: &str) -> bool {
        let count = self.matched_rows.to_string();
        let percentage = self.percentage_text();
        let figures: Vec<&str> = FIGURE.find_iter(text).map(|m| m.as_str()).collect();
        let has_count = figures.iter().any(|f| !f.ends_with('%') && f.replace(',', "") == count);
        let has_percentage = figures.iter().any(|f| *f == percentage);
        has_count && has_percentage
    }
}

/// Runs `query` over normalized `rows`.
///
/// # Errors
///
/// Returns [`ReduceError::UnknownColumn`] when a referenced column is not
/// present in any row. An empty row set skips the check.
pub fn reduce(rows: &[Row], query: &AuditQuery, sample_size: usize) -> Result<AuditSummary, ReduceError> {
    if !rows.is_empty() {
        let referenced = query
            .filters
            .iter()
            .map(|f| f.column.as_str())
            .chain(query.group_by.as_deref())
            .chain(query.value_column.as_deref());
        for column in referenced {
            ensure_column(rows, column)?;
        }
    }

    let matched: Vec<&Row> = rows
        .iter()
        .filter(|row| query.filters.iter().all(|f| row_matches(row, f)))
        .collect();

    let total_rows = rows.len();
    let matched_rows = matched.len();
    #[allow(clippy::cast_precision_loss)]
    let percentage = if total_rows == 0 {
        0.0
    } else {
        matched_rows as f64 / total_rows as f64 * 100.0
    };

    let average = if query.metrics.contains(&AuditMetric::Average) {
        query
            .value_column
            .as_deref()
            .and_then(|column| mean(matched.iter().filter_map(|row| parse_number(row.get(column)))))
    } else {
        None
    };

    let groups = query
        .group_by
        .as_deref()
        .map(|column| group_counts(&matched, column))
        .unwrap_or_default();

    Ok(AuditSummary {
        total_rows,
        matched_rows,
        percentage,
        average,
        value_column: average.and(query.value_column.clone()),
        groups,
        sample: matched.into_iter().take(sample_size).cloned().collect(),
    })
}

/// Evaluates one filter against one row.
///
/// Numeric comparisons fail when either side does not parse.
#[must_use]
pub fn row_matches(row: &Row, filter: &AuditFilter) -> bool {
    let cell = row.get(&filter.column);
    let operand = filter.value.as_deref().unwrap_or_default();
    match filter.operator {
        FilterOperator::Missing => is_missing(cell),
        FilterOperator::Eq => values_equal(cell_text(cell).as_deref(), operand),
        FilterOperator::Ne => !values_equal(cell_text(cell).as_deref(), operand),
        FilterOperator::Gt => compare(cell, operand) == Some(Ordering::Greater),
        FilterOperator::Lt => compare(cell, operand) == Some(Ordering::Less),
        FilterOperator::Contains => cell_text(cell)
            .is_some_and(|text| text.to_lowercase().contains(&operand.to_lowercase())),
        FilterOperator::LengthGt => {
            let len = cell_text(cell).map_or(0, |text| text.trim().chars().count());
            #[allow(clippy::cast_precision_loss)]
            parse_number_str(operand).is_some_and(|limit| len as f64 > limit)
        }
    }
}

fn values_equal(cell: Option<&str>, operand: &str) -> bool {
    let Some(cell) = cell else {
        return false;
    };
    match (parse_number_str(cell), parse_number_str(operand)) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        _ => cell.trim().eq_ignore_ascii_case(operand.trim()),
    }
}

fn compare(cell: Option<&serde_json::Value>, operand: &str) -> Option<Ordering> {
    let left = parse_number(cell)?;
    let right = parse_number_str(operand)?;
    left.partial_cmp(&right)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0_u32), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / f64::from(n))
}

fn group_counts(rows: &[&Row], column: &str) -> Vec<GroupCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        let key = cell_text(row.get(column))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| MISSING_GROUP.to_string());
        *counts.entry(key).or_default() += 1;
    }
    let mut groups: Vec<GroupCount> = counts
        .into_iter()
        .map(|(key, count)| GroupCount { key, count })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    groups
}

fn ensure_column(rows: &[Row], column: &str) -> Result<(), ReduceError> {
    if rows.iter().any(|row| row.contains_key(column)) {
        return Ok(());
    }
    let mut available: Vec<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    available.sort_unstable();
    available.dedup();
    Err(ReduceError::UnknownColumn {
        column: column.to_string(),
        available: available.join(", "),
    })
}
