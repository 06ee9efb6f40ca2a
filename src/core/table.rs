//! Tabular results returned by source adapters.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::SourceError;

/// One row: column name → cell value.
pub type Row = Map<String, Value>;

/// Rows returned by a source adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularResult {
    /// Ordered rows.
    pub rows: Vec<Row>,
    /// Row count reported by the source (may exceed `rows.len()` when paged).
    pub row_count: usize,
    /// Source-specific metadata (currency, time zone, range).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TabularResult {
    /// Builds a result whose row count equals the number of rows.
    #[must_use]
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            rows,
            row_count,
            metadata: None,
        }
    }

    /// Returns `true` if no rows were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in first-seen order across all rows.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if !seen.iter().any(|k| k == key) {
                    seen.push(key.clone());
                }
            }
        }
        seen
    }
}

/// Outcome of one source adapter call.
pub type SourceResult = Result<TabularResult, SourceError>;

/// Returns the textual form of a cell, or `None` for null/absent cells.
#[must_use]
pub fn cell_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Returns `true` when a cell is absent, null, or blank.
#[must_use]
pub fn is_missing(value: Option<&Value>) -> bool {
    cell_text(value).is_none_or(|s| s.trim().is_empty())
}

/// Parses a cell as a number.
///
/// Accepts JSON numbers and numeric strings (surrounding whitespace and
/// thousands separators allowed). Anything else yields `None`; there is no
/// fallback coercion.
#[must_use]
pub fn parse_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number_str(s),
        _ => None,
    }
}

/// Parses a string as a finite number, `None` otherwise.
#[must_use]
pub fn parse_number_str(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test_case(json!("42"), Some(42.0) ; "numeric string")]
    #[test_case(json!(" 1,234.5 "), Some(1234.5) ; "thousands separator")]
    #[test_case(json!(7), Some(7.0) ; "json number")]
    #[test_case(json!("n/a"), None ; "non numeric")]
    #[test_case(json!(""), None ; "blank")]
    #[test_case(json!("NaN"), None ; "not finite")]
    #[test_case(Value::Null, None ; "null")]
    fn test_parse_number(value: Value, expected: Option<f64>) {
        assert_eq!(parse_number(Some(&value)), expected);
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(None));
        assert!(is_missing(Some(&Value::Null)));
        assert!(is_missing(Some(&json!("   "))));
        assert!(!is_missing(Some(&json!("Home"))));
        assert!(!is_missing(Some(&json!(0))));
    }

    #[test]
    fn test_columns_first_seen_order() {
        let result = TabularResult::from_rows(vec![
            row(&[("b", json!(1)), ("a", json!(2))]),
            row(&[("c", json!(3))]),
        ]);
        // serde_json::Map is ordered by key unless preserve_order is enabled
        let cols = result.columns();
        assert_eq!(cols.len(), 3);
        assert!(cols.contains(&"c".to_string()));
        assert_eq!(result.row_count, 2);
    }
}
