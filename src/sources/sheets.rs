//! Google Sheets adapter (`spreadsheets.values.get`) for crawler audit exports.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{AuditSource, SourceConfig, status_error, transport_error};
use crate::core::{Row, SourceResult, TabularResult};
use crate::error::{SourceError, SourceErrorKind};

/// Audit adapter reading one range of a spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetsSource {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    api_key: Option<String>,
    range: String,
}

impl SheetsSource {
    /// Creates an adapter from shared source configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport [`SourceError`] if the HTTP client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: config.http_client()?,
            base_url: config.sheets_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            api_key: config.api_key.clone(),
            range: config.sheet_range.clone(),
        })
    }
}

#[async_trait]
impl AuditSource for SheetsSource {
    async fn fetch(&self, spreadsheet_id: &str) -> SourceResult {
        if self.access_token.is_none() && self.api_key.is_none() {
            return Err(SourceError::new(
                SourceErrorKind::Unauthorized,
                "no Google credentials configured (set FQ_GOOGLE_ACCESS_TOKEN or FQ_GOOGLE_API_KEY)",
            ));
        }
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            spreadsheet_id.trim(),
            self.range
        );
        debug!(%url, "reading audit sheet");

        let mut request = self.http.get(&url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let body: Value = response.json().await.map_err(|e| transport_error(&e))?;
        parse_value_range(body)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    range: Option<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Turns a `ValueRange` body into rows keyed by the header row.
///
/// Short rows are padded with empty cells; cells beyond the header are
/// dropped. Fully blank rows are skipped.
///
/// # Errors
///
/// Returns a decode [`SourceError`] if the body does not have the value-range shape.
pub fn parse_value_range(body: Value) -> SourceResult {
    let range: ValueRange = serde_json::from_value(body)
        .map_err(|e| SourceError::new(SourceErrorKind::Decode, e.to_string()))?;

    let mut lines = range.values.into_iter();
    let Some(header) = lines.next() else {
        return Ok(TabularResult::default());
    };
    let header: Vec<String> = header
        .iter()
        .map(|cell| match cell {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })
        .collect();

    let rows: Vec<Row> = lines
        .filter(|line| line.iter().any(|c| !matches!(c, Value::String(s) if s.trim().is_empty())))
        .map(|line| {
            let mut cells = line.into_iter();
            header
                .iter()
                .map(|name| {
                    let value = cells.next().unwrap_or_else(|| Value::String(String::new()));
                    (name.clone(), value)
                })
                .collect()
        })
        .collect();

    let mut result = TabularResult::from_rows(rows);
    result.metadata = range.range.map(|r| json!({ "range": r }));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_row_and_padding() {
        let body = json!({
            "range": "Sheet1!A1:C4",
            "majorDimension": "ROWS",
            "values": [
                ["Address", "Title 1", "Title 1 Length"],
                ["https://example.com/", "Home", "4"],
                ["https://example.com/about"],
                ["", "", ""]
            ]
        });
        let result = parse_value_range(body).unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[1]["Address"], "https://example.com/about");
        assert_eq!(result.rows[1]["Title 1 Length"], "");
        assert_eq!(result.metadata, Some(json!({ "range": "Sheet1!A1:C4" })));
    }

    #[test]
    fn test_no_values_is_empty() {
        let result = parse_value_range(json!({ "range": "Sheet1!A:Z" }))
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(result.is_empty());
    }

    #[test]
    fn test_header_only_is_empty() {
        let result = parse_value_range(json!({ "values": [["Address", "Title 1"]] }))
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_is_unauthorized() {
        let source = SheetsSource::new(&SourceConfig::builder().build())
            .unwrap_or_else(|e| unreachable!("{e}"));
        let err = source.fetch("sheet").await.unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::Unauthorized);
    }
}
