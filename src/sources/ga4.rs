//! GA4 Data API adapter (`properties/{id}:runReport`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{AnalyticsSource, SourceConfig, status_error, transport_error};
use crate::core::{AnalyticsQuery, Row, SourceResult, TabularResult};
use crate::error::{SourceError, SourceErrorKind};

/// Reporting adapter over the GA4 Data API REST surface.
#[derive(Debug, Clone)]
pub struct Ga4Source {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    row_limit: u32,
}

impl Ga4Source {
    /// Creates an adapter from shared source configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport [`SourceError`] if the HTTP client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: config.http_client()?,
            base_url: config.analytics_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            row_limit: config.row_limit,
        })
    }
}

#[async_trait]
impl AnalyticsSource for Ga4Source {
    async fn run(&self, property_id: &str, query: &AnalyticsQuery) -> SourceResult {
        let Some(token) = self.access_token.as_deref() else {
            return Err(SourceError::new(
                SourceErrorKind::Unauthorized,
                "no Google access token configured (set FQ_GOOGLE_ACCESS_TOKEN)",
            ));
        };
        let url = format!(
            "{}/v1beta/properties/{}:runReport",
            self.base_url,
            property_id.trim()
        );
        let body = build_run_report_body(query, self.row_limit);
        debug!(%url, "running analytics report");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let report: Value = response.json().await.map_err(|e| transport_error(&e))?;
        parse_run_report_response(report)
    }
}

/// Builds the JSON body of a `runReport` request.
#[must_use]
pub fn build_run_report_body(query: &AnalyticsQuery, row_limit: u32) -> Value {
    let mut body = json!({
        "metrics": query.metrics.iter().map(|m| json!({ "name": m })).collect::<Vec<_>>(),
        "dimensions": query.dimensions.iter().map(|d| json!({ "name": d })).collect::<Vec<_>>(),
        "dateRanges": query
            .date_ranges
            .iter()
            .map(|r| json!({ "startDate": r.start_date, "endDate": r.end_date }))
            .collect::<Vec<_>>(),
        "limit": row_limit.to_string(),
    });
    if let Some(filter) = &query.filter
        && let Some(obj) = body.as_object_mut()
    {
        obj.insert(
            "dimensionFilter".to_string(),
            json!({
                "filter": {
                    "fieldName": filter.field,
                    "stringFilter": { "matchType": "EXACT", "value": filter.value },
                }
            }),
        );
    }
    body
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Cell {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    #[serde(default)]
    dimension_values: Vec<Cell>,
    #[serde(default)]
    metric_values: Vec<Cell>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportMetadata {
    #[serde(default)]
    currency_code: Option<String>,
    #[serde(default)]
    time_zone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    dimension_headers: Vec<Header>,
    #[serde(default)]
    metric_headers: Vec<Header>,
    #[serde(default)]
    rows: Vec<ReportRow>,
    #[serde(default)]
    row_count: Option<usize>,
    #[serde(default)]
    metadata: Option<ReportMetadata>,
}

/// Converts a `runReport` response into row mappings keyed by header name.
///
/// # Errors
///
/// Returns a decode [`SourceError`] if the body does not have the report shape.
pub fn parse_run_report_response(body: Value) -> SourceResult {
    let report: RunReportResponse = serde_json::from_value(body)
        .map_err(|e| SourceError::new(SourceErrorKind::Decode, e.to_string()))?;

    let rows: Vec<Row> = report
        .rows
        .into_iter()
        .map(|row| {
            let dims = report.dimension_headers.iter().zip(row.dimension_values);
            let metrics = report.metric_headers.iter().zip(row.metric_values);
            dims.chain(metrics)
                .map(|(header, cell)| {
                    let value = cell.value.map_or(Value::Null, Value::String);
                    (header.name.clone(), value)
                })
                .collect()
        })
        .collect();

    let row_count = report.row_count.unwrap_or(rows.len());
    let metadata = report.metadata.map(|m| {
        json!({
            "currency_code": m.currency_code,
            "time_zone": m.time_zone,
        })
    });
    Ok(TabularResult {
        rows,
        row_count,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DateRange, DimensionFilter};

    fn query() -> AnalyticsQuery {
        AnalyticsQuery {
            metrics: vec!["activeUsers".to_string()],
            dimensions: vec!["date".to_string()],
            date_ranges: vec![DateRange::new("14daysAgo", "yesterday")],
            filter: None,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = build_run_report_body(&query(), 500);
        assert_eq!(body["metrics"][0]["name"], "activeUsers");
        assert_eq!(body["dimensions"][0]["name"], "date");
        assert_eq!(body["dateRanges"][0]["startDate"], "14daysAgo");
        assert_eq!(body["dateRanges"][0]["endDate"], "yesterday");
        assert_eq!(body["limit"], "500");
        assert!(body.get("dimensionFilter").is_none());
    }

    #[test]
    fn test_request_body_filter() {
        let mut q = query();
        q.filter = Some(DimensionFilter {
            field: "pagePath".to_string(),
            value: "/pricing".to_string(),
        });
        let body = build_run_report_body(&q, 10);
        let filter = &body["dimensionFilter"]["filter"];
        assert_eq!(filter["fieldName"], "pagePath");
        assert_eq!(filter["stringFilter"]["matchType"], "EXACT");
        assert_eq!(filter["stringFilter"]["value"], "/pricing");
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "dimensionHeaders": [{ "name": "date" }],
            "metricHeaders": [{ "name": "activeUsers", "type": "TYPE_INTEGER" }],
            "rows": [
                { "dimensionValues": [{ "value": "20240101" }], "metricValues": [{ "value": "120" }] },
                { "dimensionValues": [{ "value": "20240102" }], "metricValues": [{ "value": "98" }] }
            ],
            "rowCount": 2,
            "metadata": { "currencyCode": "USD", "timeZone": "Europe/London" }
        });
        let result = parse_run_report_response(body).unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[0]["date"], "20240101");
        assert_eq!(result.rows[1]["activeUsers"], "98");
        assert_eq!(
            result.metadata,
            Some(json!({ "currency_code": "USD", "time_zone": "Europe/London" }))
        );
    }

    #[test]
    fn test_parse_empty_report() {
        let result = parse_run_report_response(json!({ "kind": "analyticsData#runReport" }))
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(result.is_empty());
        assert_eq!(result.row_count, 0);
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = parse_run_report_response(json!({ "rows": "nope" })).unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let source = Ga4Source::new(&SourceConfig::builder().build())
            .unwrap_or_else(|e| unreachable!("{e}"));
        let err = source.run("123", &query()).await.unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::Unauthorized);
    }
}
