//! HTTP surface over a scripted model.

#![cfg(feature = "server")]

mod common;

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::{MemoryAnalytics, MemorySheet, Role, ScriptedProvider, config, crawl_sheet, empty, orchestrator};
use fusion_query::server::router;
use serde_json::Value;
use tower::ServiceExt;

fn app(provider: &Arc<ScriptedProvider>) -> axum::Router {
    let analytics = MemoryAnalytics::new(empty());
    let sheet = MemorySheet::new(crawl_sheet(10, 3));
    router(Arc::new(orchestrator(config(), provider, &analytics, &sheet)))
}

async fn post(app: axum::Router, body: &str) -> (StatusCode, Value) {
    let request = Request::post("/query")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| unreachable!());
    let response = app.oneshot(request).await.unwrap_or_else(|_| unreachable!());
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_query_returns_answer() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply(Role::Router, r#"{"intent":"seo"}"#)
            .reply(
                Role::SeoPlan,
                r#"{"filters":[{"column":"title","operator":"missing"}],"metrics":["count"]}"#,
            )
            .reply(Role::SeoSummary, "3 of 10 rows (30.0%) have no title."),
    );
    let (status, body) = post(app(&provider), r#"{"query":"missing titles?","spreadsheetId":"s-1"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "3 of 10 rows (30.0%) have no title.");
}

#[tokio::test]
async fn test_blank_query_is_400() {
    let provider = Arc::new(ScriptedProvider::new());
    let (status, body) = post(app(&provider), r#"{"query":"  "}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "query cannot be empty");
}

#[tokio::test]
async fn test_health() {
    let provider = Arc::new(ScriptedProvider::new());
    let request = Request::get("/health")
        .body(Body::empty())
        .unwrap_or_else(|_| unreachable!());
    let response = app(&provider).oneshot(request).await.unwrap_or_else(|_| unreachable!());
    assert_eq!(response.status(), StatusCode::OK);
}
