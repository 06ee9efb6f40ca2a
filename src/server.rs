//! HTTP surface: `POST /query` and `GET /health`.
//!
//! A blank query is a client error (400). Anything else that escapes the
//! orchestrator is a server error (500) with an opaque body; details go to
//! the log only.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::agent::{Orchestrator, QueryRequest};
use crate::error::AgentError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl ServerConfig {
    /// Reads `FQ_HOST` and `FQ_PORT`, falling back to `0.0.0.0:8080`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("FQ_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: std::env::var("FQ_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }

    /// `host:port`.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// Final answer text.
    pub answer: String,
}

struct ApiError(AgentError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            let body = Json(json!({ "detail": self.0.to_string() }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }
        error!(error = %self.0, "request failed");
        let body = Json(json!({ "detail": "Internal server error" }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Builds the application router.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/health", get(health))
        .with_state(orchestrator)
}

async fn query(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let answer = orchestrator.answer(request).await.map_err(ApiError)?;
    Ok(Json(QueryResponse { answer }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Serves until ctrl-c.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(orchestrator: Arc<Orchestrator>, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_addr() {
        assert_eq!(ServerConfig::default().addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_client_error_is_400() {
        let response = ApiError(AgentError::EmptyQuery).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_is_opaque_500() {
        let response = ApiError(AgentError::Orchestration {
            message: "secret detail".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
