//! HTTP surface: routing, shared state, and the JSON error contract.
//!
//! Every endpoint returns well-formed JSON with a boolean `success` flag,
//! including on failure; callers never have to treat a non-JSON response as
//! an expected failure path.

mod handlers;
mod legacy;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::AppConfig;
use crate::db::{EngineRouter, SqlxEngines};
use crate::error::{QuerygateError, Result};
use crate::store::{AgentStore, MemoryStore, SavedQueryStore, TranscriptStore};

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub agents: Arc<dyn AgentStore>,
    pub saved_queries: Arc<dyn SavedQueryStore>,
    pub transcripts: Arc<dyn TranscriptStore>,
    pub engines: Arc<dyn EngineRouter>,
    /// Process-wide pool handle for the legacy fixed-credential path.
    /// Lazily created, torn down and nulled on pool-level error.
    pub legacy_pool: Arc<tokio::sync::Mutex<Option<sqlx::MySqlPool>>>,
}

impl AppState {
    /// Production wiring: sqlx engines, config-backed agent store, and an
    /// in-memory favourites/transcript store.
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let memory = Arc::new(MemoryStore::new());
        Self {
            agents: config.clone(),
            saved_queries: memory.clone(),
            transcripts: memory,
            engines: Arc::new(SqlxEngines::new()),
            legacy_pool: Arc::new(tokio::sync::Mutex::new(None)),
            config,
        }
    }

    /// Replaces the engine router, e.g. with a mock for tests.
    pub fn with_engines(mut self, engines: Arc<dyn EngineRouter>) -> Self {
        self.engines = engines;
        self
    }

    /// Replaces the favourites and transcript stores.
    pub fn with_stores(
        mut self,
        saved_queries: Arc<dyn SavedQueryStore>,
        transcripts: Arc<dyn TranscriptStore>,
    ) -> Self {
        self.saved_queries = saved_queries;
        self.transcripts = transcripts;
        self
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query_sql", post(handlers::execute_by_agent))
        .route("/api/query_sql/test", get(handlers::connection_test))
        .route("/api/query_sql/execute", post(handlers::rerun_saved_query))
        .route(
            "/api/query_sql/refresh",
            post(handlers::refresh_from_transcript),
        )
        .route("/api/query", get(legacy::query_get).post(legacy::query_post))
        .layer(cors)
        .with_state(state)
}

/// Binds and serves until the process exits.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// The JSON error envelope every failure path converges on.
#[derive(Debug)]
pub struct ApiError(pub QuerygateError);

impl From<QuerygateError> for ApiError {
    fn from(err: QuerygateError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(QuerygateError::input(format!(
            "invalid JSON body: {rejection}"
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            QuerygateError::Input(_) | QuerygateError::Validation(_) => StatusCode::BAD_REQUEST,
            QuerygateError::NotFound(_) => StatusCode::NOT_FOUND,
            QuerygateError::Connection(_)
            | QuerygateError::Execution(_)
            | QuerygateError::Config(_)
            | QuerygateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Pulls a required string field out of an optional body/query value,
/// failing with a 400 that names the field.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| QuerygateError::input(format!("{field} is required")))
}
