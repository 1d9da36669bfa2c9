//! Legacy fixed-credential endpoints.
//!
//! `GET|POST /api/query` run against the single environment-configured
//! database instead of per-agent storage. The MySQL variant reuses one
//! process-wide pool, created lazily and torn down on pool-level error so
//! the next call recreates it; the Postgres variant opens a per-call
//! connection like the tenant path.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use async_trait::async_trait;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::warn;

use super::handlers::execute_response;
use super::{required, ApiError, AppState};
use crate::config::ConnectionConfig;
use crate::db::{EngineAdapter, EngineKind, MysqlAdapter, Row};
use crate::error::{QuerygateError, Result};
use crate::query::{QueryPipeline, QueryRequest, DEFAULT_PREVIEW_LIMIT};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyParams {
    pub query: Option<String>,
    pub database: Option<String>,
    pub purpose: Option<String>,
    pub ai_limit: Option<i64>,
}

/// GET /api/query — legacy execution with parameters in the query string.
pub async fn query_get(
    State(state): State<AppState>,
    Query(params): Query<LegacyParams>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    run_legacy(&state, params).await
}

/// POST /api/query — legacy execution with a JSON body.
pub async fn query_post(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LegacyParams>, JsonRejection>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let Json(params) = payload?;
    run_legacy(&state, params).await
}

async fn run_legacy(
    state: &AppState,
    params: LegacyParams,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let config = state.config.legacy.clone().ok_or_else(|| {
        QuerygateError::config("no legacy database connection is configured")
    })?;

    let sql = required(params.query, "query")?;

    let request = QueryRequest::new(sql)
        .with_database(params.database)
        .with_purpose(params.purpose)
        .with_preview_limit(params.ai_limit.unwrap_or(DEFAULT_PREVIEW_LIMIT));

    let outcome = match config.engine {
        EngineKind::Mysql => {
            let adapter = SharedPoolAdapter { state };
            QueryPipeline::new(&adapter, &config).run(&request).await?
        }
        _ => {
            let adapter = state.engines.adapter(config.engine);
            QueryPipeline::new(adapter, &config).run(&request).await?
        }
    };

    Ok(Json(execute_response(&outcome)))
}

/// Adapter variant that runs on the process-wide legacy pool instead of
/// opening a fresh one per call.
struct SharedPoolAdapter<'a> {
    state: &'a AppState,
}

impl SharedPoolAdapter<'_> {
    /// Returns the shared pool, creating it on first use.
    async fn acquire_pool(&self, config: &ConnectionConfig) -> Result<MySqlPool> {
        let mut guard = self.state.legacy_pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let pool = MysqlAdapter::build_pool(config).await?;
        *guard = Some(pool.clone());
        Ok(pool)
    }

    /// Tears the shared pool down so the next call recreates it.
    async fn teardown_pool(&self) {
        let mut guard = self.state.legacy_pool.lock().await;
        if let Some(pool) = guard.take() {
            warn!("Tearing down legacy connection pool after pool-level error");
            pool.close().await;
        }
    }
}

#[async_trait]
impl EngineAdapter for SharedPoolAdapter<'_> {
    async fn execute(
        &self,
        config: &ConnectionConfig,
        sql: &str,
        database_override: Option<&str>,
    ) -> Result<Vec<Row>> {
        let pool = self.acquire_pool(config).await?;
        let result = MysqlAdapter::run_on_pool(&pool, config, sql, database_override).await;

        // Statement-level failures keep the pool; pool-level failures null
        // the handle so the next call starts from a fresh pool.
        if matches!(result, Err(QuerygateError::Connection(_))) {
            self.teardown_pool().await;
        }

        result
    }
}
