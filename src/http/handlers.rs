//! Multi-tenant route handlers.
//!
//! All four request shapes resolve the agent's stored connection config,
//! then converge on the same guard → execute → shape pipeline; they differ
//! only in where the SQL text comes from and in the preview limit applied.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::{required, ApiError, AppState};
use crate::config::ConnectionConfig;
use crate::error::{QuerygateError, Result};
use crate::query::{QueryOutcome, QueryPipeline, QueryRequest, UNBOUNDED_PREVIEW};
use crate::store::locate_sql_part;

/// Resolves an agent's connection config, 404ing when none exists.
async fn resolve_agent(state: &AppState, agent_id: &str) -> Result<ConnectionConfig> {
    state
        .agents
        .database_config(agent_id)
        .await?
        .ok_or_else(|| {
            QuerygateError::not_found(format!(
                "no database configuration found for agent '{agent_id}'"
            ))
        })
}

/// Runs the shared pipeline against the agent's configured engine.
async fn run_pipeline(
    state: &AppState,
    config: &ConnectionConfig,
    request: &QueryRequest,
) -> Result<QueryOutcome> {
    let adapter = state.engines.adapter(config.engine);
    QueryPipeline::new(adapter, config).run(request).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteBody {
    pub agent_id: Option<String>,
    pub query: Option<String>,
    pub database: Option<String>,
    pub purpose: Option<String>,
    pub ai_limit: Option<i64>,
}

/// POST /api/query_sql — direct execution of caller-supplied SQL.
pub async fn execute_by_agent(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ExecuteBody>, JsonRejection>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = payload?;
    let agent_id = required(body.agent_id, "agentId")?;
    let sql = required(body.query, "query")?;

    let config = resolve_agent(&state, &agent_id).await?;

    let request = QueryRequest::new(sql)
        .with_database(body.database)
        .with_purpose(body.purpose)
        .with_preview_limit(body.ai_limit.unwrap_or(crate::query::DEFAULT_PREVIEW_LIMIT));

    let outcome = run_pipeline(&state, &config, &request).await?;
    Ok(Json(execute_response(&outcome)))
}

/// The response shape shared by the direct-execute and legacy endpoints.
pub(super) fn execute_response(outcome: &QueryOutcome) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "results": outcome.rows,
        "totalCount": outcome.total_row_count,
        "returnedCount": outcome.returned_row_count,
        "queryResultStructure": outcome.inferred_schema,
        "executionTime": outcome.execution_time_ms,
        "totalTime": outcome.total_time_ms,
        "database": outcome.database,
        "query": outcome.sql,
        "purpose": outcome.purpose,
        "queryType": outcome.statement_kind.as_str(),
        "aiLimitApplied": outcome.preview_limit,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestParams {
    pub agent_id: Option<String>,
}

/// GET /api/query_sql/test — connection smoke test.
///
/// Runs a fixed, known-safe statement through the right adapter without
/// going through the query guard.
pub async fn connection_test(
    State(state): State<AppState>,
    Query(params): Query<TestParams>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let agent_id = required(params.agent_id, "agentId")?;
    let config = resolve_agent(&state, &agent_id).await?;

    state.engines.adapter(config.engine).ping(&config).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Connection successful",
        "config": {
            "type": config.engine.as_str(),
            "server": config.server_string(),
            "database": config.database,
        },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerunBody {
    pub chat_message_id: Option<String>,
    pub agent_id: Option<String>,
}

/// POST /api/query_sql/execute — re-run a favourited query, unbounded.
pub async fn rerun_saved_query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RerunBody>, JsonRejection>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = payload?;
    let chat_message_id = required(body.chat_message_id, "chatMessageId")?;
    let agent_id = required(body.agent_id, "agentId")?;

    let config = resolve_agent(&state, &agent_id).await?;

    let saved = state
        .saved_queries
        .find_by_message(&chat_message_id)
        .await?
        .ok_or_else(|| {
            QuerygateError::not_found(format!(
                "no saved query found for message '{chat_message_id}'"
            ))
        })?;

    let request = QueryRequest::new(saved.sql)
        .with_database(saved.database)
        .with_purpose(saved.purpose)
        .with_preview_limit(UNBOUNDED_PREVIEW);

    let outcome = run_pipeline(&state, &config, &request).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "results": outcome.rows,
        "rowCount": outcome.returned_row_count,
        "executionTime": outcome.execution_time_ms,
        "truncated": outcome.was_truncated,
        "database": outcome.database,
        "query": outcome.sql,
        "purpose": outcome.purpose,
        "executedAt": chrono::Utc::now().to_rfc3339(),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    pub chat_message_id: Option<String>,
    pub agent_id: Option<String>,
    pub part_index: Option<i64>,
}

/// POST /api/query_sql/refresh — re-run a query embedded in a transcript.
///
/// The favourites store is checked first; only when the message was never
/// favourited does the transcript scan run.
pub async fn refresh_from_transcript(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RefreshBody>, JsonRejection>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = payload?;
    let chat_message_id = required(body.chat_message_id, "chatMessageId")?;
    let agent_id = required(body.agent_id, "agentId")?;

    let config = resolve_agent(&state, &agent_id).await?;

    let (sql, database) = match state
        .saved_queries
        .find_by_message(&chat_message_id)
        .await?
    {
        Some(saved) => (saved.sql, saved.database),
        None => {
            let parts = state
                .transcripts
                .message_parts(&chat_message_id)
                .await?
                .ok_or_else(|| {
                    QuerygateError::not_found(format!(
                        "no chat message found with id '{chat_message_id}'"
                    ))
                })?;

            locate_sql_part(&parts, body.part_index)?
        }
    };

    let request = QueryRequest::new(sql)
        .with_database(database)
        .with_preview_limit(UNBOUNDED_PREVIEW);

    let outcome = run_pipeline(&state, &config, &request).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "results": outcome.rows,
        "rowCount": outcome.returned_row_count,
        "executionTime": outcome.execution_time_ms,
        "truncated": outcome.was_truncated,
        "refreshedAt": chrono::Utc::now().to_rfc3339(),
    })))
}
