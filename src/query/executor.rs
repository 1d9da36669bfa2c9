//! The query pipeline: guard, execute, shape.
//!
//! A pipeline borrows an adapter and a tenant connection config for the
//! duration of one request; it holds no state of its own and provides no
//! ordering between concurrent runs.

use std::time::Instant;

use crate::config::ConnectionConfig;
use crate::db::EngineAdapter;
use crate::error::{QuerygateError, Result};
use crate::guard::{self, StatementKind};
use crate::query::{shape, QueryOutcome, QueryRequest};
use tracing::debug;

/// One-request pipeline over a specific adapter and tenant config.
pub struct QueryPipeline<'a> {
    adapter: &'a dyn EngineAdapter,
    config: &'a ConnectionConfig,
}

impl<'a> QueryPipeline<'a> {
    /// Creates a pipeline for one request.
    pub fn new(adapter: &'a dyn EngineAdapter, config: &'a ConnectionConfig) -> Self {
        Self { adapter, config }
    }

    /// Vets the SQL, executes it verbatim, and shapes the result.
    ///
    /// Guard rejections surface as `Validation` errors (client fault) and
    /// never reach the adapter; adapter failures surface as
    /// `Connection`/`Execution` errors (server fault). Nothing is retried.
    pub async fn run(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let total_start = Instant::now();

        let verdict = guard::validate(&request.sql);
        if !verdict.is_valid {
            let reason = verdict
                .rejection_reason
                .unwrap_or_else(|| "query rejected".to_string());
            return Err(QuerygateError::validation(reason));
        }
        let statement_kind = verdict.statement_kind.unwrap_or(StatementKind::Select);

        debug!(
            "Executing against {}: {} preview_limit={}",
            self.config.display_string(),
            request.sql,
            request.preview_limit
        );

        let execution_start = Instant::now();
        let rows = self
            .adapter
            .execute(self.config, &request.sql, request.database.as_deref())
            .await?;
        let execution_time_ms = execution_start.elapsed().as_millis() as u64;

        let shaped = shape(rows, request.preview_limit);

        let database = request
            .database
            .clone()
            .or_else(|| self.config.database.clone())
            .unwrap_or_default();

        Ok(QueryOutcome {
            rows: shaped.preview_rows,
            total_row_count: shaped.total_row_count,
            returned_row_count: shaped.returned_row_count,
            was_truncated: shaped.was_truncated,
            inferred_schema: shaped.inferred_schema,
            execution_time_ms,
            total_time_ms: total_start.elapsed().as_millis() as u64,
            sql: request.sql.clone(),
            database,
            purpose: request.purpose.clone(),
            statement_kind,
            preview_limit: request.preview_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixture_row, EngineKind, MockEngine};
    use crate::query::{DEFAULT_PREVIEW_LIMIT, UNBOUNDED_PREVIEW};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tenant_config() -> ConnectionConfig {
        ConnectionConfig {
            engine: EngineKind::Postgres,
            host: Some("localhost".to_string()),
            database: Some("tenant_one".to_string()),
            ..Default::default()
        }
    }

    fn numbered_rows(n: usize) -> Vec<crate::db::Row> {
        (0..n).map(|i| fixture_row(&[("id", json!(i))])).collect()
    }

    #[tokio::test]
    async fn test_safe_select_executes_verbatim() {
        let mock = MockEngine::with_rows(numbered_rows(3));
        let config = tenant_config();
        let pipeline = QueryPipeline::new(&mock, &config);

        let sql = "SELECT id FROM orders -- latest";
        let outcome = pipeline.run(&QueryRequest::new(sql)).await.unwrap();

        assert_eq!(outcome.sql, sql);
        assert_eq!(outcome.total_row_count, 3);
        assert_eq!(outcome.statement_kind, StatementKind::Select);
        assert_eq!(outcome.database, "tenant_one");
        assert_eq!(outcome.preview_limit, DEFAULT_PREVIEW_LIMIT);

        // The executed text is the original, comments and all.
        let calls = mock.calls();
        assert_eq!(calls[0].sql, sql);
    }

    #[tokio::test]
    async fn test_rejected_query_never_reaches_adapter() {
        let mock = MockEngine::with_rows(numbered_rows(3));
        let config = tenant_config();
        let pipeline = QueryPipeline::new(&mock, &config);

        let result = pipeline.run(&QueryRequest::new("DROP TABLE users")).await;

        match result {
            Err(QuerygateError::Validation(reason)) => {
                assert!(reason.to_lowercase().contains("drop"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_truncation_round_trip() {
        let mock = MockEngine::with_rows(numbered_rows(25));
        let config = tenant_config();
        let pipeline = QueryPipeline::new(&mock, &config);

        let outcome = pipeline
            .run(&QueryRequest::new("SELECT id FROM t").with_preview_limit(10))
            .await
            .unwrap();

        assert_eq!(outcome.total_row_count, 25);
        assert_eq!(outcome.returned_row_count, 10);
        assert!(outcome.was_truncated);

        let outcome = pipeline
            .run(&QueryRequest::new("SELECT id FROM t").with_preview_limit(UNBOUNDED_PREVIEW))
            .await
            .unwrap();

        assert_eq!(outcome.returned_row_count, 25);
        assert!(!outcome.was_truncated);
    }

    #[tokio::test]
    async fn test_database_override_is_passed_through_and_reported() {
        let mock = MockEngine::with_rows(numbered_rows(1));
        let config = tenant_config();
        let pipeline = QueryPipeline::new(&mock, &config);

        let outcome = pipeline
            .run(
                &QueryRequest::new("SELECT 1")
                    .with_database(Some("reporting".to_string())),
            )
            .await
            .unwrap();

        assert_eq!(outcome.database, "reporting");
        assert_eq!(
            mock.calls()[0].database_override.as_deref(),
            Some("reporting")
        );
    }

    #[tokio::test]
    async fn test_execution_error_propagates() {
        let mock = MockEngine::failing("relation \"t\" does not exist");
        let config = tenant_config();
        let pipeline = QueryPipeline::new(&mock, &config);

        let result = pipeline.run(&QueryRequest::new("SELECT * FROM t")).await;
        match result {
            Err(QuerygateError::Execution(message)) => {
                assert!(message.contains("does not exist"));
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_idempotent_rerun_returns_identical_rows() {
        let mock = MockEngine::with_rows(numbered_rows(5));
        let config = tenant_config();
        let pipeline = QueryPipeline::new(&mock, &config);
        let request = QueryRequest::new("SELECT id FROM t ORDER BY id");

        let first = pipeline.run(&request).await.unwrap();
        let second = pipeline.run(&request).await.unwrap();

        assert_eq!(first.returned_row_count, second.returned_row_count);
        assert_eq!(first.rows, second.rows);
    }
}
