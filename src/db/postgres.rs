//! PostgreSQL engine adapter (Engine B).
//!
//! Per-call connection protocol: each `execute` opens a single connection
//! whose connect options already target the right database (so no live
//! database-switch directive exists or is needed), runs the statement, and
//! closes the connection on both the success and error branches. A close
//! failure is logged and never masks the statement's outcome.

use crate::config::ConnectionConfig;
use crate::db::{EngineAdapter, Row};
use crate::error::{QuerygateError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{Column as SqlxColumn, Connection, PgConnection, Row as SqlxRow, TypeInfo};
use tracing::{debug, warn};

use super::convert;

/// PostgreSQL adapter; stateless, each call owns its own connection.
#[derive(Debug, Default)]
pub struct PostgresAdapter;

impl PostgresAdapter {
    /// Builds connect options, applying the per-call database override
    /// directly in the connect parameters.
    fn connect_options(
        config: &ConnectionConfig,
        database_override: Option<&str>,
    ) -> Result<PgConnectOptions> {
        let database = match database_override {
            Some(database) => database,
            None => config.database_name()?,
        };

        let mut options = PgConnectOptions::new()
            .host(config.host.as_deref().unwrap_or("localhost"))
            .port(config.effective_port())
            .database(database);

        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        Ok(options)
    }

    async fn open_connection(
        config: &ConnectionConfig,
        database_override: Option<&str>,
    ) -> Result<PgConnection> {
        let options = Self::connect_options(config, database_override)?;

        match tokio::time::timeout(config.request_timeout(), PgConnection::connect_with(&options))
            .await
        {
            Ok(Ok(conn)) => {
                debug!("Connected to {}", config.display_string());
                Ok(conn)
            }
            Ok(Err(e)) => Err(map_connection_error(e, config)),
            Err(_) => Err(QuerygateError::connection(format!(
                "Connection to {} timed out after {}ms",
                config.server_string(),
                config.request_timeout_ms
            ))),
        }
    }
}

#[async_trait]
impl EngineAdapter for PostgresAdapter {
    async fn execute(
        &self,
        config: &ConnectionConfig,
        sql: &str,
        database_override: Option<&str>,
    ) -> Result<Vec<Row>> {
        let mut conn = Self::open_connection(config, database_override).await?;

        let fetched = tokio::time::timeout(
            config.request_timeout(),
            sqlx::query(sql).fetch_all(&mut conn),
        )
        .await
        .map_err(|_| {
            QuerygateError::execution(format!(
                "query timed out after {}ms",
                config.request_timeout_ms
            ))
        })
        .and_then(|r| r.map_err(|e| QuerygateError::execution(format_query_error(e))));

        // Guaranteed-cleanup path: the connection closes whether or not the
        // statement succeeded.
        if let Err(e) = conn.close().await {
            warn!("Failed to close connection to {}: {e}", config.display_string());
        }

        let rows = fetched?;
        Ok(rows.iter().map(convert_row).collect())
    }
}

/// Maps sqlx connection errors to messages that name the failing endpoint
/// without leaking credentials.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> QuerygateError {
    let error_str = error.to_string().to_lowercase();
    let server = config.server_string();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        QuerygateError::connection(format!(
            "Cannot connect to {server}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        let user = config.user.as_deref().unwrap_or("unknown");
        QuerygateError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        let database = config.database.as_deref().unwrap_or("unknown");
        QuerygateError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        QuerygateError::connection("Server requires SSL for this connection.".to_string())
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        QuerygateError::connection(format!("Connection to {server} timed out."))
    } else {
        QuerygateError::connection(error.to_string())
    }
}

/// Formats an execution error, surfacing the driver's message verbatim plus
/// Postgres DETAIL/HINT fields when available.
fn format_query_error(error: sqlx::Error) -> String {
    if let Some(db_error) = error.as_database_error() {
        let mut result = db_error.message().to_string();

        if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
            if let Some(detail) = pg_error.detail() {
                result.push_str("\n  DETAIL: ");
                result.push_str(detail);
            }
            if let Some(hint) = pg_error.hint() {
                result.push_str("\n  HINT: ");
                result.push_str(hint);
            }
        }

        result
    } else {
        error.to_string()
    }
}

/// Converts a sqlx PgRow to a column-keyed JSON row.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            (
                col.name().to_string(),
                convert_value(row, i, col.type_info().name()),
            )
        })
        .collect()
}

/// Converts a single column value to JSON based on the driver type name.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> serde_json::Value {
    use serde_json::Value;

    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(i64::from(v).into()))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(i64::from(v).into()))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| convert::number(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(convert::number)
            .unwrap_or(Value::Null),

        "NUMERIC" | "DECIMAL" => row
            .try_get::<Option<sqlx::types::BigDecimal>, _>(index)
            .ok()
            .flatten()
            .map(convert::decimal)
            .unwrap_or(Value::Null),

        "DATE" => convert::stringify(row.try_get::<Option<chrono::NaiveDate>, _>(index)),
        "TIME" => convert::stringify(row.try_get::<Option<chrono::NaiveTime>, _>(index)),
        "TIMESTAMP" => convert::stringify(row.try_get::<Option<chrono::NaiveDateTime>, _>(index)),
        "TIMESTAMPTZ" => {
            convert::stringify(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index))
        }

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(convert::bytes)
            .unwrap_or(Value::Null),

        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),

        // For all other types, try to read as text.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
