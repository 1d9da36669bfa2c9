//! MySQL engine adapter (Engine A).
//!
//! Pooled wire protocol: each `execute` call builds a fresh pool from the
//! tenant's credentials, acquires one connection, pins it to the effective
//! database with a `USE` directive, runs the statement, and closes the pool
//! before returning. The legacy fixed-credential path reuses
//! `build_pool`/`run_on_pool` against a process-wide pool instead.

use crate::config::ConnectionConfig;
use crate::db::{EngineAdapter, Row};
use crate::error::{QuerygateError, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use tracing::{debug, warn};

use super::convert;

/// MySQL adapter; stateless, all per-call state lives in the pool it opens.
#[derive(Debug, Default)]
pub struct MysqlAdapter;

impl MysqlAdapter {
    /// Builds connect options from the tenant configuration.
    fn connect_options(config: &ConnectionConfig) -> Result<MySqlConnectOptions> {
        let mut options = MySqlConnectOptions::new()
            .host(config.host.as_deref().unwrap_or("localhost"))
            .port(config.effective_port())
            .database(config.database_name()?);

        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        Ok(options)
    }

    /// Opens a fresh pool for this tenant. The caller owns the pool and is
    /// responsible for closing it.
    pub async fn build_pool(config: &ConnectionConfig) -> Result<MySqlPool> {
        let options = Self::connect_options(config)?;

        let connect = MySqlPoolOptions::new()
            .max_connections(config.max_pool_size)
            .acquire_timeout(config.request_timeout())
            .connect_with(options);

        match tokio::time::timeout(config.request_timeout(), connect).await {
            Ok(Ok(pool)) => {
                debug!("Connected to {}", config.display_string());
                Ok(pool)
            }
            Ok(Err(e)) => Err(map_connection_error(e, config)),
            Err(_) => Err(QuerygateError::connection(format!(
                "Connection to {} timed out after {}ms",
                config.server_string(),
                config.request_timeout_ms
            ))),
        }
    }

    /// Runs a single statement on an already-open pool, pinning the acquired
    /// connection to the effective database first.
    pub async fn run_on_pool(
        pool: &MySqlPool,
        config: &ConnectionConfig,
        sql: &str,
        database_override: Option<&str>,
    ) -> Result<Vec<Row>> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| map_connection_error(e, config))?;

        // The USE directive is session state that survives release back to
        // the pool: a previous holder of this connection may have switched
        // databases. Pin every acquisition, not just overridden ones, and on
        // the same connection the statement runs on.
        let database = effective_database(config, database_override)?;
        let directive = format!("USE `{}`", database.replace('`', ""));
        sqlx::query(&directive)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                QuerygateError::execution(format!(
                    "failed to switch to database '{database}': {}",
                    driver_message(&e)
                ))
            })?;

        let fetched = tokio::time::timeout(
            config.request_timeout(),
            sqlx::query(sql).fetch_all(&mut *conn),
        )
        .await
        .map_err(|_| {
            QuerygateError::execution(format!(
                "query timed out after {}ms",
                config.request_timeout_ms
            ))
        })?
        .map_err(|e| QuerygateError::execution(driver_message(&e)))?;

        Ok(fetched.iter().map(convert_row).collect())
    }
}

#[async_trait]
impl EngineAdapter for MysqlAdapter {
    async fn execute(
        &self,
        config: &ConnectionConfig,
        sql: &str,
        database_override: Option<&str>,
    ) -> Result<Vec<Row>> {
        let pool = Self::build_pool(config).await?;
        let result = Self::run_on_pool(&pool, config, sql, database_override).await;
        // Close on both branches; a close failure never masks the outcome.
        pool.close().await;
        if let Err(e) = &result {
            warn!("MySQL execution against {} failed: {e}", config.display_string());
        }
        result
    }
}

/// The database a statement must run against: the per-call override when
/// given, the configured default otherwise.
fn effective_database<'a>(
    config: &'a ConnectionConfig,
    database_override: Option<&'a str>,
) -> Result<&'a str> {
    match database_override {
        Some(database) => Ok(database),
        None => config.database_name(),
    }
}

/// Extracts the driver's own message verbatim when one exists.
fn driver_message(error: &sqlx::Error) -> String {
    error
        .as_database_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| error.to_string())
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
    } else if error_str.contains("access denied") || error_str.contains("authentication") {
        let user = config.user.as_deref().unwrap_or("unknown");
        QuerygateError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("unknown database") {
        let database = config.database.as_deref().unwrap_or("unknown");
        QuerygateError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        QuerygateError::connection(format!("Connection to {server} timed out."))
    } else {
        QuerygateError::connection(error.to_string())
    }
}

/// Converts a sqlx MySqlRow to a column-keyed JSON row.
fn convert_row(row: &MySqlRow) -> Row {
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
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> serde_json::Value {
    use serde_json::Value;

    match type_name.to_uppercase().as_str() {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),

        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),

        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| convert::number(v as f64))
            .unwrap_or(Value::Null),

        "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(convert::number)
            .unwrap_or(Value::Null),

        "DECIMAL" => row
            .try_get::<Option<sqlx::types::BigDecimal>, _>(index)
            .ok()
            .flatten()
            .map(convert::decimal)
            .unwrap_or(Value::Null),

        "DATE" => convert::stringify(row.try_get::<Option<chrono::NaiveDate>, _>(index)),
        "TIME" => convert::stringify(row.try_get::<Option<chrono::NaiveTime>, _>(index)),
        "DATETIME" => convert::stringify(row.try_get::<Option<chrono::NaiveDateTime>, _>(index)),
        "TIMESTAMP" => {
            convert::stringify(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index))
        }

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(convert::bytes)
            .unwrap_or(Value::Null),

        "JSON" => row
            .try_get::<Option<serde_json::Value>, _>(index)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),

        // Char, varchar, text, enum, set, and anything else we can read
        // as text.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::EngineKind;

    fn config_with(database: Option<&str>) -> ConnectionConfig {
        ConnectionConfig {
            engine: EngineKind::Mysql,
            host: Some("localhost".to_string()),
            database: database.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_connect_options_require_database() {
        let result = MysqlAdapter::connect_options(&config_with(None));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Database name"));
    }

    #[test]
    fn test_connect_options_use_engine_default_port() {
        let options = MysqlAdapter::connect_options(&config_with(Some("analytics"))).unwrap();
        // Port defaulting is resolved by the config, not left to the driver.
        let _ = options;
        assert_eq!(config_with(Some("analytics")).effective_port(), 3306);
    }

    #[test]
    fn test_effective_database_defaults_to_configured() {
        // Without an override the configured default still gets pinned, so
        // a pooled connection left on another database by a previous caller
        // cannot leak into this statement.
        let config = config_with(Some("warehouse"));
        assert_eq!(effective_database(&config, None).unwrap(), "warehouse");
    }

    #[test]
    fn test_effective_database_override_wins() {
        let config = config_with(Some("warehouse"));
        assert_eq!(
            effective_database(&config, Some("reporting")).unwrap(),
            "reporting"
        );
    }

    #[test]
    fn test_effective_database_requires_some_target() {
        let config = config_with(None);
        assert!(effective_database(&config, None).is_err());
        assert_eq!(
            effective_database(&config, Some("reporting")).unwrap(),
            "reporting"
        );
    }

    #[tokio::test]
    async fn test_execute_against_unreachable_host_is_connection_error() {
        let config = ConnectionConfig {
            engine: EngineKind::Mysql,
            host: Some("127.0.0.1".to_string()),
            // Nothing listens here; the error path must still close cleanly.
            port: Some(1),
            database: Some("nope".to_string()),
            request_timeout_ms: 1_000,
            ..Default::default()
        };

        let result = MysqlAdapter.execute(&config, "SELECT 1", None).await;
        assert!(matches!(
            result,
            Err(QuerygateError::Connection(_)) | Err(QuerygateError::Execution(_))
        ));
    }
}
