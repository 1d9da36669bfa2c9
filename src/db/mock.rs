//! Mock engine adapter for testing.
//!
//! Returns canned rows (or a canned failure) and records every statement it
//! was asked to run, so dispatcher tests can assert both what executed and
//! what never reached the "database".

use super::{EngineAdapter, EngineKind, EngineRouter, Row};
use crate::config::ConnectionConfig;
use crate::error::{QuerygateError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// A recorded adapter call: the statement and the database override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub sql: String,
    pub database_override: Option<String>,
}

/// A mock adapter that serves fixture rows for every engine kind.
#[derive(Debug, Default)]
pub struct MockEngine {
    rows: Vec<Row>,
    failure: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockEngine {
    /// Creates a mock returning no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock returning the given fixture rows.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Creates a mock whose every call fails with an execution error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Returns the calls recorded so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }
}

#[async_trait]
impl EngineAdapter for MockEngine {
    async fn execute(
        &self,
        _config: &ConnectionConfig,
        sql: &str,
        database_override: Option<&str>,
    ) -> Result<Vec<Row>> {
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push(RecordedCall {
                sql: sql.to_string(),
                database_override: database_override.map(String::from),
            });

        match &self.failure {
            Some(message) => Err(QuerygateError::execution(message.clone())),
            None => Ok(self.rows.clone()),
        }
    }
}

/// Routes every engine kind to the same mock adapter.
impl EngineRouter for MockEngine {
    fn adapter(&self, _kind: EngineKind) -> &dyn EngineAdapter {
        self
    }
}

/// Builds a JSON fixture row from key/value pairs.
pub fn fixture_row(pairs: &[(&str, serde_json::Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_returns_fixture_rows() {
        let mock = MockEngine::with_rows(vec![fixture_row(&[("n", json!(1))])]);
        let rows = mock
            .execute(&ConnectionConfig::default(), "SELECT 1", None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["n"], json!(1));
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = MockEngine::new();
        mock.execute(&ConnectionConfig::default(), "SELECT 1", Some("other"))
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sql, "SELECT 1");
        assert_eq!(calls[0].database_override.as_deref(), Some("other"));
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockEngine::failing("boom");
        let result = mock
            .execute(&ConnectionConfig::default(), "SELECT 1", None)
            .await;
        assert!(matches!(result, Err(QuerygateError::Execution(_))));
    }
}
