//! Database abstraction layer for querygate.
//!
//! Provides a trait-based adapter interface so the two supported wire
//! protocols (MySQL and PostgreSQL) sit behind one call site, selected by
//! the tenant's stored engine kind rather than by scattered conditionals.
//!
//! Adapters are one-shot: each call opens its own pool or connection from
//! the tenant's credentials, runs the statement unmodified, and closes what
//! it opened on both the success and error branches. The true, un-paginated
//! row set is always returned; preview truncation happens downstream in the
//! result shaper.

mod convert;
mod mock;
mod mysql;
mod postgres;

pub use mock::{fixture_row, MockEngine, RecordedCall};
pub use mysql::MysqlAdapter;
pub use postgres::PostgresAdapter;

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// A result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Supported database wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Pooled engine supporting a live `USE` database-switch directive.
    Mysql,
    /// Per-call connection engine; the connect call itself targets the
    /// right database.
    #[default]
    Postgres,
}

impl EngineKind {
    /// Returns the engine as a string for persistence and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    /// Parses an engine kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::Mysql),
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }

    /// Returns the default port for this engine.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Mysql => 3306,
            Self::Postgres => 5432,
        }
    }
}

/// One-shot statement execution against a tenant database.
///
/// `database_override` selects a different database than the configured
/// default for this single call only; it never mutates stored configuration.
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Runs a single statement and returns all rows.
    async fn execute(
        &self,
        config: &ConnectionConfig,
        sql: &str,
        database_override: Option<&str>,
    ) -> Result<Vec<Row>>;

    /// Connection smoke test: runs a trivial known-safe statement.
    async fn ping(&self, config: &ConnectionConfig) -> Result<()> {
        self.execute(config, "SELECT 1", None).await.map(|_| ())
    }
}

/// Selects the concrete adapter for an engine kind.
pub trait EngineRouter: Send + Sync {
    fn adapter(&self, kind: EngineKind) -> &dyn EngineAdapter;
}

/// The production adapter set backed by sqlx drivers.
#[derive(Debug, Default)]
pub struct SqlxEngines {
    mysql: MysqlAdapter,
    postgres: PostgresAdapter,
}

impl SqlxEngines {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EngineRouter for SqlxEngines {
    fn adapter(&self, kind: EngineKind) -> &dyn EngineAdapter {
        match kind {
            EngineKind::Mysql => &self.mysql,
            EngineKind::Postgres => &self.postgres,
        }
    }
}
