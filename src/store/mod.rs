//! Collaborator seams for externally-owned storage.
//!
//! The gateway reads three things it does not own: per-agent database
//! credentials, favourited ("saved") queries, and chat transcripts that may
//! embed a SQL tool call. Each is a trait so the HTTP layer stays testable
//! without the real backing services, and so this crate never takes a
//! dependency on their schemas.

mod memory;

pub use memory::MemoryStore;

use crate::config::{AppConfig, ConnectionConfig};
use crate::error::{QuerygateError, Result};
use async_trait::async_trait;

/// Transcript part kind that marks a SQL read tool invocation.
pub const SQL_READ_PART_KIND: &str = "sql-query";

/// A favourited query: SQL plus metadata persisted by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedQuery {
    pub sql: String,
    pub database: Option<String>,
    pub purpose: Option<String>,
}

/// One tool-call part of a chat transcript message.
#[derive(Debug, Clone)]
pub struct TranscriptPart {
    /// Part kind; only `SQL_READ_PART_KIND` parts carry a runnable query.
    pub kind: String,
    /// The recorded tool input.
    pub input: serde_json::Value,
    /// The recorded tool output.
    pub output: serde_json::Value,
}

impl TranscriptPart {
    /// Returns true when this part records a SQL read.
    pub fn is_sql_read(&self) -> bool {
        self.kind == SQL_READ_PART_KIND
    }

    /// Extracts the SQL text and database hint from the recorded input,
    /// falling back to the recorded output.
    pub fn extract_query(&self) -> Option<(String, Option<String>)> {
        let sql = string_field(&self.input, "query").or_else(|| string_field(&self.output, "query"))?;
        let database =
            string_field(&self.input, "database").or_else(|| string_field(&self.output, "database"));
        Some((sql, database))
    }
}

fn string_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(String::from)
}

/// Locates the SQL read in a message's parts.
///
/// An explicit `part_index` is honored exactly, with a not-found error
/// naming the valid range when it is negative, out of bounds, or does not
/// record a SQL read; otherwise the first SQL-read part wins.
pub fn locate_sql_part(
    parts: &[TranscriptPart],
    part_index: Option<i64>,
) -> Result<(String, Option<String>)> {
    match part_index {
        Some(index) => {
            let bounded = usize::try_from(index).ok().filter(|i| *i < parts.len());
            let Some(index) = bounded else {
                if parts.is_empty() {
                    return Err(QuerygateError::not_found(format!(
                        "part index {index} is out of range; the message has no parts"
                    )));
                }
                return Err(QuerygateError::not_found(format!(
                    "part index {index} is out of range; valid range is 0..{}",
                    parts.len() - 1
                )));
            };
            let part = &parts[index];
            if !part.is_sql_read() {
                return Err(QuerygateError::not_found(format!(
                    "part {index} is not a SQL query part (kind '{}')",
                    part.kind
                )));
            }
            part.extract_query().ok_or_else(|| {
                QuerygateError::not_found(format!("part {index} records no SQL text"))
            })
        }
        None => parts
            .iter()
            .filter(|p| p.is_sql_read())
            .find_map(|p| p.extract_query())
            .ok_or_else(|| {
                QuerygateError::not_found("no SQL query found in the message's tool calls")
            }),
    }
}

/// Per-agent database configuration lookup.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Returns the agent's database connection config, if one exists.
    async fn database_config(&self, agent_id: &str) -> Result<Option<ConnectionConfig>>;
}

/// The config file doubles as the agent-credential collaborator.
#[async_trait]
impl AgentStore for AppConfig {
    async fn database_config(&self, agent_id: &str) -> Result<Option<ConnectionConfig>> {
        Ok(self.get_agent(agent_id).cloned())
    }
}

/// Favourited-query lookup, keyed by the chat message it was saved from.
#[async_trait]
pub trait SavedQueryStore: Send + Sync {
    async fn find_by_message(&self, chat_message_id: &str) -> Result<Option<SavedQuery>>;
}

/// Chat transcript lookup.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Returns the tool-call parts of a message, or `None` when the message
    /// itself does not exist.
    async fn message_parts(&self, chat_message_id: &str) -> Result<Option<Vec<TranscriptPart>>>;
}
