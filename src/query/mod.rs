//! The guard → execute → shape pipeline and its request/outcome types.
//!
//! Every HTTP entry point converges here, so the semantics of validation,
//! execution, and preview truncation are defined exactly once.

mod executor;
mod shaper;

pub use executor::QueryPipeline;
pub use shaper::{shape, ColumnDescriptor, ShapedResult};

use crate::db::Row;
use crate::guard::StatementKind;

/// Default number of preview rows exposed to the AI context.
pub const DEFAULT_PREVIEW_LIMIT: i64 = 50;

/// Sentinel preview limit meaning "no truncation".
pub const UNBOUNDED_PREVIEW: i64 = -1;

/// One ad-hoc query invocation, created fresh per HTTP call.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// The SQL text, executed verbatim once vetted.
    pub sql: String,
    /// Per-call database override; never mutates stored configuration.
    pub database: Option<String>,
    /// Free-form caller note, echoed back in the response.
    pub purpose: Option<String>,
    /// Preview cap; `UNBOUNDED_PREVIEW` disables truncation.
    pub preview_limit: i64,
}

impl QueryRequest {
    /// Creates a request with the default preview limit.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            database: None,
            purpose: None,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }

    /// Sets the per-call database override.
    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database;
        self
    }

    /// Sets the purpose note.
    pub fn with_purpose(mut self, purpose: Option<String>) -> Self {
        self.purpose = purpose;
        self
    }

    /// Sets the preview limit.
    pub fn with_preview_limit(mut self, preview_limit: i64) -> Self {
        self.preview_limit = preview_limit;
        self
    }
}

/// The assembled result of one pipeline run, serialized straight into the
/// HTTP response and never persisted by this crate.
#[derive(Debug)]
pub struct QueryOutcome {
    /// Bounded preview rows, in engine order.
    pub rows: Vec<Row>,
    /// True cardinality of the full result set.
    pub total_row_count: usize,
    /// Rows actually included in the preview.
    pub returned_row_count: usize,
    /// Whether the preview dropped rows.
    pub was_truncated: bool,
    /// Lightweight column schema inferred from the preview.
    pub inferred_schema: Option<Vec<ColumnDescriptor>>,
    /// Statement execution time in milliseconds.
    pub execution_time_ms: u64,
    /// End-to-end pipeline time in milliseconds.
    pub total_time_ms: u64,
    /// The original, unmodified SQL text, so the caller can re-run it.
    pub sql: String,
    /// The database the statement actually ran against.
    pub database: String,
    /// Caller's purpose note, echoed back.
    pub purpose: Option<String>,
    /// The guard's statement-kind classification.
    pub statement_kind: StatementKind,
    /// The preview limit that was applied.
    pub preview_limit: i64,
}
