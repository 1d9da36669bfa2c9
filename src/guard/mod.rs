//! Query guard: static vetting of LLM-generated SQL.
//!
//! Decides, from the SQL text alone, whether a statement is a safe read-only
//! query before any network call reaches a tenant database. The guard never
//! modifies the statement: the stripped working copy exists only for
//! classification, and the original text, verbatim, is what gets executed.

mod classifier;

pub use classifier::{strip_comments, validate};

use std::fmt;

/// The coarse category of a SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Grant,
    Revoke,
    Merge,
    Explain,
    Show,
    /// Statement type could not be determined.
    Unknown,
}

impl StatementKind {
    /// Returns the lowercase kind name used in responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Drop => "drop",
            Self::Truncate => "truncate",
            Self::Alter => "alter",
            Self::Create => "create",
            Self::Grant => "grant",
            Self::Revoke => "revoke",
            Self::Merge => "merge",
            Self::Explain => "explain",
            Self::Show => "show",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Result of vetting a SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the statement may be executed.
    pub is_valid: bool,
    /// Why the statement was rejected, phrased for the caller's LLM loop.
    pub rejection_reason: Option<String>,
    /// The classified statement kind, when one could be identified.
    pub statement_kind: Option<StatementKind>,
}

impl Verdict {
    /// Creates a passing verdict for an identified read query.
    pub fn allowed(kind: StatementKind) -> Self {
        Self {
            is_valid: true,
            rejection_reason: None,
            statement_kind: Some(kind),
        }
    }

    /// Creates a rejection with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            rejection_reason: Some(reason.into()),
            statement_kind: None,
        }
    }

    /// Creates a rejection that also reports the offending statement kind.
    pub fn rejected_kind(kind: StatementKind, reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            rejection_reason: Some(reason.into()),
            statement_kind: Some(kind),
        }
    }
}
