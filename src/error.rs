//! Error types for querygate.
//!
//! Defines the main error enum used throughout the application. The variants
//! map one-to-one onto the HTTP error taxonomy: `Validation` and `Input` are
//! client faults, `NotFound` is a lookup miss, everything else is a server
//! fault surfaced with the underlying message for diagnosability.

use thiserror::Error;

/// Main error type for querygate operations.
#[derive(Error, Debug)]
pub enum QuerygateError {
    /// Missing or malformed request fields.
    #[error("Invalid request: {0}")]
    Input(String),

    /// The query guard rejected the SQL before execution.
    #[error("Query rejected: {0}")]
    Validation(String),

    /// A referenced agent, saved query, or transcript part does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution errors reported by the database engine.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuerygateError {
    /// Creates an input error with the given message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a not-found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Input(_) => "Invalid Request",
            Self::Validation(_) => "Query Rejected",
            Self::NotFound(_) => "Not Found",
            Self::Connection(_) => "Connection Error",
            Self::Execution(_) => "Execution Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true for errors caused by the caller's request rather than
    /// by the server or the downstream database.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::Input(_) | Self::Validation(_) | Self::NotFound(_)
        )
    }
}

/// Result type alias using QuerygateError.
pub type Result<T> = std::result::Result<T, QuerygateError>;
