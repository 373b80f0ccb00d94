//! Error types for treeql.

use thiserror::Error;

/// The main error type for treeql operations.
#[derive(Debug, Error)]
pub enum TreeqlError {
    /// A node was constructed with invalid arguments.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The AST uses a construct the emitter cannot translate.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The emitter reached a state the AST should have made impossible.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Two records being merged both carry the same key.
    #[error("Ambiguous record key: '{0}' is present on both sides of the merge")]
    AmbiguousKey(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TreeqlError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-supported error naming the offending construct.
    pub fn not_supported(construct: impl std::fmt::Display) -> Self {
        Self::NotSupported(construct.to_string())
    }

    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

/// Result type alias for treeql operations.
pub type TreeqlResult<T> = Result<T, TreeqlError>;

/// Reject blank identifiers.
pub(crate) fn require_identifier(value: &str, what: &str) -> TreeqlResult<()> {
    if value.trim().is_empty() {
        return Err(TreeqlError::validation(format!("{} must not be blank", what)));
    }
    Ok(())
}
