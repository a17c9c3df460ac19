//! Storage error model.

use thiserror::Error;

/// Failure inside a storage collaborator.
///
/// These are infrastructure failures. Expected business absences (no
/// mapping, no composition rows, no entry at a location) are encoded in
/// the operation return types, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Query execution failed.
    #[error("query failed during {operation}: {message}")]
    Query {
        operation: &'static str,
        message: String,
    },

    /// Could not obtain or keep a connection.
    #[error("connection unavailable: {0}")]
    Connection(String),

    /// A row did not match the shape the engine expects.
    #[error("malformed row during {operation}: {message}")]
    MalformedRow {
        operation: &'static str,
        message: String,
    },
}

impl StorageError {
    pub fn query(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Query {
            operation,
            message: message.into(),
        }
    }

    pub fn malformed(operation: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedRow {
            operation,
            message: message.into(),
        }
    }
}
