//! Error types for the operation log and undo/redo engine

use std::path::PathBuf;

use thiserror::Error;

use crate::operation::UndoState;

/// Errors that can occur while recording or reversing operations
#[derive(Debug, Error)]
pub enum RetraceError {
    /// No operation store exists at the expected location
    #[error("No operation log found at {0}")]
    LogUnavailable(PathBuf),

    /// A persisted line could not be normalized into an operation
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Operation not found in the log
    #[error("Operation not found: {0}")]
    OperationNotFound(String),

    /// Index outside the addressable range of the filtered view
    #[error("Index {index} is out of range ({available} operations addressable)")]
    InvalidIndex { index: usize, available: usize },

    /// Undo requested on an undone operation, or redo on an active one
    #[error("Operation {id} is already {state}")]
    AlreadyInState { id: String, state: UndoState },

    /// Undo/redo needs a content payload the record does not carry
    #[error("Operation {id} is missing its `{field}` content")]
    MissingPayload { id: String, field: &'static str },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetraceError {
    /// Create a new OperationNotFound error with context
    pub fn operation_not_found(id: impl Into<String>) -> Self {
        Self::OperationNotFound(id.into())
    }

    /// Create a new MalformedRecord error with context
    pub fn malformed_record(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Create a new MissingPayload error for an operation field
    pub fn missing_payload(id: impl Into<String>, field: &'static str) -> Self {
        Self::MissingPayload {
            id: id.into(),
            field,
        }
    }
}
