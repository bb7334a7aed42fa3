//! Error types for change monitoring

use thiserror::Error;

use retrace_core::RetraceError;

/// Errors that can occur while monitoring a directory tree
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Start requested while a watch session is already running
    #[error("Monitoring is already active")]
    AlreadyActive,

    /// Stop or status requested without a running watch session
    #[error("Monitoring is not active")]
    NotActive,

    /// Filesystem watcher error
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// An ignore pattern could not be compiled
    #[error("Invalid ignore pattern: {0}")]
    InvalidPattern(#[from] globset::Error),

    /// A shared state lock was poisoned
    #[error("Lock error: {0}")]
    Lock(String),

    /// Operation log or diff failure
    #[error(transparent)]
    Core(#[from] RetraceError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Create a new Lock error with context
    pub fn lock(msg: impl Into<String>) -> Self {
        Self::Lock(msg.into())
    }
}
