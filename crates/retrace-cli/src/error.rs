// CLI-specific error handling

use thiserror::Error;

use retrace_core::RetraceError;
use retrace_monitor::MonitorError;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] RetraceError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!(
                    "Invalid argument: {}\n\nRun 'retrace help' for usage information.",
                    message
                )
            }
            CliError::Config(msg) => {
                format!("Configuration error: {}\n\nCheck your retrace.toml.", msg)
            }
            CliError::Core(RetraceError::LogUnavailable(path)) => {
                format!(
                    "No operation log found at {}.\n\nRun 'retrace watch' to start recording operations.",
                    path.display()
                )
            }
            CliError::Core(RetraceError::OperationNotFound(id)) => {
                format!(
                    "Operation '{}' not found.\n\nRun 'retrace history' to list recorded operations.",
                    id
                )
            }
            CliError::Core(RetraceError::InvalidIndex { index, available }) => {
                format!(
                    "Index {} is out of range: {} operations are addressable.\n\nRun 'retrace history' to see what can be targeted.",
                    index, available
                )
            }
            CliError::Core(e) => e.to_string(),
            CliError::Monitor(e) => e.to_string(),
            CliError::Io(e) => format!("File operation failed: {}", e),
        }
    }

    /// Get technical details for verbose mode
    pub fn technical_details(&self) -> String {
        format!("{:?}", self)
    }
}

pub type CliResult<T> = Result<T, CliError>;
