#![warn(missing_docs)]

//! Filesystem change monitoring for retrace
//!
//! Watches a directory tree, diffs each settled change against a
//! per-file content cache, and appends the resulting operation records
//! to the shared operation log.

pub mod config;
pub mod error;
pub mod monitor;

// Re-export public API
pub use config::{MonitorConfig, DEFAULT_MAX_FILE_SIZE, DEFAULT_SETTLE_WINDOW};
pub use error::MonitorError;
pub use monitor::{ChangeMonitor, MonitorStats, MonitorStatus};
