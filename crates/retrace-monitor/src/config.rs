//! Monitoring session configuration

use std::path::PathBuf;
use std::time::Duration;

/// Largest file the monitor will read and diff, in bytes
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Quiet period after the last event before pending changes are processed
pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_millis(500);

/// Configuration for one monitoring session
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Directory tree to watch
    pub root: PathBuf,
    /// Glob patterns (relative to root) excluded from capture
    pub ignore: Vec<String>,
    /// File extensions to capture; empty means all files
    pub extensions: Vec<String>,
    /// Files larger than this are skipped
    pub max_file_size: u64,
    /// Debounce window applied to bursts of events
    pub settle_window: Duration,
}

impl MonitorConfig {
    /// Configuration rooted at the given directory with default filters
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        MonitorConfig {
            root: root.into(),
            ..Default::default()
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            root: PathBuf::from("."),
            ignore: vec![
                ".git/**".to_string(),
                ".retrace/**".to_string(),
                "target/**".to_string(),
                "node_modules/**".to_string(),
            ],
            extensions: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            settle_window: DEFAULT_SETTLE_WINDOW,
        }
    }
}
