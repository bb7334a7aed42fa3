// Optional retrace.toml configuration file

use std::path::Path;

use serde::Deserialize;

use crate::error::{CliError, CliResult};

/// Top-level shape of `retrace.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Defaults for `retrace watch`
    #[serde(default)]
    pub watch: WatchSettings,
}

/// Watch defaults loadable from the config file; flags override these
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchSettings {
    /// Glob patterns excluded from capture
    pub ignore: Option<Vec<String>>,
    /// File extensions to capture
    pub extensions: Option<Vec<String>>,
    /// Largest file size to diff, in bytes
    pub max_file_size: Option<u64>,
    /// Debounce window in milliseconds
    pub settle_ms: Option<u64>,
}

/// Where to look for `retrace.toml` when no `--config` flag is given:
/// the working directory first, then the user config directory
pub fn default_config_path() -> std::path::PathBuf {
    let local = std::path::PathBuf::from("retrace.toml");
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("retrace").join("retrace.toml"))
        .unwrap_or(local)
}

impl FileConfig {
    /// Load the config file; a missing file yields defaults
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FileConfig::default());
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }
}
