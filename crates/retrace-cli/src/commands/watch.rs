// Run a monitoring session until interrupted

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use retrace_core::OperationLog;
use retrace_monitor::{ChangeMonitor, MonitorConfig, MonitorStats};

use super::Command;
use crate::config::FileConfig;
use crate::error::CliResult;
use crate::output::OutputStyle;

/// Watch a directory tree and record every settled change
pub struct WatchCommand {
    pub log_path: PathBuf,
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub ignore: Vec<String>,
    pub extensions: Vec<String>,
    pub max_file_size: Option<u64>,
    pub settle_ms: Option<u64>,
    pub status_interval: Option<u64>,
}

impl WatchCommand {
    /// Merge defaults, config-file values, and flags (flags win)
    fn monitor_config(&self) -> CliResult<MonitorConfig> {
        let file = FileConfig::load(&self.config_path)?;
        let mut config = MonitorConfig::rooted(&self.root);

        if !self.ignore.is_empty() {
            config.ignore = self.ignore.clone();
        } else if let Some(ignore) = file.watch.ignore {
            config.ignore = ignore;
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        } else if let Some(extensions) = file.watch.extensions {
            config.extensions = extensions;
        }
        if let Some(size) = self.max_file_size.or(file.watch.max_file_size) {
            config.max_file_size = size;
        }
        if let Some(ms) = self.settle_ms.or(file.watch.settle_ms) {
            config.settle_window = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

#[async_trait::async_trait]
impl Command for WatchCommand {
    async fn execute(&self) -> CliResult<()> {
        let style = OutputStyle::default();
        let config = self.monitor_config()?;
        let log = Arc::new(OperationLog::new(&self.log_path));
        let mut monitor = ChangeMonitor::new(config, log)?;

        monitor.start().await?;
        let status = monitor.status()?;
        println!(
            "{}",
            style.info(&format!(
                "Watching {} ({} files tracked). Press Ctrl-C to stop.",
                status.config.root.display(),
                status.stats.files_watched
            ))
        );

        match self.status_interval {
            Some(secs) => {
                let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
                // The first tick fires immediately
                ticker.tick().await;
                loop {
                    tokio::select! {
                        result = tokio::signal::ctrl_c() => {
                            result?;
                            break;
                        }
                        _ = ticker.tick() => {
                            let status = monitor.status()?;
                            println!("{}", style.detail(&status_line(&status.stats)));
                        }
                    }
                }
            }
            None => tokio::signal::ctrl_c().await?,
        }

        let stats = monitor.stop().await?;
        println!();
        println!("{}", style.header("Session summary"));
        println!("  files tracked:     {}", stats.files_watched);
        println!("  operations logged: {}", stats.operations_logged);
        println!("  uptime:            {}s", stats.uptime().num_seconds());
        match stats.last_activity {
            Some(at) => println!("  last activity:     {}", at.format("%Y-%m-%d %H:%M:%S")),
            None => println!("  last activity:     none"),
        }
        println!("{}", style.success("Monitoring stopped"));
        Ok(())
    }
}

fn status_line(stats: &MonitorStats) -> String {
    format!(
        "[{}s] {} files tracked, {} operations logged",
        stats.uptime().num_seconds(),
        stats.files_watched,
        stats.operations_logged
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command_in(dir: &TempDir) -> WatchCommand {
        WatchCommand {
            log_path: dir.path().join(".retrace/operations.log"),
            root: dir.path().to_path_buf(),
            config_path: dir.path().join("retrace.toml"),
            ignore: Vec::new(),
            extensions: Vec::new(),
            max_file_size: None,
            settle_ms: None,
            status_interval: None,
        }
    }

    #[test]
    fn test_defaults_apply_without_config_file() {
        let dir = TempDir::new().unwrap();
        let config = command_in(&dir).monitor_config().unwrap();
        assert!(config.ignore.iter().any(|p| p.starts_with(".git")));
        assert!(config.extensions.is_empty());
    }

    #[test]
    fn test_config_file_values_fill_unset_flags() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("retrace.toml"),
            "[watch]\nextensions = [\"rs\"]\nsettle_ms = 100\n",
        )
        .unwrap();

        let config = command_in(&dir).monitor_config().unwrap();
        assert_eq!(config.extensions, vec!["rs".to_string()]);
        assert_eq!(config.settle_window, Duration::from_millis(100));
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("retrace.toml"),
            "[watch]\nextensions = [\"rs\"]\nmax_file_size = 64\n",
        )
        .unwrap();

        let mut command = command_in(&dir);
        command.extensions = vec!["md".to_string()];
        command.max_file_size = Some(4096);

        let config = command.monitor_config().unwrap();
        assert_eq!(config.extensions, vec!["md".to_string()]);
        assert_eq!(config.max_file_size, 4096);
    }
}
