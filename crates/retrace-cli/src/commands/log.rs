// Log editing utilities: remove a record, compact the store

use std::path::PathBuf;

use retrace_core::OperationLog;

use super::Command;
use crate::error::CliResult;
use crate::output::OutputStyle;

/// Remove one record from the operation log
pub struct LogRmCommand {
    pub log_path: PathBuf,
    pub id: String,
}

impl LogRmCommand {
    pub fn new(log_path: PathBuf, id: String) -> Self {
        Self { log_path, id }
    }
}

#[async_trait::async_trait]
impl Command for LogRmCommand {
    async fn execute(&self) -> CliResult<()> {
        let log = OperationLog::new(&self.log_path);
        let removed = log.remove(&self.id).await?;
        let style = OutputStyle::default();
        println!("{}", style.success(&format!("Removed {}", removed)));
        Ok(())
    }
}

/// Rewrite the operation log in chronological order
pub struct LogCompactCommand {
    pub log_path: PathBuf,
}

impl LogCompactCommand {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }
}

#[async_trait::async_trait]
impl Command for LogCompactCommand {
    async fn execute(&self) -> CliResult<()> {
        let log = OperationLog::new(&self.log_path);
        let count = log.compact().await?;
        let style = OutputStyle::default();
        println!(
            "{}",
            style.success(&format!("Compacted {} record(s)", count))
        );
        Ok(())
    }
}
