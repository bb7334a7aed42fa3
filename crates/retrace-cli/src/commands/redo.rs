// Redo an undone operation and everything undone after it

use std::path::PathBuf;

use retrace_core::OperationRef;

use super::{build_engine, print_report, Command};
use crate::error::CliResult;
use crate::output::OutputStyle;

/// Redo an undone operation (with cascade)
pub struct RedoCommand {
    pub log_path: PathBuf,
    pub backup_dir: PathBuf,
    pub target: String,
}

impl RedoCommand {
    pub fn new(log_path: PathBuf, backup_dir: PathBuf, target: String) -> Self {
        Self {
            log_path,
            backup_dir,
            target,
        }
    }
}

#[async_trait::async_trait]
impl Command for RedoCommand {
    async fn execute(&self) -> CliResult<()> {
        let engine = build_engine(&self.log_path, &self.backup_dir);
        let target = OperationRef::parse(&self.target);
        let report = engine.redo(&target).await?;
        print_report(&OutputStyle::default(), "Redo", &report);
        Ok(())
    }
}
