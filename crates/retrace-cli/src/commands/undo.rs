// Undo an operation and everything recorded after it

use std::path::PathBuf;

use retrace_core::OperationRef;

use super::{build_engine, print_report, Command};
use crate::error::CliResult;
use crate::output::OutputStyle;

/// Undo a recorded operation (with cascade)
pub struct UndoCommand {
    pub log_path: PathBuf,
    pub backup_dir: PathBuf,
    pub target: String,
}

impl UndoCommand {
    pub fn new(log_path: PathBuf, backup_dir: PathBuf, target: String) -> Self {
        Self {
            log_path,
            backup_dir,
            target,
        }
    }
}

#[async_trait::async_trait]
impl Command for UndoCommand {
    async fn execute(&self) -> CliResult<()> {
        let engine = build_engine(&self.log_path, &self.backup_dir);
        let target = OperationRef::parse(&self.target);
        let report = engine.undo(&target).await?;
        print_report(&OutputStyle::default(), "Undo", &report);
        Ok(())
    }
}
