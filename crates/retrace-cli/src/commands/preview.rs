// Show what an undo or redo would touch, without mutating anything

use std::path::PathBuf;

use retrace_core::{BackupDirection, OperationRef};

use super::{build_engine, Command};
use crate::error::CliResult;
use crate::output::OutputStyle;

/// Preview the cascade an undo or redo would process
pub struct PreviewCommand {
    pub log_path: PathBuf,
    pub backup_dir: PathBuf,
    pub target: String,
    pub redo: bool,
}

impl PreviewCommand {
    pub fn new(log_path: PathBuf, backup_dir: PathBuf, target: String, redo: bool) -> Self {
        Self {
            log_path,
            backup_dir,
            target,
            redo,
        }
    }
}

#[async_trait::async_trait]
impl Command for PreviewCommand {
    async fn execute(&self) -> CliResult<()> {
        let engine = build_engine(&self.log_path, &self.backup_dir);
        let direction = if self.redo {
            BackupDirection::Redo
        } else {
            BackupDirection::Undo
        };
        let target = OperationRef::parse(&self.target);
        let (target, cascade) = engine.preview(&target, direction).await?;

        let style = OutputStyle::default();
        let verb = if self.redo { "redo" } else { "undo" };
        println!("{}", style.header(&format!("Would {}:", verb)));
        println!("  {} [{}]", target, target.id);
        if cascade.is_empty() {
            println!("{}", style.info("No other operations are affected"));
        } else {
            println!(
                "{}",
                style.warning(&format!(
                    "Cascade includes {} other operation(s):",
                    cascade.len()
                ))
            );
            for op in &cascade {
                println!("  {} [{}]", op, op.id);
            }
        }
        Ok(())
    }
}
