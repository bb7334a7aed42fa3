// Command handlers for the retrace CLI

pub mod history;
pub mod log;
pub mod preview;
pub mod redo;
pub mod undo;
pub mod watch;

pub use history::HistoryCommand;
pub use log::{LogCompactCommand, LogRmCommand};
pub use preview::PreviewCommand;
pub use redo::RedoCommand;
pub use undo::UndoCommand;
pub use watch::WatchCommand;

use std::path::Path;
use std::sync::Arc;

use retrace_core::{BackupStore, CascadeReport, OperationLog, UndoRedoEngine};

use crate::error::CliResult;
use crate::output::OutputStyle;

/// Trait for command handlers
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    /// Execute the command
    async fn execute(&self) -> CliResult<()>;
}

/// Build the engine over the store paths given on the command line
pub(crate) fn build_engine(log_path: &Path, backup_dir: &Path) -> UndoRedoEngine {
    let log = Arc::new(OperationLog::new(log_path));
    UndoRedoEngine::new(log, BackupStore::new(backup_dir))
}

/// Print a cascade report: one line per step, then a summary
pub(crate) fn print_report(style: &OutputStyle, verb: &str, report: &CascadeReport) {
    if !report.cascade.is_empty() {
        println!(
            "{}",
            style.info(&format!(
                "Cascading over {} related operation(s)",
                report.cascade.len()
            ))
        );
    }
    let mut failures = 0usize;
    for step in &report.steps {
        let line = format!("{} [{}]", step.operation, step.operation.id);
        if let Some(cause) = &step.error {
            failures += 1;
            println!("{}", style.error(&format!("{} — {}", line, cause)));
        } else if let Some(warning) = &step.warning {
            println!("{}", style.warning(&format!("{} — {}", line, warning)));
        } else {
            println!("{}", style.success(&line));
        }
        if let Some(backup) = &step.backup {
            println!(
                "{}",
                style.detail(&format!("  backup: {}", backup.display()))
            );
        }
    }
    if failures == 0 {
        println!(
            "{}",
            style.success(&format!("{} complete ({} operation(s))", verb, report.steps.len()))
        );
    } else {
        println!(
            "{}",
            style.warning(&format!(
                "{} finished with {} failed step(s); states were still updated",
                verb, failures
            ))
        );
    }
}
