// List recorded operations

use std::path::PathBuf;

use retrace_core::{Operation, OperationLog, UndoState};

use super::Command;
use crate::error::CliResult;
use crate::output::OutputStyle;

/// List the operation log in chronological order
pub struct HistoryCommand {
    pub log_path: PathBuf,
    pub limit: Option<usize>,
}

impl HistoryCommand {
    pub fn new(log_path: PathBuf, limit: Option<usize>) -> Self {
        Self { log_path, limit }
    }
}

#[async_trait::async_trait]
impl Command for HistoryCommand {
    async fn execute(&self) -> CliResult<()> {
        let log = OperationLog::new(&self.log_path);
        let mut operations = log.load_or_empty().await?;
        operations.sort_by_key(Operation::order_key);

        let style = OutputStyle::default();
        if operations.is_empty() {
            println!("{}", style.info("No operations recorded yet"));
            return Ok(());
        }

        let total = operations.len();
        let shown: Vec<&Operation> = match self.limit {
            // Most recent records when truncating
            Some(limit) => operations.iter().skip(total.saturating_sub(limit)).collect(),
            None => operations.iter().collect(),
        };

        println!(
            "{}",
            style.header(&format!("{} of {} operation(s)", shown.len(), total))
        );
        for op in shown {
            let line = format!("{} [{}]", op, op.id);
            match op.undo_state {
                UndoState::Active => println!("  {}", line),
                UndoState::Undone => println!("  {}", style.detail(&line)),
            }
        }
        Ok(())
    }
}
