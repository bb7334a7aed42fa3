//! Cascading undo/redo over the operation log
//!
//! Undoing a target also reverses every active operation recorded after
//! it (newest first), since later operations depend on the target's
//! effect. Redoing mirrors that: every undone operation recorded before
//! the target is replayed first (oldest first) so the target reapplies
//! onto the state it originally saw. Each step snapshots the file it is
//! about to rewrite, and a failed step never aborts the rest of the
//! cascade: the caller gets the full list of per-step outcomes instead.

use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, warn};

use crate::backup::{BackupDirection, BackupStore};
use crate::error::RetraceError;
use crate::log::OperationLog;
use crate::operation::{EditMode, Operation, OperationKind, UndoState};

/// How a target operation is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRef {
    /// By unique operation id
    Id(String),
    /// 1-based position in the filtered chronological view
    /// (active-only for undo, undone-only for redo)
    Index(usize),
}

impl OperationRef {
    /// Parse a CLI-style reference: digits address by position,
    /// anything else is an id
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<usize>() {
            Ok(index) => OperationRef::Index(index),
            Err(_) => OperationRef::Id(raw.to_string()),
        }
    }
}

/// Outcome of one applied step inside a cascade
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The operation this step processed (state as it was before the call)
    pub operation: Operation,
    /// Backup written before the apply, if one was taken
    pub backup: Option<std::path::PathBuf>,
    /// Whether the filesystem effect was applied
    pub applied: bool,
    /// Non-fatal warning, e.g. a command execution that cannot be reversed
    pub warning: Option<String>,
    /// Step failure cause; the cascade continued past it
    pub error: Option<String>,
}

/// Result of a cascade: the target, the operations swept up with it,
/// and every per-step outcome in apply order
#[derive(Debug, Clone)]
pub struct CascadeReport {
    /// The operation the caller named
    pub target: Operation,
    /// Operations swept up with the target, in cascade order
    pub cascade: Vec<Operation>,
    /// Per-step outcomes in the order they were applied
    pub steps: Vec<StepOutcome>,
}

impl CascadeReport {
    /// True when every step applied cleanly
    pub fn fully_applied(&self) -> bool {
        self.steps.iter().all(|step| step.error.is_none())
    }
}

/// Resolves targets, applies reverse/forward content, and transitions
/// operation states
pub struct UndoRedoEngine {
    log: Arc<OperationLog>,
    backups: BackupStore,
}

impl UndoRedoEngine {
    /// Create an engine over a shared log and a backup store
    pub fn new(log: Arc<OperationLog>, backups: BackupStore) -> Self {
        UndoRedoEngine { log, backups }
    }

    /// Undo the target and every active operation recorded after it
    pub async fn undo(&self, target: &OperationRef) -> Result<CascadeReport, RetraceError> {
        let operations = self.log.load().await?;
        let target = Self::resolve(&operations, target, UndoState::Active)?;
        let cascade = Self::cascade_after(&operations, &target);

        // Cascade newest-first, target last
        let plan: Vec<&Operation> = cascade.iter().chain(std::iter::once(&target)).collect();
        Self::require_payloads(&plan, UndoState::Active)?;

        let mut steps = Vec::with_capacity(plan.len());
        for op in &plan {
            let step = self.apply_step(op, BackupDirection::Undo).await;
            if let Some(cause) = &step.error {
                warn!("Undo step for {} failed: {}", op.id, cause);
            }
            // State flips regardless of apply success
            self.log.update_state(&op.id, UndoState::Undone).await?;
            steps.push(step);
        }

        Ok(CascadeReport {
            target,
            cascade,
            steps,
        })
    }

    /// Redo the target, first replaying every undone operation recorded
    /// before it
    pub async fn redo(&self, target: &OperationRef) -> Result<CascadeReport, RetraceError> {
        let operations = self.log.load().await?;
        let target = Self::resolve(&operations, target, UndoState::Undone)?;
        let cascade = Self::cascade_before(&operations, &target);

        // Oldest first, target last
        let plan: Vec<&Operation> = cascade.iter().chain(std::iter::once(&target)).collect();
        Self::require_payloads(&plan, UndoState::Undone)?;

        let mut steps = Vec::with_capacity(plan.len());
        for op in &plan {
            let step = self.apply_step(op, BackupDirection::Redo).await;
            if let Some(cause) = &step.error {
                warn!("Redo step for {} failed: {}", op.id, cause);
            }
            self.log.update_state(&op.id, UndoState::Active).await?;
            steps.push(step);
        }

        Ok(CascadeReport {
            target,
            cascade,
            steps,
        })
    }

    /// Resolve a target and compute its cascade without touching disk
    pub async fn preview(
        &self,
        target: &OperationRef,
        direction: BackupDirection,
    ) -> Result<(Operation, Vec<Operation>), RetraceError> {
        let operations = self.log.load().await?;
        match direction {
            BackupDirection::Undo => {
                let target = Self::resolve(&operations, target, UndoState::Active)?;
                let cascade = Self::cascade_after(&operations, &target);
                Ok((target, cascade))
            }
            BackupDirection::Redo => {
                let target = Self::resolve(&operations, target, UndoState::Undone)?;
                let cascade = Self::cascade_before(&operations, &target);
                Ok((target, cascade))
            }
        }
    }

    /// Find the target by id or by position in the filtered
    /// chronological view; the target must currently be in `want`
    fn resolve(
        operations: &[Operation],
        target: &OperationRef,
        want: UndoState,
    ) -> Result<Operation, RetraceError> {
        match target {
            OperationRef::Id(id) => {
                let op = operations
                    .iter()
                    .find(|op| &op.id == id)
                    .ok_or_else(|| RetraceError::operation_not_found(id.clone()))?;
                if op.undo_state != want {
                    return Err(RetraceError::AlreadyInState {
                        id: op.id.clone(),
                        state: op.undo_state,
                    });
                }
                Ok(op.clone())
            }
            OperationRef::Index(index) => {
                let mut view: Vec<&Operation> = operations
                    .iter()
                    .filter(|op| op.undo_state == want)
                    .collect();
                view.sort_by_key(|op| op.order_key());
                if *index == 0 || *index > view.len() {
                    return Err(RetraceError::InvalidIndex {
                        index: *index,
                        available: view.len(),
                    });
                }
                Ok(view[*index - 1].clone())
            }
        }
    }

    /// Active operations strictly after the target, newest first
    fn cascade_after(operations: &[Operation], target: &Operation) -> Vec<Operation> {
        let mut cascade: Vec<Operation> = operations
            .iter()
            .filter(|op| {
                op.undo_state == UndoState::Active
                    && op.id != target.id
                    && op.order_key() > target.order_key()
            })
            .cloned()
            .collect();
        cascade.sort_by_key(Operation::order_key);
        cascade.reverse();
        cascade
    }

    /// Undone operations strictly before the target, oldest first
    fn cascade_before(operations: &[Operation], target: &Operation) -> Vec<Operation> {
        let mut cascade: Vec<Operation> = operations
            .iter()
            .filter(|op| {
                op.undo_state == UndoState::Undone
                    && op.id != target.id
                    && op.order_key() < target.order_key()
            })
            .cloned()
            .collect();
        cascade.sort_by_key(Operation::order_key);
        cascade
    }

    /// Reject the whole cascade before any mutation when a required
    /// content payload is absent
    fn require_payloads(plan: &[&Operation], current: UndoState) -> Result<(), RetraceError> {
        for op in plan {
            match (&op.kind, current) {
                // Undo needs the prior content
                (OperationKind::FileEdit { mode, .. }, UndoState::Active) => {
                    if let EditMode::FullContent { before: None, .. } = mode {
                        return Err(RetraceError::missing_payload(op.id.clone(), "before"));
                    }
                }
                (OperationKind::FileDelete { before: None, .. }, UndoState::Active) => {
                    return Err(RetraceError::missing_payload(op.id.clone(), "before"));
                }
                // Redo needs the resulting content
                (OperationKind::FileEdit { mode, .. }, UndoState::Undone) => {
                    if let EditMode::FullContent { after: None, .. } = mode {
                        return Err(RetraceError::missing_payload(op.id.clone(), "after"));
                    }
                }
                (OperationKind::FileCreate { after: None, .. }, UndoState::Undone) => {
                    return Err(RetraceError::missing_payload(op.id.clone(), "after"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Snapshot and apply one step; never returns an error, failures are
    /// captured in the outcome
    async fn apply_step(&self, op: &Operation, direction: BackupDirection) -> StepOutcome {
        let mut outcome = StepOutcome {
            operation: op.clone(),
            backup: None,
            applied: false,
            warning: None,
            error: None,
        };

        if let OperationKind::CommandExecution { command } = &op.kind {
            outcome.warning = Some(format!(
                "Command execution `{}` cannot be physically reversed; only its state changes",
                command
            ));
            return outcome;
        }

        // Backup the file as it is right now, before rewriting it
        if let Some(file) = op.file() {
            match fs::read_to_string(file).await {
                Ok(current) => match self.backups.snapshot(&op.id, direction, &current).await {
                    Ok(path) => outcome.backup = path,
                    Err(e) => {
                        outcome.error = Some(format!("backup failed: {}", e));
                        return outcome;
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("No current content to back up for {}", file.display());
                }
                Err(e) => {
                    outcome.error = Some(format!("backup read failed: {}", e));
                    return outcome;
                }
            }
        }

        let result = match direction {
            BackupDirection::Undo => self.apply_inverse(op).await,
            BackupDirection::Redo => self.apply_forward(op).await,
        };
        match result {
            Ok(()) => outcome.applied = true,
            Err(e) => outcome.error = Some(e.to_string()),
        }
        outcome
    }

    /// Apply the inverse effect of an operation to the filesystem
    async fn apply_inverse(&self, op: &Operation) -> Result<(), RetraceError> {
        match &op.kind {
            OperationKind::FileCreate { file, .. } => Self::delete_file(file).await,
            OperationKind::FileDelete { file, before } => {
                let content = before
                    .as_deref()
                    .ok_or_else(|| RetraceError::missing_payload(op.id.clone(), "before"))?;
                Self::write_file(file, content).await
            }
            OperationKind::FileEdit { file, mode } => match mode {
                EditMode::FullContent { before, .. } => {
                    let content = before
                        .as_deref()
                        .ok_or_else(|| RetraceError::missing_payload(op.id.clone(), "before"))?;
                    Self::write_file(file, content).await
                }
                EditMode::StringReplace {
                    old_string,
                    new_string,
                    ..
                } => Self::replace_first(file, new_string, old_string).await,
            },
            OperationKind::CommandExecution { .. } => Ok(()),
        }
    }

    /// Apply the forward effect of an operation to the filesystem
    async fn apply_forward(&self, op: &Operation) -> Result<(), RetraceError> {
        match &op.kind {
            OperationKind::FileCreate { file, after } => {
                let content = after
                    .as_deref()
                    .ok_or_else(|| RetraceError::missing_payload(op.id.clone(), "after"))?;
                Self::write_file(file, content).await
            }
            OperationKind::FileDelete { file, .. } => Self::delete_file(file).await,
            OperationKind::FileEdit { file, mode } => match mode {
                EditMode::FullContent { after, .. } => {
                    let content = after
                        .as_deref()
                        .ok_or_else(|| RetraceError::missing_payload(op.id.clone(), "after"))?;
                    Self::write_file(file, content).await
                }
                EditMode::StringReplace {
                    old_string,
                    new_string,
                    ..
                } => Self::replace_first(file, old_string, new_string).await,
            },
            OperationKind::CommandExecution { .. } => Ok(()),
        }
    }

    async fn write_file(file: &Path, content: &str) -> Result<(), RetraceError> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(file, content).await?;
        Ok(())
    }

    async fn delete_file(file: &Path) -> Result<(), RetraceError> {
        match fs::remove_file(file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the first occurrence of `needle` in the file with
    /// `replacement`
    async fn replace_first(
        file: &Path,
        needle: &str,
        replacement: &str,
    ) -> Result<(), RetraceError> {
        let current = fs::read_to_string(file).await?;
        if needle.is_empty() {
            // Pure insertion reversed: nothing to anchor on, prepend
            let mut updated = replacement.to_string();
            updated.push_str(&current);
            return Self::write_file(file, &updated).await;
        }
        if !current.contains(needle) {
            return Err(RetraceError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("pattern not found in {}", file.display()),
            )));
        }
        let updated = current.replacen(needle, replacement, 1);
        Self::write_file(file, &updated).await
    }
}
