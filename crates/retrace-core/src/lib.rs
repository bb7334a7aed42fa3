#![warn(missing_docs)]

//! Core operation log and undo/redo engine for retrace
//!
//! Records file mutations as an append-only operation log, diffs content
//! transitions into significant edit records, snapshots files before each
//! destructive apply, and reverses or replays recorded operations with
//! cascade semantics.

pub mod backup;
pub mod diff;
pub mod engine;
pub mod error;
pub mod log;
pub mod operation;

// Re-export public API
pub use backup::{BackupDirection, BackupStore};
pub use diff::DiffEngine;
pub use engine::{CascadeReport, OperationRef, StepOutcome, UndoRedoEngine};
pub use error::RetraceError;
pub use log::OperationLog;
pub use operation::{
    ChangeCategory, EditMode, Operation, OperationKind, OperationMetadata, RawRecord, UndoState,
};
