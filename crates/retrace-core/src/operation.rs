//! Operation records and log-line normalization
//!
//! An [`Operation`] is one recorded, reversible file or command mutation.
//! On disk each operation is a flat JSON object on its own line; loading
//! goes through [`RawRecord`] so that legacy lines with missing fields are
//! normalized exactly once, at read time.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RetraceError;

/// Whether an operation is currently applied or reversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndoState {
    /// The operation's effect is present on disk
    Active,
    /// The operation has been reversed
    Undone,
}

impl fmt::Display for UndoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndoState::Active => write!(f, "active"),
            UndoState::Undone => write!(f, "undone"),
        }
    }
}

/// Coarse label for what kind of code a change touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeCategory {
    /// Import or include statements
    Import,
    /// Function, type, or class declarations
    Declaration,
    /// Assignments and bindings
    Assignment,
    /// Comment-only content
    Comment,
    /// Anything else
    General,
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeCategory::Import => write!(f, "import"),
            ChangeCategory::Declaration => write!(f, "declaration"),
            ChangeCategory::Assignment => write!(f, "assignment"),
            ChangeCategory::Comment => write!(f, "comment"),
            ChangeCategory::General => write!(f, "general"),
        }
    }
}

/// Diff-engine metadata attached to automatically captured operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// Heuristic confidence that this edit is meaningful (0.0..=1.0)
    pub confidence: f64,
    /// Coarse change category
    pub category: ChangeCategory,
    /// Surrounding context lines, when captured
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

/// How a file edit stores its content payload
///
/// The `Option` payloads exist only because legacy log lines may omit
/// them; absence surfaces as `MissingPayload` at apply time and nowhere
/// else.
#[derive(Debug, Clone, PartialEq)]
pub enum EditMode {
    /// Full before/after text of the file
    FullContent {
        before: Option<String>,
        after: Option<String>,
    },
    /// A single substring replacement at a known line
    StringReplace {
        old_string: String,
        new_string: String,
        line_number: Option<usize>,
    },
}

/// The mutation an operation records, one variant per record shape
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    /// A file was created with the given content
    FileCreate {
        file: PathBuf,
        after: Option<String>,
    },
    /// A file's content changed
    FileEdit { file: PathBuf, mode: EditMode },
    /// A file was deleted; `before` holds its last content
    FileDelete {
        file: PathBuf,
        before: Option<String>,
    },
    /// A shell command ran; tracked but not physically reversible
    CommandExecution { command: String },
}

impl OperationKind {
    /// The file this operation touches, if any
    pub fn file(&self) -> Option<&Path> {
        match self {
            OperationKind::FileCreate { file, .. }
            | OperationKind::FileEdit { file, .. }
            | OperationKind::FileDelete { file, .. } => Some(file),
            OperationKind::CommandExecution { .. } => None,
        }
    }

    /// Stable type tag used in the log-line format
    pub fn type_name(&self) -> &'static str {
        match self {
            OperationKind::FileCreate { .. } => "file_create",
            OperationKind::FileEdit { .. } => "file_edit",
            OperationKind::FileDelete { .. } => "file_delete",
            OperationKind::CommandExecution { .. } => "command_execution",
        }
    }
}

/// One recorded mutation in the operation log
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Unique identifier
    pub id: String,
    /// Monotonic insertion sequence assigned by the log on append;
    /// canonical tiebreaker for equal timestamps
    pub seq: u64,
    /// When the operation was recorded
    pub timestamp: DateTime<Utc>,
    /// Current undo state
    pub undo_state: UndoState,
    /// What was mutated and how
    pub kind: OperationKind,
    /// Optional diff-engine metadata
    pub metadata: Option<OperationMetadata>,
}

impl Operation {
    /// Create a new active operation with a fresh id and timestamp
    pub fn new(kind: OperationKind) -> Self {
        Operation {
            id: Uuid::new_v4().to_string(),
            seq: 0,
            timestamp: Utc::now(),
            undo_state: UndoState::Active,
            kind,
            metadata: None,
        }
    }

    /// Attach diff-engine metadata
    pub fn with_metadata(mut self, metadata: OperationMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The file this operation touches, if any
    pub fn file(&self) -> Option<&Path> {
        self.kind.file()
    }

    /// Chronological ordering key: timestamp first, insertion sequence
    /// breaking ties
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.timestamp, self.seq)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject = match &self.kind {
            OperationKind::CommandExecution { command } => command.clone(),
            kind => kind
                .file()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        };
        write!(
            f,
            "[{}] {} {} ({})",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.kind.type_name(),
            subject,
            self.undo_state
        )
    }
}

/// Flat on-disk shape of one log line, every field optional
///
/// This is the only type deserialized from storage; [`RawRecord::normalize`]
/// turns it into the canonical [`Operation`] so downstream code never
/// branches on field absence.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct RawRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub op_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_state: Option<UndoState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OperationMetadata>,
}

impl RawRecord {
    /// Normalize a raw line into the canonical operation form
    ///
    /// Missing `undo_state` defaults to active; a file edit without an
    /// explicit `mode` is treated as full-content. Lines without a usable
    /// type, file, or timestamp are malformed and rejected.
    pub fn normalize(self) -> Result<Operation, RetraceError> {
        let op_type = self
            .op_type
            .ok_or_else(|| RetraceError::malformed_record("missing `type` field"))?;

        let kind = match op_type.as_str() {
            "file_create" => OperationKind::FileCreate {
                file: self
                    .file
                    .ok_or_else(|| RetraceError::malformed_record("file_create without `file`"))?,
                after: self.after,
            },
            "file_delete" => OperationKind::FileDelete {
                file: self
                    .file
                    .ok_or_else(|| RetraceError::malformed_record("file_delete without `file`"))?,
                before: self.before,
            },
            "file_edit" => {
                let file = self
                    .file
                    .ok_or_else(|| RetraceError::malformed_record("file_edit without `file`"))?;
                let is_replace = matches!(self.mode.as_deref(), Some("string_replace"))
                    || (self.mode.is_none()
                        && (self.old_string.is_some() || self.new_string.is_some()));
                let mode = if is_replace {
                    EditMode::StringReplace {
                        old_string: self.old_string.unwrap_or_default(),
                        new_string: self.new_string.unwrap_or_default(),
                        line_number: self.line_number,
                    }
                } else {
                    EditMode::FullContent {
                        before: self.before,
                        after: self.after,
                    }
                };
                OperationKind::FileEdit { file, mode }
            }
            "command_execution" => OperationKind::CommandExecution {
                command: self.command.ok_or_else(|| {
                    RetraceError::malformed_record("command_execution without `command`")
                })?,
            },
            other => {
                return Err(RetraceError::malformed_record(format!(
                    "unknown operation type `{}`",
                    other
                )))
            }
        };

        Ok(Operation {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            seq: self.seq.unwrap_or(0),
            timestamp: self
                .timestamp
                .ok_or_else(|| RetraceError::malformed_record("missing `timestamp` field"))?,
            undo_state: self.undo_state.unwrap_or(UndoState::Active),
            kind,
            metadata: self.metadata,
        })
    }
}

impl From<&Operation> for RawRecord {
    fn from(op: &Operation) -> Self {
        let mut raw = RawRecord {
            id: Some(op.id.clone()),
            seq: Some(op.seq),
            timestamp: Some(op.timestamp),
            op_type: Some(op.kind.type_name().to_string()),
            undo_state: Some(op.undo_state),
            metadata: op.metadata.clone(),
            ..RawRecord::default()
        };
        match &op.kind {
            OperationKind::FileCreate { file, after } => {
                raw.file = Some(file.clone());
                raw.after = after.clone();
            }
            OperationKind::FileDelete { file, before } => {
                raw.file = Some(file.clone());
                raw.before = before.clone();
            }
            OperationKind::FileEdit { file, mode } => {
                raw.file = Some(file.clone());
                match mode {
                    EditMode::FullContent { before, after } => {
                        raw.mode = Some("full_content".to_string());
                        raw.before = before.clone();
                        raw.after = after.clone();
                    }
                    EditMode::StringReplace {
                        old_string,
                        new_string,
                        line_number,
                    } => {
                        raw.mode = Some("string_replace".to_string());
                        raw.old_string = Some(old_string.clone());
                        raw.new_string = Some(new_string.clone());
                        raw.line_number = *line_number;
                    }
                }
            }
            OperationKind::CommandExecution { command } => {
                raw.command = Some(command.clone());
            }
        }
        raw
    }
}
