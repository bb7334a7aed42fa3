//! Append-only JSONL operation store
//!
//! One operation per line. All mutating access goes through a single
//! async mutex so concurrent writers (monitor capture, undo/redo state
//! updates, log editing) cannot interleave their read-transform-write
//! cycles.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::RetraceError;
use crate::operation::{Operation, RawRecord, UndoState};

#[derive(Debug, Default)]
struct WriterState {
    /// Next insertion sequence number, lazily initialized from the store
    next_seq: Option<u64>,
}

/// Append-only persisted sequence of operation records
#[derive(Debug)]
pub struct OperationLog {
    path: PathBuf,
    writer: Mutex<WriterState>,
}

impl OperationLog {
    /// Create a log handle backed by the given store path
    ///
    /// The store file is created on first append, not here.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        OperationLog {
            path: path.into(),
            writer: Mutex::new(WriterState::default()),
        }
    }

    /// Path of the backing store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all parseable records in storage order
    ///
    /// Malformed lines are skipped with a diagnostic, never fatal.
    /// Fails with `LogUnavailable` when no store file exists.
    pub async fn load(&self) -> Result<Vec<Operation>, RetraceError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RetraceError::LogUnavailable(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::parse_lines(&content))
    }

    /// Like [`load`](Self::load) but treats a missing store as empty
    pub async fn load_or_empty(&self) -> Result<Vec<Operation>, RetraceError> {
        match self.load().await {
            Ok(ops) => Ok(ops),
            Err(RetraceError::LogUnavailable(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn parse_lines(content: &str) -> Vec<Operation> {
        let mut operations = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<RawRecord>(line)
                .map_err(RetraceError::from)
                .and_then(RawRecord::normalize);
            match parsed {
                Ok(op) => operations.push(op),
                Err(e) => {
                    warn!("Skipping malformed record at line {}: {}", line_no + 1, e);
                }
            }
        }
        operations
    }

    /// Append one record, assigning id, timestamp, and the next sequence
    /// number where absent
    ///
    /// Returns the record as persisted.
    pub async fn append(&self, mut op: Operation) -> Result<Operation, RetraceError> {
        let mut state = self.writer.lock().await;

        let next_seq = match state.next_seq {
            Some(seq) => seq,
            None => {
                let existing = self.load_or_empty().await?;
                existing.iter().map(|op| op.seq).max().map_or(1, |s| s + 1)
            }
        };
        if op.id.is_empty() {
            op.id = uuid::Uuid::new_v4().to_string();
        }
        op.seq = next_seq;
        state.next_seq = Some(next_seq + 1);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(&RawRecord::from(&op))?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Appended operation {} (seq {})", op.id, op.seq);
        Ok(op)
    }

    /// Rewrite the store with one record's undo state changed
    pub async fn update_state(
        &self,
        id: &str,
        state: UndoState,
    ) -> Result<Operation, RetraceError> {
        let _guard = self.writer.lock().await;

        let mut operations = self.load().await?;
        let target = operations
            .iter_mut()
            .find(|op| op.id == id)
            .ok_or_else(|| RetraceError::operation_not_found(id))?;
        target.undo_state = state;
        let updated = target.clone();

        self.rewrite(&operations).await?;
        debug!("Operation {} is now {}", id, state);
        Ok(updated)
    }

    /// Rewrite the store omitting one record
    pub async fn remove(&self, id: &str) -> Result<Operation, RetraceError> {
        let _guard = self.writer.lock().await;

        let operations = self.load().await?;
        let removed = operations
            .iter()
            .find(|op| op.id == id)
            .cloned()
            .ok_or_else(|| RetraceError::operation_not_found(id))?;
        let remaining: Vec<Operation> =
            operations.into_iter().filter(|op| op.id != id).collect();

        self.rewrite(&remaining).await?;
        Ok(removed)
    }

    /// Rewrite all records sorted chronologically; returns the record count
    pub async fn compact(&self) -> Result<usize, RetraceError> {
        let _guard = self.writer.lock().await;

        let mut operations = self.load().await?;
        operations.sort_by_key(Operation::order_key);
        self.rewrite(&operations).await?;
        Ok(operations.len())
    }

    /// Replace the store contents atomically (write temp file, rename)
    async fn rewrite(&self, operations: &[Operation]) -> Result<(), RetraceError> {
        let mut content = String::new();
        for op in operations {
            content.push_str(&serde_json::to_string(&RawRecord::from(op))?);
            content.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("log.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationKind;
    use tempfile::TempDir;

    fn log_in(dir: &TempDir) -> OperationLog {
        OperationLog::new(dir.path().join("operations.log"))
    }

    fn create_op(file: &str, after: &str) -> Operation {
        Operation::new(OperationKind::FileCreate {
            file: PathBuf::from(file),
            after: Some(after.to_string()),
        })
    }

    #[tokio::test]
    async fn test_load_missing_store_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        assert!(matches!(
            log.load().await,
            Err(RetraceError::LogUnavailable(_))
        ));
        assert!(log.load_or_empty().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_assigns_monotonic_seq() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        let first = log.append(create_op("a.txt", "a")).await.unwrap();
        let second = log.append(create_op("b.txt", "b")).await.unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);

        let loaded = log.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, first.id);
        assert_eq!(loaded[1].id, second.id);
    }

    #[tokio::test]
    async fn test_append_resumes_seq_from_existing_store() {
        let dir = TempDir::new().unwrap();
        {
            let log = log_in(&dir);
            log.append(create_op("a.txt", "a")).await.unwrap();
            log.append(create_op("b.txt", "b")).await.unwrap();
        }
        // Fresh handle over the same file
        let log = log_in(&dir);
        let third = log.append(create_op("c.txt", "c")).await.unwrap();
        assert_eq!(third.seq, 3);
    }

    #[tokio::test]
    async fn test_load_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        let op = log.append(create_op("a.txt", "hello")).await.unwrap();

        // Corrupt the store with garbage and a record missing its type
        let mut content = fs::read_to_string(log.path()).await.unwrap();
        content.push_str("{not json at all\n");
        content.push_str("{\"file\":\"b.txt\"}\n");
        fs::write(log.path(), content).await.unwrap();

        let loaded = log.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, op.id);
    }

    #[tokio::test]
    async fn test_update_state_rewrites_one_record() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        let a = log.append(create_op("a.txt", "a")).await.unwrap();
        let b = log.append(create_op("b.txt", "b")).await.unwrap();

        let updated = log.update_state(&a.id, UndoState::Undone).await.unwrap();
        assert_eq!(updated.undo_state, UndoState::Undone);

        let loaded = log.load().await.unwrap();
        assert_eq!(loaded[0].undo_state, UndoState::Undone);
        assert_eq!(loaded[1].undo_state, UndoState::Active);
        assert_eq!(loaded[1].id, b.id);
    }

    #[tokio::test]
    async fn test_update_state_unknown_id_fails() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        log.append(create_op("a.txt", "a")).await.unwrap();

        let result = log.update_state("no-such-id", UndoState::Undone).await;
        assert!(matches!(result, Err(RetraceError::OperationNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_drops_record() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        let a = log.append(create_op("a.txt", "a")).await.unwrap();
        let b = log.append(create_op("b.txt", "b")).await.unwrap();

        let removed = log.remove(&a.id).await.unwrap();
        assert_eq!(removed.id, a.id);

        let loaded = log.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, b.id);

        assert!(log.remove(&a.id).await.is_err());
    }

    #[tokio::test]
    async fn test_compact_sorts_by_timestamp_then_seq() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        let mut early = create_op("a.txt", "a");
        early.timestamp = chrono::Utc::now() - chrono::Duration::minutes(5);
        let mut late = create_op("b.txt", "b");
        late.timestamp = chrono::Utc::now();

        // Append newest first so storage order disagrees with time order
        let late = log.append(late).await.unwrap();
        let early = log.append(early).await.unwrap();

        let count = log.compact().await.unwrap();
        assert_eq!(count, 2);

        let loaded = log.load().await.unwrap();
        assert_eq!(loaded[0].id, early.id);
        assert_eq!(loaded[1].id, late.id);
    }
}
