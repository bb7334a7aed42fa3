//! Pre-mutation content snapshots keyed by operation and direction

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::RetraceError;

/// Whether a snapshot was taken ahead of an undo or a redo apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupDirection {
    /// Snapshot taken before reversing an operation
    Undo,
    /// Snapshot taken before replaying an operation
    Redo,
}

impl fmt::Display for BackupDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupDirection::Undo => write!(f, "undo"),
            BackupDirection::Redo => write!(f, "redo"),
        }
    }
}

/// Directory of per-operation content snapshots
///
/// One file per `(operation id, direction)` pair, named
/// `<id>-<undo|redo>.bak` and holding raw file content. A snapshot is
/// written before each destructive apply and never overwritten by a
/// later cascade; the earliest pre-mutation state wins.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    /// Create a store rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        BackupStore { dir: dir.into() }
    }

    /// Directory holding the snapshots
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a snapshot for this operation and direction would use
    pub fn snapshot_path(&self, id: &str, direction: BackupDirection) -> PathBuf {
        self.dir.join(format!("{}-{}.bak", id, direction))
    }

    /// Snapshot content for an operation, unless one already exists
    ///
    /// Returns the snapshot path, or `None` when an earlier cascade
    /// already captured this `(id, direction)` pair.
    pub async fn snapshot(
        &self,
        id: &str,
        direction: BackupDirection,
        content: &str,
    ) -> Result<Option<PathBuf>, RetraceError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.snapshot_path(id, direction);
        if fs::try_exists(&path).await? {
            debug!("Keeping existing backup {}", path.display());
            return Ok(None);
        }
        fs::write(&path, content).await?;
        Ok(Some(path))
    }

    /// Read a previously taken snapshot
    pub async fn read(
        &self,
        id: &str,
        direction: BackupDirection,
    ) -> Result<String, RetraceError> {
        Ok(fs::read_to_string(self.snapshot_path(id, direction)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_snapshot_writes_named_file() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));

        let path = store
            .snapshot("op-1", BackupDirection::Undo, "content")
            .await
            .unwrap()
            .expect("first snapshot should be written");
        assert!(path.ends_with("op-1-undo.bak"));
        assert_eq!(
            store.read("op-1", BackupDirection::Undo).await.unwrap(),
            "content"
        );
    }

    #[tokio::test]
    async fn test_snapshot_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));

        store
            .snapshot("op-1", BackupDirection::Undo, "first")
            .await
            .unwrap();
        let second = store
            .snapshot("op-1", BackupDirection::Undo, "second")
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(
            store.read("op-1", BackupDirection::Undo).await.unwrap(),
            "first"
        );
    }

    #[tokio::test]
    async fn test_directions_are_distinct_snapshots() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));

        store
            .snapshot("op-1", BackupDirection::Undo, "before undo")
            .await
            .unwrap();
        store
            .snapshot("op-1", BackupDirection::Redo, "before redo")
            .await
            .unwrap();
        assert_eq!(
            store.read("op-1", BackupDirection::Undo).await.unwrap(),
            "before undo"
        );
        assert_eq!(
            store.read("op-1", BackupDirection::Redo).await.unwrap(),
            "before redo"
        );
    }
}
