//! End-to-end scenarios: capture pipeline into the log, then undo/redo
//! through the engine against the real filesystem.

use std::path::PathBuf;
use std::sync::Arc;

use retrace_core::{
    BackupStore, EditMode, OperationKind, OperationLog, OperationRef, UndoRedoEngine, UndoState,
};
use retrace_monitor::{ChangeMonitor, MonitorConfig};
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    root: PathBuf,
    log: Arc<OperationLog>,
    monitor: ChangeMonitor,
    engine: UndoRedoEngine,
}

fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    let log = Arc::new(OperationLog::new(root.join(".retrace/operations.log")));
    let monitor = ChangeMonitor::new(MonitorConfig::rooted(&root), Arc::clone(&log)).unwrap();
    let engine = UndoRedoEngine::new(
        Arc::clone(&log),
        BackupStore::new(root.join(".retrace/backups")),
    );
    Workspace {
        _dir: dir,
        root,
        log,
        monitor,
        engine,
    }
}

async fn read(ws: &Workspace, name: &str) -> String {
    tokio::fs::read_to_string(ws.root.join(name)).await.unwrap()
}

/// Create a file, capture it, undo the create, redo it back.
#[tokio::test]
async fn test_create_capture_then_undo_then_redo() {
    let ws = workspace();
    let file = ws.root.join("a.txt");
    tokio::fs::write(&file, "hello").await.unwrap();
    ws.monitor.handle_added(&file).await.unwrap();

    let ops = ws.log.load().await.unwrap();
    assert_eq!(ops.len(), 1);
    match &ops[0].kind {
        OperationKind::FileCreate { after, .. } => assert_eq!(after.as_deref(), Some("hello")),
        other => panic!("expected file_create, got {:?}", other),
    }

    let id = ops[0].id.clone();
    ws.engine.undo(&OperationRef::Id(id.clone())).await.unwrap();
    assert!(!file.exists());

    ws.engine.redo(&OperationRef::Id(id)).await.unwrap();
    assert_eq!(read(&ws, "a.txt").await, "hello");
}

/// Edit a file, capture the diff, undo back to the old content, redo
/// forward to the new one.
#[tokio::test]
async fn test_edit_capture_round_trips_content() {
    let ws = workspace();
    let file = ws.root.join("a.txt");
    tokio::fs::write(&file, "hello").await.unwrap();
    ws.monitor.handle_added(&file).await.unwrap();

    tokio::fs::write(&file, "hello world").await.unwrap();
    ws.monitor.handle_changed(&file).await.unwrap();

    let ops = ws.log.load().await.unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(ops[1].kind, OperationKind::FileEdit { .. }));

    let edit_id = ops[1].id.clone();
    ws.engine
        .undo(&OperationRef::Id(edit_id.clone()))
        .await
        .unwrap();
    assert_eq!(read(&ws, "a.txt").await, "hello");

    ws.engine.redo(&OperationRef::Id(edit_id)).await.unwrap();
    assert_eq!(read(&ws, "a.txt").await, "hello world");
}

/// Three operations on one file; undoing the middle one sweeps the
/// newest along with it and leaves the create untouched.
#[tokio::test]
async fn test_undo_in_the_middle_cascades_newest_first() {
    let ws = workspace();
    let file = ws.root.join("a.txt");

    tokio::fs::write(&file, "hello").await.unwrap();
    ws.monitor.handle_added(&file).await.unwrap();
    tokio::fs::write(&file, "hi").await.unwrap();
    ws.monitor.handle_changed(&file).await.unwrap();
    tokio::fs::write(&file, "hi there").await.unwrap();
    ws.monitor.handle_changed(&file).await.unwrap();

    let ops = ws.log.load().await.unwrap();
    assert_eq!(ops.len(), 3);
    let second = ops[1].id.clone();

    let report = ws
        .engine
        .undo(&OperationRef::Id(second.clone()))
        .await
        .unwrap();
    assert!(report.fully_applied());
    assert_eq!(report.steps.len(), 2);
    assert_eq!(read(&ws, "a.txt").await, "hello");

    let ops = ws.log.load().await.unwrap();
    assert_eq!(ops[0].undo_state, UndoState::Active);
    assert_eq!(ops[1].undo_state, UndoState::Undone);
    assert_eq!(ops[2].undo_state, UndoState::Undone);
}

/// Deleting a monitored file appends a delete record whose `before`
/// payload lets undo resurrect it.
#[tokio::test]
async fn test_delete_capture_and_resurrection() {
    let ws = workspace();
    let file = ws.root.join("a.txt");
    tokio::fs::write(&file, "data").await.unwrap();
    ws.monitor.handle_added(&file).await.unwrap();

    tokio::fs::remove_file(&file).await.unwrap();
    ws.monitor.handle_removed(&file).await.unwrap();

    let ops = ws.log.load().await.unwrap();
    assert_eq!(ops.len(), 2);
    match &ops[1].kind {
        OperationKind::FileDelete { before, .. } => assert_eq!(before.as_deref(), Some("data")),
        other => panic!("expected file_delete, got {:?}", other),
    }

    ws.engine
        .undo(&OperationRef::Id(ops[1].id.clone()))
        .await
        .unwrap();
    assert_eq!(read(&ws, "a.txt").await, "data");
}

/// A corrupted line in the store never blocks the rest of the log.
#[tokio::test]
async fn test_corrupted_log_line_is_tolerated_end_to_end() {
    let ws = workspace();
    let file = ws.root.join("a.txt");
    tokio::fs::write(&file, "survivor content").await.unwrap();
    ws.monitor.handle_added(&file).await.unwrap();

    let store = ws.log.path().to_path_buf();
    let mut content = tokio::fs::read_to_string(&store).await.unwrap();
    content.push_str("%% not a record %%\n");
    tokio::fs::write(&store, content).await.unwrap();

    let ops = ws.log.load().await.unwrap();
    assert_eq!(ops.len(), 1);

    // The surviving record is still fully operational
    ws.engine
        .undo(&OperationRef::Id(ops[0].id.clone()))
        .await
        .unwrap();
    assert!(!file.exists());
}

/// Backups capture the pre-mutation content, and repeated cycles never
/// clobber the first snapshot for a given operation and direction.
#[tokio::test]
async fn test_backups_snapshot_pre_mutation_content_once() {
    let ws = workspace();
    let backups = BackupStore::new(ws.root.join(".retrace/backups"));
    let file = ws.root.join("a.txt");
    tokio::fs::write(&file, "hello").await.unwrap();
    ws.monitor.handle_added(&file).await.unwrap();
    tokio::fs::write(&file, "hello world").await.unwrap();
    ws.monitor.handle_changed(&file).await.unwrap();

    let ops = ws.log.load().await.unwrap();
    let edit_id = ops[1].id.clone();

    ws.engine
        .undo(&OperationRef::Id(edit_id.clone()))
        .await
        .unwrap();
    let undo_snapshot = backups
        .read(&edit_id, retrace_core::BackupDirection::Undo)
        .await
        .unwrap();
    assert_eq!(undo_snapshot, "hello world");

    // Redo, then undo again: the original undo snapshot must survive
    ws.engine
        .redo(&OperationRef::Id(edit_id.clone()))
        .await
        .unwrap();
    tokio::fs::write(&file, "hello world").await.unwrap();
    ws.engine
        .undo(&OperationRef::Id(edit_id.clone()))
        .await
        .unwrap();
    let again = backups
        .read(&edit_id, retrace_core::BackupDirection::Undo)
        .await
        .unwrap();
    assert_eq!(again, "hello world");
}

/// Undo twice on the same id: the second call fails cleanly and leaves
/// the filesystem exactly as the first left it.
#[tokio::test]
async fn test_double_undo_is_rejected_without_side_effects() {
    let ws = workspace();
    let file = ws.root.join("a.txt");
    tokio::fs::write(&file, "hello").await.unwrap();
    ws.monitor.handle_added(&file).await.unwrap();

    let id = ws.log.load().await.unwrap()[0].id.clone();
    ws.engine.undo(&OperationRef::Id(id.clone())).await.unwrap();
    assert!(ws.engine.undo(&OperationRef::Id(id)).await.is_err());
    assert!(!file.exists());
}

/// A StringReplace captured by the diff engine survives an undo/redo
/// round trip even when the replaced text was a pure insertion.
#[tokio::test]
async fn test_captured_insertion_round_trips() {
    let ws = workspace();
    let file = ws.root.join("notes.md");
    tokio::fs::write(&file, "alpha\nomega\n").await.unwrap();
    ws.monitor.handle_added(&file).await.unwrap();

    tokio::fs::write(&file, "alpha\nmiddle\nomega\n").await.unwrap();
    ws.monitor.handle_changed(&file).await.unwrap();

    let ops = ws.log.load().await.unwrap();
    let edit = ops.last().unwrap();
    if let OperationKind::FileEdit {
        mode: EditMode::StringReplace { old_string, .. },
        ..
    } = &edit.kind
    {
        assert!(!old_string.is_empty(), "insertion must carry an anchor");
    }

    ws.engine
        .undo(&OperationRef::Id(edit.id.clone()))
        .await
        .unwrap();
    assert_eq!(read(&ws, "notes.md").await, "alpha\nomega\n");

    ws.engine
        .redo(&OperationRef::Id(edit.id.clone()))
        .await
        .unwrap();
    assert_eq!(read(&ws, "notes.md").await, "alpha\nmiddle\nomega\n");
}
