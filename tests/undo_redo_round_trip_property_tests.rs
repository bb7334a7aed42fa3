//! Property-based tests for the undo/redo round trip and the diff
//! engine's boundary behavior.

use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;
use retrace_core::{
    BackupStore, DiffEngine, EditMode, Operation, OperationKind, OperationLog, OperationRef,
    UndoRedoEngine,
};
use tempfile::TempDir;

/// Strategy for file content revisions: short printable strings where
/// consecutive revisions always differ
fn revisions_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z ]{0,20}", 1..6).prop_filter(
        "consecutive revisions must differ",
        |revisions| revisions.windows(2).all(|pair| pair[0] != pair[1]),
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

/// Record a create plus one full-content edit per revision, returning
/// the persisted operations in order.
async fn record_revisions(
    log: &OperationLog,
    file: &PathBuf,
    revisions: &[String],
) -> Vec<Operation> {
    let mut recorded = Vec::new();
    recorded.push(
        log.append(Operation::new(OperationKind::FileCreate {
            file: file.clone(),
            after: Some(revisions[0].clone()),
        }))
        .await
        .expect("append create"),
    );
    for pair in revisions.windows(2) {
        recorded.push(
            log.append(Operation::new(OperationKind::FileEdit {
                file: file.clone(),
                mode: EditMode::FullContent {
                    before: Some(pair[0].clone()),
                    after: Some(pair[1].clone()),
                },
            }))
            .await
            .expect("append edit"),
        );
    }
    recorded
}

/// Undoing at position k and then redoing the same operation lands the
/// file on exactly the content it had right after operation k.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn prop_undo_then_redo_at_k_restores_content_after_k(
        revisions in revisions_strategy(),
        k_seed in any::<prop::sample::Index>(),
    ) {
        runtime().block_on(async {
            let dir = TempDir::new().expect("temp dir");
            let file = dir.path().join("subject.txt");
            let log = Arc::new(OperationLog::new(dir.path().join("ops.log")));
            let engine = UndoRedoEngine::new(
                Arc::clone(&log),
                BackupStore::new(dir.path().join("backups")),
            );

            let recorded = record_revisions(&log, &file, &revisions).await;
            tokio::fs::write(&file, revisions.last().expect("nonempty"))
                .await
                .expect("write latest");

            let k = k_seed.index(recorded.len()) + 1; // 1-based
            let target = recorded[k - 1].id.clone();

            engine
                .undo(&OperationRef::Index(k))
                .await
                .expect("undo cascade");
            engine
                .redo(&OperationRef::Id(target))
                .await
                .expect("redo target");

            // Content immediately after operation k = revision k-1
            let on_disk = tokio::fs::read_to_string(&file).await.expect("read back");
            prop_assert_eq!(on_disk, revisions[k - 1].clone());
            Ok(())
        })?;
    }
}

/// Undo flips the target and everything recorded after it; nothing
/// recorded before the target changes state.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn prop_undo_never_touches_earlier_operations(
        revisions in revisions_strategy(),
        k_seed in any::<prop::sample::Index>(),
    ) {
        runtime().block_on(async {
            let dir = TempDir::new().expect("temp dir");
            let file = dir.path().join("subject.txt");
            let log = Arc::new(OperationLog::new(dir.path().join("ops.log")));
            let engine = UndoRedoEngine::new(
                Arc::clone(&log),
                BackupStore::new(dir.path().join("backups")),
            );

            let recorded = record_revisions(&log, &file, &revisions).await;
            tokio::fs::write(&file, revisions.last().expect("nonempty"))
                .await
                .expect("write latest");

            let k = k_seed.index(recorded.len()) + 1;
            engine
                .undo(&OperationRef::Index(k))
                .await
                .expect("undo cascade");

            let after = log.load().await.expect("reload");
            for (position, op) in after.iter().enumerate() {
                let undone = op.undo_state == retrace_core::UndoState::Undone;
                prop_assert_eq!(undone, position + 1 >= k, "operation {} state", position + 1);
            }
            Ok(())
        })?;
    }
}

/// Every persisted log line is an independently parseable JSON object
/// carrying the stable record fields.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn prop_log_lines_are_self_contained_json(revisions in revisions_strategy()) {
        runtime().block_on(async {
            let dir = TempDir::new().expect("temp dir");
            let file = dir.path().join("subject.txt");
            let log = OperationLog::new(dir.path().join("ops.log"));
            record_revisions(&log, &file, &revisions).await;

            let content = tokio::fs::read_to_string(log.path()).await.expect("store");
            for line in content.lines() {
                let value: serde_json::Value =
                    serde_json::from_str(line).expect("line parses as JSON");
                prop_assert!(value.get("id").is_some());
                prop_assert!(value.get("type").is_some());
                prop_assert!(value.get("timestamp").is_some());
                prop_assert!(value.get("seq").is_some());
            }
            Ok(())
        })?;
    }
}

/// Diff boundary behavior: appearance is exactly one create, removal is
/// exactly one delete, identical content diffs to nothing.
proptest! {
    #[test]
    fn prop_diff_boundaries(content in "[ -~]{0,40}") {
        let diff = DiffEngine::new();
        let file = PathBuf::from("any.txt");

        let created = diff.diff(&file, None, Some(content.as_str()));
        prop_assert_eq!(created.len(), 1);
        match &created[0].kind {
            OperationKind::FileCreate { after, .. } => {
                prop_assert_eq!(after.as_deref(), Some(content.as_str()));
            }
            other => return Err(TestCaseError::fail(format!("expected create, got {:?}", other))),
        }

        let deleted = diff.diff(&file, Some(content.as_str()), None);
        prop_assert_eq!(deleted.len(), 1);
        match &deleted[0].kind {
            OperationKind::FileDelete { before, .. } => {
                prop_assert_eq!(before.as_deref(), Some(content.as_str()));
            }
            other => return Err(TestCaseError::fail(format!("expected delete, got {:?}", other))),
        }

        prop_assert!(diff
            .diff(&file, Some(content.as_str()), Some(content.as_str()))
            .is_empty());
    }
}
