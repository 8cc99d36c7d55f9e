//! Integration tests for executing a batch and taking it back.

use file_organizer::core::organize::{
    ConflictResolver, DiskSpace, Executor, FileOperation, OperationKind, OrganizationPlan,
    PlanValidator,
};
use file_organizer::core::undo::{UndoLog, UndoManager};
use file_organizer::error::UndoError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

struct Plenty;

impl DiskSpace for Plenty {
    fn available_space(&self, _path: &Path) -> Option<u64> {
        Some(1 << 40)
    }
}

struct Fixture {
    temp: TempDir,
    log: Arc<UndoLog>,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(UndoLog::open(&temp.path().join("state").join("undo.db")).unwrap());
        Self { temp, log }
    }

    fn executor(&self) -> Executor {
        Executor::new(
            PlanValidator::new(0.10).with_disk_space(Box::new(Plenty)),
            ConflictResolver::new(1000),
        )
        .with_undo_log(Arc::clone(&self.log))
        .record_hashes(true)
    }

    fn undo(&self) -> UndoManager {
        UndoManager::new(Arc::clone(&self.log))
    }

    fn file(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.temp.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn out(&self) -> PathBuf {
        self.temp.path().join("out")
    }
}

fn move_plan(fixture: &Fixture, sources: &[PathBuf]) -> OrganizationPlan {
    let mut plan = OrganizationPlan::new(fixture.temp.path(), fixture.out());
    for source in sources {
        let name = source.file_name().unwrap();
        plan.push(FileOperation::new(
            source.clone(),
            fixture.out().join("Sorted").join(name),
            OperationKind::Move,
        ));
    }
    plan
}

#[test]
fn undo_restores_every_source_byte_for_byte() {
    let fixture = Fixture::new();
    let sources = vec![
        fixture.file("inbox/a.txt", b"first file"),
        fixture.file("inbox/nested/b.txt", b"second file"),
        fixture.file("inbox/c.txt", b""),
    ];
    let contents: Vec<Vec<u8>> = sources.iter().map(|p| fs::read(p).unwrap()).collect();

    let plan = move_plan(&fixture, &sources);
    let result = fixture.executor().execute(&plan, false);
    assert!(result.success, "{:?}", result.errors);
    assert!(sources.iter().all(|s| !s.exists()));

    // Source directories that vanished in the meantime are recreated
    fs::remove_dir(fixture.temp.path().join("inbox/nested")).unwrap();

    let undo = fixture.undo().undo_batch(&plan.batch_id).unwrap();

    assert!(undo.success, "{:?}", undo.errors);
    assert_eq!(undo.operations_undone, 3);
    for (source, content) in sources.iter().zip(&contents) {
        assert_eq!(&fs::read(source).unwrap(), content);
    }
    for op in &plan.operations {
        assert!(!op.destination.exists());
    }
}

#[test]
fn missing_target_is_reported_and_the_rest_still_undone() {
    let fixture = Fixture::new();
    let sources = vec![
        fixture.file("inbox/a.txt", b"a"),
        fixture.file("inbox/b.txt", b"b"),
    ];
    let plan = move_plan(&fixture, &sources);
    assert!(fixture.executor().execute(&plan, false).success);

    fs::remove_file(fixture.out().join("Sorted").join("a.txt")).unwrap();

    let undo = fixture.undo().undo_batch(&plan.batch_id).unwrap();

    assert!(!undo.success);
    assert_eq!(undo.operations_undone, 1);
    assert_eq!(undo.operations_failed, 1);
    assert_eq!(undo.errors.len(), 1);
    assert!(sources[1].exists());
}

#[test]
fn undo_last_picks_the_most_recent_batch() {
    let fixture = Fixture::new();
    let first = move_plan(&fixture, &[fixture.file("one/a.txt", b"a")]);
    assert!(fixture.executor().execute(&first, false).success);

    let second = move_plan(&fixture, &[fixture.file("two/b.txt", b"b")]);
    assert!(fixture.executor().execute(&second, false).success);

    let undo = fixture.undo().undo_last().unwrap();

    assert_eq!(undo.batch_id, second.batch_id);
    assert!(fixture.temp.path().join("two/b.txt").exists());
    assert!(!fixture.temp.path().join("one/a.txt").exists());
}

#[test]
fn copies_are_removed_and_originals_untouched() {
    let fixture = Fixture::new();
    let source = fixture.file("inbox/a.txt", b"original");
    let mut plan = OrganizationPlan::new(fixture.temp.path(), fixture.out());
    plan.push(FileOperation::new(
        source.clone(),
        fixture.out().join("a.txt"),
        OperationKind::Copy,
    ));

    assert!(fixture.executor().execute(&plan, false).success);
    assert!(fixture.out().join("a.txt").exists());

    let undo = fixture.undo().undo_batch(&plan.batch_id).unwrap();

    assert!(undo.success);
    assert!(!fixture.out().join("a.txt").exists());
    assert_eq!(fs::read(&source).unwrap(), b"original");
}

#[test]
fn history_tracks_undone_rows_and_second_undo_is_a_no_op() {
    let fixture = Fixture::new();
    let plan = move_plan(
        &fixture,
        &[fixture.file("inbox/a.txt", b"a"), fixture.file("inbox/b.txt", b"b")],
    );
    assert!(fixture.executor().execute(&plan, false).success);

    let manager = fixture.undo();
    let (possible, problems) = manager.verify_undo_possible(&plan.batch_id).unwrap();
    assert!(possible, "{:?}", problems);

    manager.undo_batch(&plan.batch_id).unwrap();
    let again = manager.undo_batch(&plan.batch_id).unwrap();
    assert!(again.success);
    assert_eq!(again.operations_undone, 0);

    let history = manager.get_history(10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].operation_count, 2);
    assert!(history[0].is_fully_undone());
}

#[test]
fn log_survives_reopening() {
    let fixture = Fixture::new();
    let plan = move_plan(&fixture, &[fixture.file("inbox/a.txt", b"a")]);
    assert!(fixture.executor().execute(&plan, false).success);

    let db_path = fixture.temp.path().join("state").join("undo.db");
    let reopened = UndoManager::new(Arc::new(UndoLog::open(&db_path).unwrap()));

    let undo = reopened.undo_batch(&plan.batch_id).unwrap();
    assert_eq!(undo.operations_undone, 1);
}

#[test]
fn unknown_batch_and_empty_log_are_errors() {
    let fixture = Fixture::new();
    let manager = fixture.undo();

    assert!(matches!(
        manager.undo_batch("no-such-batch"),
        Err(UndoError::BatchNotFound { .. })
    ));
    assert!(matches!(manager.undo_last(), Err(UndoError::NothingToUndo)));
}
