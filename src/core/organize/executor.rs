//! Executor for organization plans.

use super::resolver::ConflictResolver;
use super::types::*;
use super::validator::PlanValidator;
use crate::core::backup::BackupManager;
use crate::core::duplicates::{hash_file, ContentHashAlgorithm};
use crate::core::undo::UndoLog;
use crate::events::{null_sender, CancellationToken, Event, EventSender, ExecuteEvent};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Move a file, falling back to copy + verify + delete across filesystems.
pub(crate) fn move_file(source: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_then_remove(source, dest, |path| fs::remove_file(path))
        }
        Err(e) => Err(e),
    }
}

/// Copy `source` to `dest`, verify the size, then remove the source with
/// `remove_source`. Any failure after the copy starts removes `dest` again.
fn copy_then_remove<F>(source: &Path, dest: &Path, remove_source: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let source_size = fs::metadata(source)?.len();

    let outcome = fs::copy(source, dest)
        .and_then(|_| {
            // Verify destination size matches source before deleting
            let dest_size = fs::metadata(dest)?.len();
            if dest_size != source_size {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!(
                        "Copy verification failed: source {} bytes, dest {} bytes",
                        source_size, dest_size
                    ),
                ));
            }
            Ok(())
        })
        .and_then(|()| remove_source(source));

    if let Err(e) = &outcome {
        warn!("Move of {} failed after copy: {}", source.display(), e);
        if dest.exists() {
            if let Err(cleanup) = fs::remove_file(dest) {
                error!("Could not remove partial copy {}: {}", dest.display(), cleanup);
            }
        }
    }
    outcome
}

/// Applies plans: validate, resolve, back up, then run operations in order.
pub struct Executor {
    validator: PlanValidator,
    resolver: ConflictResolver,
    backup: Option<Arc<BackupManager>>,
    undo_log: Option<Arc<UndoLog>>,
    record_hashes: bool,
    events: EventSender,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(validator: PlanValidator, resolver: ConflictResolver) -> Self {
        Self {
            validator,
            resolver,
            backup: None,
            undo_log: None,
            record_hashes: false,
            events: null_sender(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn validator(&self) -> &PlanValidator {
        &self.validator
    }

    pub fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    pub fn with_validator(mut self, validator: PlanValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_backup(mut self, backup: Arc<BackupManager>) -> Self {
        self.backup = Some(backup);
        self
    }

    pub fn with_undo_log(mut self, log: Arc<UndoLog>) -> Self {
        self.undo_log = Some(log);
        self
    }

    /// Store a SHA-256 of each file in the undo log
    pub fn record_hashes(mut self, enabled: bool) -> Self {
        self.record_hashes = enabled;
        self
    }

    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = sender;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn execute(&self, plan: &OrganizationPlan, dry_run: bool) -> ExecutionResult {
        self.execute_with_progress(plan, dry_run, |_, _| {})
    }

    /// Execute a plan, calling `on_progress(index, total)` after every
    /// operation (successful or not). Indices are 1-based.
    pub fn execute_with_progress<F>(
        &self,
        plan: &OrganizationPlan,
        dry_run: bool,
        mut on_progress: F,
    ) -> ExecutionResult
    where
        F: FnMut(usize, usize),
    {
        let start = Instant::now();
        let batch_id = plan.batch_id.as_str();

        let issues = self.validator.validate(plan);
        if !issues.is_empty() {
            let errors: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
            error!(
                "Batch {} rejected: {} validation error(s)",
                batch_id,
                errors.len()
            );
            let mut result = ExecutionResult::aborted(batch_id, dry_run, errors);
            result.duration_ms = start.elapsed().as_millis() as u64;
            return result;
        }

        let plan = self.resolver.resolve(plan.clone());
        let total = plan.operations.len();
        let mut result = ExecutionResult::new(batch_id, dry_run);

        if !dry_run {
            if let Some(backup) = &self.backup {
                match backup.create_backup(&plan.sources(), batch_id) {
                    Ok(path) => result.backup_path = path,
                    Err(e) => {
                        error!("Backup failed, aborting batch {}: {}", batch_id, e);
                        let mut aborted = ExecutionResult::aborted(
                            batch_id,
                            dry_run,
                            vec![format!("Backup failed: {}", e)],
                        );
                        aborted.duration_ms = start.elapsed().as_millis() as u64;
                        return aborted;
                    }
                }
            }
        }

        self.events.send(Event::Execute(ExecuteEvent::Started {
            batch_id: batch_id.to_string(),
            total,
            dry_run,
        }));
        info!(
            "Executing batch {} ({} operations{})",
            batch_id,
            total,
            if dry_run { ", dry run" } else { "" }
        );

        for (i, op) in plan.operations.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    "Batch {} cancelled after {} operation(s)",
                    batch_id, result.operations_completed
                );
                result.errors.push("Execution cancelled".to_string());
                result.cancelled = true;
                self.events.send(Event::Execute(ExecuteEvent::Cancelled {
                    completed: result.operations_completed,
                }));
                break;
            }

            if dry_run {
                info!(
                    "[dry run] Would {} {} -> {}",
                    op.kind,
                    op.source.display(),
                    op.destination.display()
                );
                result.operations_completed += 1;
            } else {
                match self.apply(batch_id, op) {
                    Ok(()) => result.operations_completed += 1,
                    Err(e) => {
                        let message = format!("{}: {}", op.source.display(), e);
                        warn!("Operation failed: {}", message);
                        self.events.send(Event::Execute(ExecuteEvent::OperationFailed {
                            source: op.source.clone(),
                            message: e.to_string(),
                        }));
                        result.errors.push(message);
                        result.operations_failed += 1;
                    }
                }
            }

            on_progress(i + 1, total);
            self.events.send(Event::Execute(ExecuteEvent::Progress {
                index: i + 1,
                total,
                current: op.original_name.clone(),
            }));
        }

        result.success = result.operations_failed == 0;
        result.duration_ms = start.elapsed().as_millis() as u64;

        self.events.send(Event::Execute(ExecuteEvent::Completed {
            batch_id: batch_id.to_string(),
            completed: result.operations_completed,
            failed: result.operations_failed,
        }));
        info!(
            "Batch {} finished: {} completed, {} failed in {}ms",
            batch_id, result.operations_completed, result.operations_failed, result.duration_ms
        );

        result
    }

    fn apply(&self, batch_id: &str, op: &FileOperation) -> io::Result<()> {
        if !op.source.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "Source file not found",
            ));
        }
        if op.destination.exists() && op.destination != op.source {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Destination already exists: {}", op.destination.display()),
            ));
        }

        if let Some(parent) = op.destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let file_hash = if self.record_hashes {
            hash_file(&op.source, ContentHashAlgorithm::Sha256).ok()
        } else {
            None
        };

        match op.kind {
            OperationKind::Move | OperationKind::Rename => {
                if op.destination != op.source {
                    move_file(&op.source, &op.destination)?;
                }
            }
            OperationKind::Copy => {
                fs::copy(&op.source, &op.destination)?;
            }
        }

        if let Some(log) = &self.undo_log {
            if let Err(e) = log.record_operation(
                batch_id,
                op.kind,
                &op.source,
                &op.destination,
                file_hash.as_deref(),
            ) {
                // The file already moved; it just cannot be undone automatically
                error!(
                    "Failed to record {} -> {} for undo: {}",
                    op.source.display(),
                    op.destination.display(),
                    e
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backup::BackupStrategy;
    use crate::core::organize::DiskSpace;
    use tempfile::TempDir;

    #[test]
    fn failed_source_removal_discards_the_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        let dest = temp.path().join("b.txt");
        fs::write(&source, b"payload").unwrap();

        let err = copy_then_remove(&source, &dest, |_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        })
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(!dest.exists());
        assert_eq!(fs::read(&source).unwrap(), b"payload");
    }

    #[test]
    fn copy_fallback_removes_source_on_success() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        let dest = temp.path().join("b.txt");
        fs::write(&source, b"payload").unwrap();

        copy_then_remove(&source, &dest, |path| fs::remove_file(path)).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn ordinary_rename_errors_do_not_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        let dest = temp.path().join("missing/dir/b.txt");
        fs::write(&source, b"payload").unwrap();

        assert!(move_file(&source, &dest).is_err());
        assert!(source.exists());
        assert!(!dest.exists());
    }

    struct PlentyOfSpace;

    impl DiskSpace for PlentyOfSpace {
        fn available_space(&self, _path: &Path) -> Option<u64> {
            Some(u64::MAX / 2)
        }
    }

    fn executor() -> Executor {
        Executor::new(
            PlanValidator::default().with_disk_space(Box::new(PlentyOfSpace)),
            ConflictResolver::default(),
        )
    }

    fn setup(temp: &TempDir, names: &[&str]) -> OrganizationPlan {
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let mut plan = OrganizationPlan::new(&src, temp.path().join("out"));
        for name in names {
            let path = src.join(name);
            fs::write(&path, format!("content of {}", name)).unwrap();
            plan.push(FileOperation::new(
                path,
                temp.path().join("out/Docs").join(name),
                OperationKind::Move,
            ));
        }
        plan
    }

    #[test]
    fn moves_files_into_place() {
        let temp = TempDir::new().unwrap();
        let plan = setup(&temp, &["a.txt", "b.txt"]);

        let result = executor().execute(&plan, false);

        assert!(result.success);
        assert_eq!(result.operations_completed, 2);
        assert!(temp.path().join("out/Docs/a.txt").exists());
        assert!(!temp.path().join("src/a.txt").exists());
    }

    #[test]
    fn dry_run_leaves_filesystem_untouched() {
        let temp = TempDir::new().unwrap();
        let plan = setup(&temp, &["a.txt"]);

        let result = executor().execute(&plan, true);

        assert!(result.success);
        assert!(result.dry_run);
        assert_eq!(
            fs::read_to_string(temp.path().join("src/a.txt")).unwrap(),
            "content of a.txt"
        );
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn validation_failure_aborts_with_nothing_done() {
        let temp = TempDir::new().unwrap();
        let plan = setup(&temp, &["a.txt", "b.txt"]);
        fs::remove_file(temp.path().join("src/b.txt")).unwrap();

        let result = executor().execute(&plan, false);

        assert!(!result.success);
        assert_eq!(result.operations_completed, 0);
        assert_eq!(result.operations_failed, 0);
        assert!(temp.path().join("src/a.txt").exists());
    }

    #[test]
    fn file_vanishing_mid_batch_fails_only_that_operation() {
        let temp = TempDir::new().unwrap();
        let plan = setup(&temp, &["a.txt", "b.txt", "c.txt"]);
        let doomed = temp.path().join("src/c.txt");

        let result = executor().execute_with_progress(&plan, false, |index, _| {
            if index == 1 {
                fs::remove_file(&doomed).unwrap();
            }
        });

        assert!(!result.success);
        assert_eq!(result.operations_completed, 2);
        assert_eq!(result.operations_failed, 1);
        assert!(temp.path().join("out/Docs/a.txt").exists());
        assert!(temp.path().join("out/Docs/b.txt").exists());
    }

    #[test]
    fn existing_destination_is_renamed_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let plan = setup(&temp, &["a.txt"]);
        fs::create_dir_all(temp.path().join("out/Docs")).unwrap();
        fs::write(temp.path().join("out/Docs/a.txt"), "keep me").unwrap();

        let result = executor().execute(&plan, false);

        assert!(result.success);
        assert_eq!(
            fs::read_to_string(temp.path().join("out/Docs/a.txt")).unwrap(),
            "keep me"
        );
        assert!(temp.path().join("out/Docs/a (1).txt").exists());
    }

    #[test]
    fn progress_is_reported_after_every_operation() {
        let temp = TempDir::new().unwrap();
        let plan = setup(&temp, &["a.txt", "b.txt"]);
        let mut calls = Vec::new();

        executor().execute_with_progress(&plan, true, |i, total| calls.push((i, total)));

        assert_eq!(calls, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn cancellation_stops_between_operations() {
        let temp = TempDir::new().unwrap();
        let plan = setup(&temp, &["a.txt", "b.txt", "c.txt"]);
        let token = CancellationToken::new();
        let executor = executor().with_cancellation(token.clone());

        let result = executor.execute_with_progress(&plan, false, |index, _| {
            if index == 1 {
                token.cancel();
            }
        });

        assert!(result.cancelled);
        assert_eq!(result.operations_completed, 1);
        assert_eq!(result.operations_failed, 0);
        assert!(result.errors.contains(&"Execution cancelled".to_string()));
        assert!(temp.path().join("src/b.txt").exists());
    }

    #[test]
    fn backup_runs_before_mutation() {
        let temp = TempDir::new().unwrap();
        let plan = setup(&temp, &["a.txt"]);
        let backup = Arc::new(BackupManager::new(
            temp.path().join("backups"),
            BackupStrategy::Full,
        ));

        let result = executor().with_backup(backup).execute(&plan, false);

        let backup_path = result.backup_path.unwrap();
        assert_eq!(
            fs::read_to_string(backup_path.join("a.txt")).unwrap(),
            "content of a.txt"
        );
    }

    #[test]
    fn failed_backup_aborts_batch() {
        let temp = TempDir::new().unwrap();
        let plan = setup(&temp, &["a.txt"]);
        // A file where the backup root should be makes directory creation fail
        let blocker = temp.path().join("backups");
        fs::write(&blocker, "not a directory").unwrap();
        let backup = Arc::new(BackupManager::new(blocker, BackupStrategy::Full));

        let result = executor().with_backup(backup).execute(&plan, false);

        assert!(!result.success);
        assert_eq!(result.operations_completed, 0);
        assert!(result.errors[0].starts_with("Backup failed"));
        assert!(temp.path().join("src/a.txt").exists());
    }

    #[test]
    fn operations_are_recorded_for_undo() {
        let temp = TempDir::new().unwrap();
        let plan = setup(&temp, &["a.txt"]);
        let log = Arc::new(UndoLog::open_in_memory().unwrap());

        executor()
            .with_undo_log(Arc::clone(&log))
            .record_hashes(true)
            .execute(&plan, false);

        let records = log.get_batch_operations(&plan.batch_id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, temp.path().join("out/Docs/a.txt"));
        assert!(records[0].file_hash.is_some());
    }

    #[test]
    fn copy_keeps_the_source() {
        let temp = TempDir::new().unwrap();
        let mut plan = setup(&temp, &["a.txt"]);
        plan.operations[0].kind = OperationKind::Copy;

        let result = executor().execute(&plan, false);

        assert!(result.success);
        assert!(temp.path().join("src/a.txt").exists());
        assert!(temp.path().join("out/Docs/a.txt").exists());
    }
}
