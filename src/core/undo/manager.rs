//! Reversal of recorded batches.

use super::repository::UndoLog;
use super::types::{BatchSummary, OperationRecord, UndoResult};
use crate::core::duplicates::{hash_file, ContentHashAlgorithm};
use crate::core::organize::{move_file, OperationKind};
use crate::error::UndoError;
use crate::events::{null_sender, Event, EventSender, UndoEvent};
use std::fs;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reverses batches recorded in an [`UndoLog`].
///
/// Rows are replayed newest first. A row that cannot be reversed is
/// reported and skipped; the rest of the batch is still attempted.
pub struct UndoManager {
    log: Arc<UndoLog>,
    events: EventSender,
}

impl UndoManager {
    pub fn new(log: Arc<UndoLog>) -> Self {
        Self {
            log,
            events: null_sender(),
        }
    }

    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = sender;
        self
    }

    pub fn log(&self) -> &Arc<UndoLog> {
        &self.log
    }

    /// Reverse every not-yet-undone row of `batch_id`.
    ///
    /// Only log access failures and unknown batches are `Err`; per-file
    /// problems land in [`UndoResult::errors`].
    pub fn undo_batch(&self, batch_id: &str) -> Result<UndoResult, UndoError> {
        if !self.log.batch_exists(batch_id)? {
            return Err(UndoError::BatchNotFound {
                batch_id: batch_id.to_string(),
            });
        }

        let pending = self.log.pending_operations(batch_id)?;
        let mut result = UndoResult::new(batch_id);

        self.events.send(Event::Undo(UndoEvent::Started {
            batch_id: batch_id.to_string(),
            total: pending.len(),
        }));
        info!("Undoing {} operation(s) from batch {}", pending.len(), batch_id);

        for record in &pending {
            let outcome = if already_reversed(record) {
                info!(
                    "{} is already back at its source; updating the log",
                    record.source.display()
                );
                Ok(())
            } else {
                reverse(record)
            };
            let outcome = outcome.and_then(|()| self.mark_undone(record));

            match outcome {
                Ok(()) => {
                    result.operations_undone += 1;
                    self.events.send(Event::Undo(UndoEvent::Reverted {
                        source: record.source.clone(),
                        target: record.target.clone(),
                    }));
                }
                Err(message) => {
                    warn!("Cannot undo {}: {}", record.target.display(), message);
                    self.events.send(Event::Undo(UndoEvent::Failed {
                        target: record.target.clone(),
                        message: message.clone(),
                    }));
                    result.errors.push(format!("{}: {}", record.target.display(), message));
                    result.operations_failed += 1;
                }
            }
        }

        result.success = result.operations_failed == 0;
        self.events.send(Event::Undo(UndoEvent::Completed {
            batch_id: batch_id.to_string(),
            undone: result.operations_undone,
            failed: result.operations_failed,
        }));
        info!(
            "Batch {}: {} undone, {} failed",
            batch_id, result.operations_undone, result.operations_failed
        );

        Ok(result)
    }

    /// Flag a reversed row, retrying once. A row left pending after a
    /// successful reversal is picked up by `already_reversed` next time
    /// when it carries a hash.
    fn mark_undone(&self, record: &OperationRecord) -> Result<(), String> {
        let first = match self.log.mark_undone(record.id) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        warn!("Marking row {} undone failed, retrying: {}", record.id, first);

        self.log.mark_undone(record.id).map_err(|e| {
            error!(
                "{} was restored to {} but row {} is still pending: {}",
                record.target.display(),
                record.source.display(),
                record.id,
                e
            );
            format!("Restored, but the undo log could not be updated: {}", e)
        })
    }

    /// Undo the most recent batch that still has something to undo
    pub fn undo_last(&self) -> Result<UndoResult, UndoError> {
        let batch_id = self
            .log
            .latest_pending_batch()?
            .ok_or(UndoError::NothingToUndo)?;
        self.undo_batch(&batch_id)
    }

    /// Check, without touching anything, whether every pending row of a
    /// batch can be reversed. Returns the problems found.
    pub fn verify_undo_possible(&self, batch_id: &str) -> Result<(bool, Vec<String>), UndoError> {
        if !self.log.batch_exists(batch_id)? {
            return Err(UndoError::BatchNotFound {
                batch_id: batch_id.to_string(),
            });
        }

        let problems: Vec<String> = self
            .log
            .pending_operations(batch_id)?
            .iter()
            .filter(|record| !already_reversed(record))
            .filter_map(|record| {
                precheck(record)
                    .err()
                    .map(|message| format!("{}: {}", record.target.display(), message))
            })
            .collect();

        Ok((problems.is_empty(), problems))
    }

    pub fn get_history(&self, limit: usize) -> Result<Vec<BatchSummary>, UndoError> {
        self.log.get_history(limit)
    }

    pub fn get_batch_operations(&self, batch_id: &str) -> Result<Vec<OperationRecord>, UndoError> {
        self.log.get_batch_operations(batch_id)
    }

    pub fn cleanup_history(&self, older_than_days: u32) -> Result<usize, UndoError> {
        self.log.cleanup_history(older_than_days)
    }
}

/// A move whose file is already back at its source with the recorded
/// content. Rows without a hash are never assumed reversed.
fn already_reversed(record: &OperationRecord) -> bool {
    if record.kind == OperationKind::Copy
        || record.source == record.target
        || record.target.exists()
        || !record.source.is_file()
    {
        return false;
    }
    match &record.file_hash {
        Some(expected) => hash_file(&record.source, ContentHashAlgorithm::Sha256)
            .map(|actual| &actual == expected)
            .unwrap_or(false),
        None => false,
    }
}

/// Conditions that must hold before a row is reversed
fn precheck(record: &OperationRecord) -> Result<(), String> {
    if !record.target.exists() {
        return Err("Target no longer exists".to_string());
    }

    match record.kind {
        OperationKind::Move | OperationKind::Rename => {
            if record.source.exists() && record.source != record.target {
                return Err(format!(
                    "A file already exists at the original location {}",
                    record.source.display()
                ));
            }
        }
        OperationKind::Copy => {
            // A copy edited since it was made is not ours to delete
            if let Some(expected) = &record.file_hash {
                let actual = hash_file(&record.target, ContentHashAlgorithm::Sha256)
                    .map_err(|e| e.to_string())?;
                if &actual != expected {
                    return Err("Copy was modified after the operation".to_string());
                }
            }
        }
    }
    Ok(())
}

fn reverse(record: &OperationRecord) -> Result<(), String> {
    precheck(record)?;

    match record.kind {
        OperationKind::Move | OperationKind::Rename => {
            if record.source == record.target {
                return Ok(());
            }
            if let Some(parent) = record.source.parent() {
                fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            move_file(&record.target, &record.source).map_err(|e| e.to_string())
        }
        OperationKind::Copy => fs::remove_file(&record.target).map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn manager() -> UndoManager {
        UndoManager::new(Arc::new(UndoLog::open_in_memory().unwrap()))
    }

    /// Move `name` from `src/` to `out/` and log it
    fn moved(manager: &UndoManager, temp: &Path, batch: &str, name: &str) -> (PathBuf, PathBuf) {
        let source = temp.join("src").join(name);
        let target = temp.join("out").join(name);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, name).unwrap();
        manager
            .log()
            .record_operation(batch, OperationKind::Move, &source, &target, None)
            .unwrap();
        (source, target)
    }

    #[test]
    fn undo_moves_files_back() {
        let temp = TempDir::new().unwrap();
        let manager = manager();
        let (source, target) = moved(&manager, temp.path(), "b1", "a.txt");

        let result = manager.undo_batch("b1").unwrap();

        assert!(result.success);
        assert_eq!(result.operations_undone, 1);
        assert_eq!(fs::read_to_string(&source).unwrap(), "a.txt");
        assert!(!target.exists());
    }

    #[test]
    fn missing_target_fails_that_row_only() {
        let temp = TempDir::new().unwrap();
        let manager = manager();
        let (a_src, _) = moved(&manager, temp.path(), "b1", "a.txt");
        let (_, b_target) = moved(&manager, temp.path(), "b1", "b.txt");
        fs::remove_file(&b_target).unwrap();

        let result = manager.undo_batch("b1").unwrap();

        assert!(!result.success);
        assert_eq!(result.operations_undone, 1);
        assert_eq!(result.operations_failed, 1);
        assert!(a_src.exists());
    }

    #[test]
    fn row_left_pending_after_restore_is_settled() {
        let temp = TempDir::new().unwrap();
        let manager = manager();
        let source = temp.path().join("src/a.txt");
        let target = temp.path().join("out/a.txt");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "payload").unwrap();
        let hash = hash_file(&source, ContentHashAlgorithm::Sha256).unwrap();
        manager
            .log()
            .record_operation(
                "b1",
                OperationKind::Move,
                &source,
                &target,
                Some(hash.as_str()),
            )
            .unwrap();

        // File already back at its source while the row is still pending
        let (possible, problems) = manager.verify_undo_possible("b1").unwrap();
        assert!(possible, "{:?}", problems);

        let result = manager.undo_batch("b1").unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.operations_undone, 1);
        assert_eq!(fs::read_to_string(&source).unwrap(), "payload");
        assert!(manager.log().pending_operations("b1").unwrap().is_empty());
    }

    #[test]
    fn missing_target_without_hash_is_still_reported() {
        let temp = TempDir::new().unwrap();
        let manager = manager();
        let (source, target) = moved(&manager, temp.path(), "b1", "a.txt");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::rename(&target, &source).unwrap();

        let result = manager.undo_batch("b1").unwrap();

        assert_eq!(result.operations_failed, 1);
        assert_eq!(manager.log().pending_operations("b1").unwrap().len(), 1);
    }

    #[test]
    fn undone_rows_are_not_replayed() {
        let temp = TempDir::new().unwrap();
        let manager = manager();
        moved(&manager, temp.path(), "b1", "a.txt");

        manager.undo_batch("b1").unwrap();
        let second = manager.undo_batch("b1").unwrap();

        assert!(second.success);
        assert_eq!(second.operations_undone, 0);
    }

    #[test]
    fn refuses_to_overwrite_original_location() {
        let temp = TempDir::new().unwrap();
        let manager = manager();
        let (source, target) = moved(&manager, temp.path(), "b1", "a.txt");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "newer file").unwrap();

        let result = manager.undo_batch("b1").unwrap();

        assert_eq!(result.operations_failed, 1);
        assert_eq!(fs::read_to_string(&source).unwrap(), "newer file");
        assert!(target.exists());
    }

    #[test]
    fn undoing_a_copy_deletes_it() {
        let temp = TempDir::new().unwrap();
        let manager = manager();
        let source = temp.path().join("orig.txt");
        let copy = temp.path().join("copy.txt");
        fs::write(&source, "x").unwrap();
        fs::write(&copy, "x").unwrap();
        manager
            .log()
            .record_operation("b1", OperationKind::Copy, &source, &copy, None)
            .unwrap();

        let result = manager.undo_batch("b1").unwrap();

        assert!(result.success);
        assert!(source.exists());
        assert!(!copy.exists());
    }

    #[test]
    fn modified_copy_is_kept() {
        let temp = TempDir::new().unwrap();
        let manager = manager();
        let source = temp.path().join("orig.txt");
        let copy = temp.path().join("copy.txt");
        fs::write(&source, "x").unwrap();
        let hash = hash_file(&source, ContentHashAlgorithm::Sha256).unwrap();
        fs::write(&copy, "edited").unwrap();
        manager
            .log()
            .record_operation("b1", OperationKind::Copy, &source, &copy, Some(hash.as_str()))
            .unwrap();

        let result = manager.undo_batch("b1").unwrap();

        assert_eq!(result.operations_failed, 1);
        assert!(copy.exists());
    }

    #[test]
    fn undo_last_picks_most_recent_pending_batch() {
        let temp = TempDir::new().unwrap();
        let manager = manager();
        let (old_src, _) = moved(&manager, temp.path(), "old", "a.txt");
        let (new_src, _) = moved(&manager, temp.path(), "new", "b.txt");

        let result = manager.undo_last().unwrap();

        assert_eq!(result.batch_id, "new");
        assert!(new_src.exists());
        assert!(!old_src.exists());

        assert_eq!(manager.undo_last().unwrap().batch_id, "old");
        assert!(matches!(manager.undo_last(), Err(UndoError::NothingToUndo)));
    }

    #[test]
    fn verify_reports_problems_without_mutating() {
        let temp = TempDir::new().unwrap();
        let manager = manager();
        let (_, a_target) = moved(&manager, temp.path(), "b1", "a.txt");
        let (_, b_target) = moved(&manager, temp.path(), "b1", "b.txt");
        fs::remove_file(&b_target).unwrap();

        let (possible, problems) = manager.verify_undo_possible("b1").unwrap();

        assert!(!possible);
        assert_eq!(problems.len(), 1);
        assert!(a_target.exists());
    }

    #[test]
    fn unknown_batch_is_an_error() {
        assert!(matches!(
            manager().undo_batch("missing"),
            Err(UndoError::BatchNotFound { .. })
        ));
    }
}
