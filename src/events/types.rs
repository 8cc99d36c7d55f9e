//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the organizer core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Plan execution events
    Execute(ExecuteEvent),
    /// Duplicate detection events
    Duplicate(DuplicateEvent),
    /// Backup snapshot events
    Backup(BackupEvent),
    /// Undo events
    Undo(UndoEvent),
}

/// Events while a plan is applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecuteEvent {
    /// Execution started (after validation and conflict resolution)
    Started {
        batch_id: String,
        total: usize,
        dry_run: bool,
    },
    /// One operation finished, successfully or not
    Progress {
        index: usize,
        total: usize,
        current: String,
    },
    /// A single operation failed; the batch continues
    OperationFailed { source: PathBuf, message: String },
    /// Cancellation was observed between operations
    Cancelled { completed: usize },
    /// The batch finished
    Completed {
        batch_id: String,
        completed: usize,
        failed: usize,
    },
}

/// Events during duplicate detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DuplicateEvent {
    /// Detection started over this many candidate files
    Started { total_files: usize },
    /// A file's content hash was computed (or served from cache)
    Hashed {
        completed: usize,
        total: usize,
        path: PathBuf,
    },
    /// A file could not be hashed; it is left out of the result
    Error { path: PathBuf, message: String },
    /// Detection finished
    Completed {
        exact_groups: usize,
        similar_groups: usize,
        wasted_bytes: u64,
    },
}

/// Events while backing files up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BackupEvent {
    Started { batch_id: String, total_files: usize },
    FileCopied { path: PathBuf },
    Completed { path: PathBuf, file_count: usize, total_bytes: u64 },
}

/// Events while reversing a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UndoEvent {
    Started { batch_id: String, total: usize },
    Reverted { source: PathBuf, target: PathBuf },
    Failed { target: PathBuf, message: String },
    Completed { batch_id: String, undone: usize, failed: usize },
}
