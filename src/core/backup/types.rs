//! Types for pre-execution backups.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether sources are snapshotted before a batch runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStrategy {
    /// No snapshot; `create_backup` is a no-op
    None,
    /// Copy every source file into a per-batch directory
    #[default]
    Full,
}

/// A snapshot taken for one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSnapshot {
    /// Directory holding all backups
    pub root: PathBuf,
    /// This batch's directory under `root`
    pub path: PathBuf,
    pub batch_id: String,
    pub file_count: usize,
    pub total_bytes: u64,
    pub created_at: DateTime<Local>,
}

/// A backup directory found on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub name: String,
    pub path: PathBuf,
    pub file_count: usize,
    pub total_bytes: u64,
    pub created_at: DateTime<Local>,
    pub age_days: i64,
}
