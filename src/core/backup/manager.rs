//! Backup manager: snapshots, listing, retention and restore.

use super::types::{BackupInfo, BackupSnapshot, BackupStrategy};
use crate::core::organize::numbered_path;
use crate::error::BackupError;
use crate::events::{null_sender, BackupEvent, Event, EventSender};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const DIR_PREFIX: &str = "backup_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Copies source files aside before a batch mutates them
pub struct BackupManager {
    root: PathBuf,
    strategy: BackupStrategy,
    events: EventSender,
}

impl BackupManager {
    pub fn new(root: impl Into<PathBuf>, strategy: BackupStrategy) -> Self {
        Self {
            root: root.into(),
            strategy,
            events: null_sender(),
        }
    }

    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = sender;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn strategy(&self) -> BackupStrategy {
        self.strategy
    }

    /// Snapshot `files` and return the backup directory, or `None` when
    /// backups are disabled.
    pub fn create_backup(
        &self,
        files: &[PathBuf],
        batch_id: &str,
    ) -> Result<Option<PathBuf>, BackupError> {
        Ok(self.create_snapshot(files, batch_id)?.map(|s| s.path))
    }

    /// Copy every existing file in `files` into
    /// `<root>/backup_<YYYYMMDD_HHMMSS>_<batch8>/`.
    ///
    /// Relative inputs keep their directory structure; absolute inputs are
    /// flattened to their file name. Any copy failure fails the snapshot.
    /// A count or size mismatch after copying is only logged.
    pub fn create_snapshot(
        &self,
        files: &[PathBuf],
        batch_id: &str,
    ) -> Result<Option<BackupSnapshot>, BackupError> {
        self.snapshot_with(files, batch_id, |source, dest| fs::copy(source, dest))
    }

    /// `create_snapshot` with a pluggable copy step. A failed snapshot
    /// directory is removed so it never shows up in `list_backups`.
    fn snapshot_with<F>(
        &self,
        files: &[PathBuf],
        batch_id: &str,
        mut copy: F,
    ) -> Result<Option<BackupSnapshot>, BackupError>
    where
        F: FnMut(&Path, &Path) -> io::Result<u64>,
    {
        if self.strategy == BackupStrategy::None {
            debug!("Backups disabled; skipping snapshot for batch {}", batch_id);
            return Ok(None);
        }

        let created_at = Local::now();
        let prefix: String = batch_id.chars().take(8).collect();
        let dir = self.root.join(format!(
            "{}{}_{}",
            DIR_PREFIX,
            created_at.format(TIMESTAMP_FORMAT),
            prefix
        ));

        fs::create_dir_all(&self.root).map_err(|e| BackupError::CreateDir {
            path: self.root.clone(),
            source: e,
        })?;
        fs::create_dir(&dir).map_err(|e| BackupError::CreateDir {
            path: dir.clone(),
            source: e,
        })?;

        let existing: Vec<&PathBuf> = files.iter().filter(|f| f.is_file()).collect();
        self.events.send(Event::Backup(BackupEvent::Started {
            batch_id: batch_id.to_string(),
            total_files: existing.len(),
        }));

        let mut expected_bytes = 0u64;
        let mut copied_count = 0usize;
        let mut copied_bytes = 0u64;

        let copied = existing.into_iter().try_for_each(|source| -> Result<(), BackupError> {
            let dest = free_destination(dir.join(backup_relative_path(source)));
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| BackupError::CreateDir {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }

            let source_len = fs::metadata(source).map(|m| m.len()).unwrap_or(0);
            expected_bytes += source_len;

            let written = copy(source, &dest).map_err(|e| BackupError::Copy {
                path: source.clone(),
                source: e,
            })?;
            copied_count += 1;
            copied_bytes += written;
            self.events.send(Event::Backup(BackupEvent::FileCopied {
                path: source.clone(),
            }));
            Ok(())
        });

        if let Err(e) = copied {
            warn!("Backup into {} failed: {}", dir.display(), e);
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                warn!("Could not remove partial backup {}: {}", dir.display(), cleanup);
            }
            return Err(e);
        }

        let (on_disk_count, on_disk_bytes) = tree_stats(&dir);
        if on_disk_count != copied_count || on_disk_bytes != expected_bytes {
            warn!(
                "Backup verification mismatch in {}: expected {} files / {} bytes, found {} files / {} bytes",
                dir.display(),
                copied_count,
                expected_bytes,
                on_disk_count,
                on_disk_bytes
            );
        }

        info!(
            "Backed up {} files ({} bytes) to {}",
            copied_count,
            copied_bytes,
            dir.display()
        );
        self.events.send(Event::Backup(BackupEvent::Completed {
            path: dir.clone(),
            file_count: copied_count,
            total_bytes: copied_bytes,
        }));

        Ok(Some(BackupSnapshot {
            root: self.root.clone(),
            path: dir,
            batch_id: batch_id.to_string(),
            file_count: copied_count,
            total_bytes: copied_bytes,
            created_at,
        }))
    }

    /// All backups under the root, newest first
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>, BackupError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|e| BackupError::Read {
            path: self.root.clone(),
            source: e,
        })?;

        let now = Local::now();
        let mut backups = Vec::new();

        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if !path.is_dir() || !name.starts_with(DIR_PREFIX) {
                continue;
            }

            let Some(created_at) = backup_created_at(&name, &path) else {
                warn!("Cannot determine age of {}", path.display());
                continue;
            };
            let (file_count, total_bytes) = tree_stats(&path);

            backups.push(BackupInfo {
                name,
                path,
                file_count,
                total_bytes,
                created_at,
                age_days: (now - created_at).num_days(),
            });
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    /// Remove backups older than `retention_days`. Returns how many were removed.
    pub fn cleanup_old_backups(&self, retention_days: u32) -> Result<usize, BackupError> {
        let mut removed = 0;
        for backup in self.list_backups()? {
            if backup.age_days <= i64::from(retention_days) {
                continue;
            }
            match fs::remove_dir_all(&backup.path) {
                Ok(()) => {
                    info!("Removed old backup {} ({} days)", backup.name, backup.age_days);
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove backup {}: {}", backup.path.display(), e),
            }
        }
        Ok(removed)
    }

    /// Copy a snapshot's tree into `destination_root`, overwriting files that
    /// already exist there. Returns the number of files restored.
    pub fn restore_backup(
        &self,
        backup_dir: &Path,
        destination_root: &Path,
    ) -> Result<usize, BackupError> {
        if !backup_dir.is_dir() {
            return Err(BackupError::NotFound {
                path: backup_dir.to_path_buf(),
            });
        }

        let mut restored = 0;
        for entry in WalkDir::new(backup_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = match entry.path().strip_prefix(backup_dir) {
                Ok(r) => r,
                Err(_) => continue,
            };
            let dest = destination_root.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| BackupError::CreateDir {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            fs::copy(entry.path(), &dest).map_err(|e| BackupError::Copy {
                path: entry.path().to_path_buf(),
                source: e,
            })?;
            restored += 1;
        }

        info!(
            "Restored {} files from {} to {}",
            restored,
            backup_dir.display(),
            destination_root.display()
        );
        Ok(restored)
    }
}

/// Where a source lands inside the snapshot directory
fn backup_relative_path(source: &Path) -> PathBuf {
    if source.is_absolute() {
        return source
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("unnamed"));
    }
    // Drop `..` and `.` so a relative input cannot escape the snapshot
    source
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

/// Flattened absolute inputs may share a name
fn free_destination(dest: PathBuf) -> PathBuf {
    let mut candidate = dest.clone();
    let mut n = 0;
    while candidate.exists() {
        n += 1;
        candidate = numbered_path(&dest, n);
    }
    candidate
}

fn tree_stats(dir: &Path) -> (usize, u64) {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .fold((0, 0), |(count, bytes), e| {
            let len = e.metadata().map(|m| m.len()).unwrap_or(0);
            (count + 1, bytes + len)
        })
}

fn backup_created_at(name: &str, path: &Path) -> Option<DateTime<Local>> {
    let stamp = name.strip_prefix(DIR_PREFIX)?.get(..15)?;
    if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT) {
        if let Some(local) = Local.from_local_datetime(&naive).earliest() {
            return Some(local);
        }
    }
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Local>::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn none_strategy_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("backups"), BackupStrategy::None);
        let file = temp.path().join("a.txt");
        write(&file, "data");

        let result = manager.create_backup(&[file], "batch-1").unwrap();

        assert!(result.is_none());
        assert!(!temp.path().join("backups").exists());
    }

    #[test]
    fn failed_copy_leaves_no_partial_backup() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("backups"), BackupStrategy::Full);
        let a = temp.path().join("in/a.txt");
        let b = temp.path().join("in/b.txt");
        write(&a, "hello");
        write(&b, "world");

        let err = manager
            .snapshot_with(&[a.clone(), b.clone()], "batch-1", |source, dest| {
                if source == b.as_path() {
                    Err(io::Error::new(io::ErrorKind::Other, "disk full"))
                } else {
                    fs::copy(source, dest)
                }
            })
            .unwrap_err();

        assert!(matches!(err, BackupError::Copy { ref path, .. } if *path == b));
        assert!(manager.list_backups().unwrap().is_empty());
        assert_eq!(fs::read_dir(temp.path().join("backups")).unwrap().count(), 0);
    }

    #[test]
    fn snapshot_copies_existing_files_and_names_dir() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("backups"), BackupStrategy::Full);
        let a = temp.path().join("in/a.txt");
        let b = temp.path().join("in/b.txt");
        write(&a, "hello");
        write(&b, "world!");
        let missing = temp.path().join("in/missing.txt");

        let snapshot = manager
            .create_snapshot(&[a.clone(), b, missing], "0123456789abcdef")
            .unwrap()
            .unwrap();

        assert_eq!(snapshot.file_count, 2);
        assert_eq!(snapshot.total_bytes, 11);
        let name = snapshot.path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("backup_"));
        assert!(name.ends_with("_01234567"));
        assert_eq!(fs::read_to_string(snapshot.path.join("a.txt")).unwrap(), "hello");
        assert!(a.exists());
    }

    #[test]
    fn flattened_name_collisions_are_kept_apart() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("backups"), BackupStrategy::Full);
        let a = temp.path().join("x/doc.txt");
        let b = temp.path().join("y/doc.txt");
        write(&a, "one");
        write(&b, "two");

        let snapshot = manager.create_snapshot(&[a, b], "batch").unwrap().unwrap();

        assert_eq!(snapshot.file_count, 2);
        assert!(snapshot.path.join("doc.txt").exists());
        assert!(snapshot.path.join("doc (1).txt").exists());
    }

    #[test]
    fn relative_paths_keep_structure() {
        assert_eq!(
            backup_relative_path(Path::new("docs/2024/a.txt")),
            PathBuf::from("docs/2024/a.txt")
        );
        assert_eq!(
            backup_relative_path(Path::new("../escape/a.txt")),
            PathBuf::from("escape/a.txt")
        );
    }

    #[test]
    fn lists_newest_first_and_cleans_up_old() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("backups");
        let manager = BackupManager::new(&root, BackupStrategy::Full);
        write(&root.join("backup_20200101_000000_aaaaaaaa/a.txt"), "old");
        write(&root.join("backup_29990101_000000_bbbbbbbb/b.txt"), "future");
        write(&root.join("not_a_backup/c.txt"), "ignored");

        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), 2);
        assert!(backups[0].name.contains("29990101"));
        assert_eq!(backups[1].file_count, 1);
        assert_eq!(backups[1].total_bytes, 3);

        let removed = manager.cleanup_old_backups(30).unwrap();
        assert_eq!(removed, 1);
        assert!(!root.join("backup_20200101_000000_aaaaaaaa").exists());
        assert!(root.join("not_a_backup").exists());
    }

    #[test]
    fn restore_copies_tree_back() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("backups"), BackupStrategy::Full);
        let file = temp.path().join("src/report.pdf");
        write(&file, "pdf");
        let snapshot = manager.create_snapshot(&[file], "batch").unwrap().unwrap();

        let restore_to = temp.path().join("restored");
        let restored = manager.restore_backup(&snapshot.path, &restore_to).unwrap();

        assert_eq!(restored, 1);
        assert_eq!(fs::read_to_string(restore_to.join("report.pdf")).unwrap(), "pdf");
    }

    #[test]
    fn restore_missing_backup_fails() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path(), BackupStrategy::Full);
        assert!(manager
            .restore_backup(&temp.path().join("nope"), temp.path())
            .is_err());
    }

    #[test]
    fn listing_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("never"), BackupStrategy::Full);
        assert!(manager.list_backups().unwrap().is_empty());
    }
}
