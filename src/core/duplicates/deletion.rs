//! Removing redundant copies from duplicate groups.

use super::detector::DuplicateDetector;
use super::types::{DeletionReport, DuplicateGroup};
use std::fs;
use tracing::{info, warn};

impl DuplicateDetector {
    /// Delete every member of `group` whose index is not in `keep_indices`.
    ///
    /// With `dry_run` nothing is touched; the report lists what would go.
    /// A `keep_indices` that keeps nothing is refused so that at least one
    /// copy always survives.
    pub fn delete_duplicates(
        &self,
        group: &DuplicateGroup,
        keep_indices: &[usize],
        dry_run: bool,
    ) -> DeletionReport {
        let mut report = DeletionReport {
            dry_run,
            ..Default::default()
        };

        if !keep_indices.iter().any(|&i| i < group.files.len()) {
            report.errors.push(format!(
                "Refusing to delete every file in group {}: no valid index to keep",
                group.id
            ));
            return report;
        }

        for (index, path) in group.files.iter().enumerate() {
            if keep_indices.contains(&index) {
                continue;
            }

            let size = match fs::metadata(path) {
                Ok(m) => m.len(),
                Err(e) => {
                    warn!("Cannot delete {}: {}", path.display(), e);
                    report.errors.push(format!("{}: {}", path.display(), e));
                    continue;
                }
            };

            if dry_run {
                info!("[dry run] Would delete {}", path.display());
                report.deleted.push(path.clone());
                report.bytes_freed += size;
                continue;
            }

            match fs::remove_file(path) {
                Ok(()) => {
                    info!("Deleted duplicate {}", path.display());
                    self.cache.remove(path);
                    report.deleted.push(path.clone());
                    report.bytes_freed += size;
                }
                Err(e) => {
                    warn!("Failed to delete {}: {}", path.display(), e);
                    report.errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        report
    }

    /// Keep the first member of every group and delete the rest.
    pub fn delete_all_but_one(&self, groups: &[DuplicateGroup], dry_run: bool) -> DeletionReport {
        let mut total = DeletionReport {
            dry_run,
            ..Default::default()
        };
        for group in groups {
            total.merge(self.delete_duplicates(group, &[0], dry_run));
        }
        total
    }
}
