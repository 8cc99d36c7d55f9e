//! Pre-execution plan validation.

use super::types::{OrganizationPlan, ValidationIssue};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Directories no plan may write into
pub const PROTECTED_DIRS: &[&str] = &[
    "/bin",
    "/sbin",
    "/usr",
    "/etc",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
    "/System",
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
];

/// Source of free-space figures for a path's volume
pub trait DiskSpace: Send + Sync {
    /// Bytes available to the current user, if the volume is known
    fn available_space(&self, path: &Path) -> Option<u64>;
}

/// Queries mounted disks through `sysinfo`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDiskSpace;

impl DiskSpace for SystemDiskSpace {
    fn available_space(&self, path: &Path) -> Option<u64> {
        let disks = Disks::new_with_refreshed_list();
        let probe = existing_ancestor(path)?;
        let probe = fs::canonicalize(&probe).unwrap_or(probe);

        // Longest mount point containing the path wins
        disks
            .list()
            .iter()
            .filter(|d| probe.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(|d| d.available_space())
    }
}

/// Checks a plan before anything touches the filesystem.
///
/// Every check runs and every issue is reported, so callers can show the
/// complete list at once.
pub struct PlanValidator {
    headroom: f64,
    protected: Vec<PathBuf>,
    disk_space: Box<dyn DiskSpace>,
}

impl PlanValidator {
    /// `headroom` is the fraction of free space that must remain free
    pub fn new(headroom: f64) -> Self {
        Self {
            headroom,
            protected: PROTECTED_DIRS.iter().map(PathBuf::from).collect(),
            disk_space: Box::new(SystemDiskSpace),
        }
    }

    pub fn with_disk_space(mut self, disk_space: Box<dyn DiskSpace>) -> Self {
        self.disk_space = disk_space;
        self
    }

    pub fn with_protected_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.protected.push(dir.into());
        self
    }

    pub fn validate(&self, plan: &OrganizationPlan) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.check_conflicts(plan, &mut issues);
        self.check_protected(plan, &mut issues);
        self.check_sources(plan, &mut issues);
        self.check_writable(plan, &mut issues);
        self.check_space(plan, &mut issues);

        if issues.is_empty() {
            debug!("Plan {} passed validation", plan.batch_id);
        } else {
            warn!(
                "Plan {} failed validation with {} issue(s)",
                plan.batch_id,
                issues.len()
            );
        }
        issues
    }

    fn check_conflicts(&self, plan: &OrganizationPlan, issues: &mut Vec<ValidationIssue>) {
        let mut counts: HashMap<&Path, usize> = HashMap::new();
        for op in &plan.operations {
            *counts.entry(op.destination.as_path()).or_default() += 1;
        }

        let mut reported = Vec::new();
        for op in &plan.operations {
            let dest = op.destination.as_path();
            let count = counts.get(dest).copied().unwrap_or(0);
            if count > 1 && !reported.contains(&dest) {
                reported.push(dest);
                issues.push(ValidationIssue::Conflict {
                    destination: dest.to_path_buf(),
                    count,
                });
            }
        }
    }

    fn check_protected(&self, plan: &OrganizationPlan, issues: &mut Vec<ValidationIssue>) {
        for op in &plan.operations {
            if let Some(protected) = self.protected_root(&op.destination) {
                issues.push(ValidationIssue::UnsafeTarget {
                    destination: op.destination.clone(),
                    protected: protected.clone(),
                });
            }
        }
    }

    fn check_sources(&self, plan: &OrganizationPlan, issues: &mut Vec<ValidationIssue>) {
        for op in &plan.operations {
            if !op.source.is_file() {
                issues.push(ValidationIssue::MissingSource {
                    path: op.source.clone(),
                });
                continue;
            }
            if let Err(e) = File::open(&op.source) {
                issues.push(ValidationIssue::UnreadableSource {
                    path: op.source.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn protected_root(&self, path: &Path) -> Option<&PathBuf> {
        self.protected.iter().find(|p| path.starts_with(p))
    }

    fn check_writable(&self, plan: &OrganizationPlan, issues: &mut Vec<ValidationIssue>) {
        let mut checked: Vec<PathBuf> = Vec::new();
        for op in &plan.operations {
            // Already reported as unsafe; never probe protected trees
            if self.protected_root(&op.destination).is_some() {
                continue;
            }
            let Some(parent) = op.destination.parent() else {
                continue;
            };
            // Missing parents are created at execution time, so the nearest
            // existing ancestor is the one that has to accept new entries
            let Some(dir) = existing_ancestor(parent) else {
                continue;
            };
            if checked.contains(&dir) {
                continue;
            }

            if let Err(e) = NamedTempFile::new_in(&dir) {
                debug!("Write probe in {} failed: {}", dir.display(), e);
                issues.push(ValidationIssue::NotWritable {
                    directory: dir.clone(),
                });
            }
            checked.push(dir);
        }
    }

    fn check_space(&self, plan: &OrganizationPlan, issues: &mut Vec<ValidationIssue>) {
        let required: u64 = plan
            .operations
            .iter()
            .filter_map(|op| fs::metadata(&op.source).ok())
            .map(|m| m.len())
            .sum();
        if required == 0 {
            return;
        }

        let Some(available) = self.disk_space.available_space(&plan.target_root) else {
            warn!(
                "Could not determine free space for {}; skipping space check",
                plan.target_root.display()
            );
            return;
        };

        let usable = available as f64 * (1.0 - self.headroom);
        if required as f64 > usable {
            issues.push(ValidationIssue::InsufficientSpace {
                required_gb: required as f64 / GB,
                available_gb: available as f64 / GB,
            });
        }
    }
}

impl Default for PlanValidator {
    fn default() -> Self {
        Self::new(0.10)
    }
}

fn existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::organize::{FileOperation, OperationKind};
    use tempfile::TempDir;

    struct FixedSpace(Option<u64>);

    impl DiskSpace for FixedSpace {
        fn available_space(&self, _path: &Path) -> Option<u64> {
            self.0
        }
    }

    fn validator(space: Option<u64>) -> PlanValidator {
        PlanValidator::new(0.10).with_disk_space(Box::new(FixedSpace(space)))
    }

    fn plan_with(temp: &TempDir, ops: Vec<(PathBuf, PathBuf)>) -> OrganizationPlan {
        let mut plan = OrganizationPlan::new(temp.path(), temp.path().join("out"));
        for (src, dst) in ops {
            plan.push(FileOperation::new(src, dst, OperationKind::Move));
        }
        plan
    }

    fn source(temp: &TempDir, name: &str, len: usize) -> PathBuf {
        let path = temp.path().join(name);
        fs::write(&path, vec![b'x'; len]).unwrap();
        path
    }

    #[test]
    fn clean_plan_has_no_issues() {
        let temp = TempDir::new().unwrap();
        let a = source(&temp, "a.txt", 10);
        let plan = plan_with(&temp, vec![(a, temp.path().join("out/Docs/a.txt"))]);

        assert!(validator(Some(1_000_000)).validate(&plan).is_empty());
    }

    #[test]
    fn reports_every_issue_not_just_the_first() {
        let temp = TempDir::new().unwrap();
        let a = source(&temp, "a.txt", 10);
        let b = source(&temp, "b.txt", 10);
        let dest = temp.path().join("out/doc.txt");
        let plan = plan_with(
            &temp,
            vec![
                (a, dest.clone()),
                (b, dest),
                (temp.path().join("missing.txt"), PathBuf::from("/etc/evil.txt")),
            ],
        );

        let issues = validator(Some(1_000_000)).validate(&plan);

        assert_eq!(issues.len(), 3);
        assert!(matches!(issues[0], ValidationIssue::Conflict { count: 2, .. }));
        assert!(matches!(issues[1], ValidationIssue::UnsafeTarget { .. }));
        assert!(matches!(issues[2], ValidationIssue::MissingSource { .. }));
    }

    #[test]
    fn space_check_keeps_ten_percent_headroom() {
        let temp = TempDir::new().unwrap();
        let a = source(&temp, "a.bin", 950);
        let plan = plan_with(&temp, vec![(a, temp.path().join("out/a.bin"))]);

        let issues = validator(Some(1000)).validate(&plan);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].to_string().contains("GB"));

        assert!(validator(Some(1100)).validate(&plan).is_empty());
    }

    #[test]
    fn unknown_free_space_skips_the_check() {
        let temp = TempDir::new().unwrap();
        let a = source(&temp, "a.bin", 950);
        let plan = plan_with(&temp, vec![(a, temp.path().join("out/a.bin"))]);

        assert!(validator(None).validate(&plan).is_empty());
    }

    #[test]
    fn protected_prefix_matches_whole_components() {
        let temp = TempDir::new().unwrap();
        let a = source(&temp, "a.txt", 1);
        let plan = plan_with(&temp, vec![(a, PathBuf::from("/etcetera/a.txt"))]);

        let issues = validator(Some(1_000_000)).validate(&plan);
        assert!(!issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::UnsafeTarget { .. })));
    }

    #[test]
    fn destination_under_a_regular_file_is_not_writable() {
        let temp = TempDir::new().unwrap();
        let a = source(&temp, "a.txt", 1);
        let blocker = source(&temp, "blocker", 1);
        let plan = plan_with(&temp, vec![(a, blocker.join("Docs/a.txt"))]);

        let issues = validator(Some(1_000_000)).validate(&plan);

        assert_eq!(issues.len(), 1);
        assert!(matches!(
            &issues[0],
            ValidationIssue::NotWritable { directory } if *directory == blocker
        ));
    }

    #[cfg(unix)]
    #[test]
    fn read_only_target_directory_is_not_writable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let a = source(&temp, "a.txt", 1);
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
        let plan = plan_with(&temp, vec![(a, locked.join("a.txt"))]);

        // Root ignores permission bits
        let writable = NamedTempFile::new_in(&locked).is_ok();
        let issues = validator(Some(1_000_000)).validate(&plan);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if writable {
            assert!(issues.is_empty());
        } else {
            assert_eq!(issues.len(), 1);
            assert!(matches!(issues[0], ValidationIssue::NotWritable { .. }));
        }
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_source_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let a = source(&temp, "secret.txt", 1);
        fs::set_permissions(&a, fs::Permissions::from_mode(0o000)).unwrap();
        let plan = plan_with(&temp, vec![(a.clone(), temp.path().join("out/secret.txt"))]);

        // Root ignores permission bits
        let readable = File::open(&a).is_ok();
        let issues = validator(Some(1_000_000)).validate(&plan);
        fs::set_permissions(&a, fs::Permissions::from_mode(0o644)).unwrap();

        if readable {
            assert!(issues.is_empty());
        } else {
            assert_eq!(issues.len(), 1);
            assert!(matches!(
                &issues[0],
                ValidationIssue::UnreadableSource { path, .. } if *path == a
            ));
        }
    }

    #[test]
    fn nearest_existing_ancestor_is_probed() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            existing_ancestor(&temp.path().join("not/yet/created")),
            Some(temp.path().to_path_buf())
        );
    }
}
