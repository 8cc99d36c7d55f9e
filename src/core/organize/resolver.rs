//! Destination conflict resolution.

use super::types::OrganizationPlan;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Default bound on `" (N)"` attempts per operation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// `dir/name (n).ext` for `dir/name.ext`
pub fn numbered_path(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, n, ext.to_string_lossy()),
        None => format!("{} ({})", stem, n),
    };
    path.with_file_name(name)
}

/// Rewrites destinations so no two operations collide and nothing on disk
/// is overwritten.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    max_attempts: u32,
}

impl ConflictResolver {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Resolve every destination in plan order.
    ///
    /// A destination already claimed by an earlier operation, or already
    /// present on disk, gets `" (N)"` inserted before its extension. If no
    /// free name turns up within the attempt bound the destination is left
    /// as-is and an error is logged. Running this on a resolved plan changes
    /// nothing.
    pub fn resolve(&self, mut plan: OrganizationPlan) -> OrganizationPlan {
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut renamed = 0usize;

        for op in &mut plan.operations {
            if is_free(&op.destination, &op.source, &claimed) {
                claimed.insert(op.destination.clone());
                continue;
            }

            let found = (1..=self.max_attempts)
                .map(|n| numbered_path(&op.destination, n))
                .find(|candidate| is_free(candidate, &op.source, &claimed));

            match found {
                Some(candidate) => {
                    debug!(
                        "Conflict: {} -> {}",
                        op.destination.display(),
                        candidate.display()
                    );
                    op.suggested_name = super::types::file_name_string(&candidate);
                    op.destination = candidate;
                    renamed += 1;
                }
                None => {
                    error!(
                        "No free name for {} after {} attempts",
                        op.destination.display(),
                        self.max_attempts
                    );
                }
            }
            claimed.insert(op.destination.clone());
        }

        if renamed > 0 {
            debug!("Resolved {} conflict(s) in batch {}", renamed, plan.batch_id);
        }
        plan
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// A file that already sits at its own destination is not a conflict
fn is_free(candidate: &Path, source: &Path, claimed: &HashSet<PathBuf>) -> bool {
    !claimed.contains(candidate) && (candidate == source || !candidate.exists())
}
