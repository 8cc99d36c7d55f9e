//! Plan generator: turns classifications into file operations.

use super::types::*;
use crate::config::OrganizerConfig;
use crate::core::classify::Classification;
use crate::core::rules::force_extension;
use crate::error::PlanError;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

const ELLIPSIS: &str = "...";
const FALLBACK_CATEGORY: &str = "Uncategorized";

/// Planner settings
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub confidence_threshold: f64,
    pub preserve_extension: bool,
    pub max_filename_length: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            preserve_extension: true,
            max_filename_length: 255,
        }
    }
}

impl PlannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn preserve_extension(mut self, preserve: bool) -> Self {
        self.preserve_extension = preserve;
        self
    }

    pub fn max_filename_length(mut self, max: usize) -> Self {
        self.max_filename_length = max;
        self
    }
}

impl From<&OrganizerConfig> for PlannerConfig {
    fn from(config: &OrganizerConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            preserve_extension: config.preserve_extension,
            max_filename_length: config.max_filename_length,
        }
    }
}

/// Builds organization plans from classifications
#[derive(Debug, Clone)]
pub struct OrganizationPlanner {
    config: PlannerConfig,
}

impl OrganizationPlanner {
    pub fn new(config: PlannerConfig) -> Result<Self, PlanError> {
        if !(0.0..=1.0).contains(&config.confidence_threshold) {
            return Err(PlanError::InvalidThreshold {
                value: config.confidence_threshold,
            });
        }
        // Room for one stem char, the ellipsis and a dot
        if config.max_filename_length < ELLIPSIS.len() + 2 {
            return Err(PlanError::InvalidFilenameLength {
                value: config.max_filename_length,
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan `target_root/<category>/<name>` for every file that has a
    /// classification at or above the confidence threshold.
    ///
    /// Files without one are left out. Each call gets a fresh batch id.
    pub fn create_plan(
        &self,
        files: &[PathBuf],
        classifications: &[Classification],
        target_root: &Path,
    ) -> OrganizationPlan {
        let mut by_path: HashMap<&Path, &Classification> = HashMap::new();
        for classification in classifications {
            by_path
                .entry(classification.file_path.as_path())
                .or_insert(classification);
        }

        let mut plan = OrganizationPlan::new(common_parent(files), target_root);
        plan.total_files = files.len();

        for file in files {
            let Some(classification) = by_path.get(file.as_path()) else {
                debug!("No classification for {}, skipping", file.display());
                continue;
            };
            if classification.confidence < self.config.confidence_threshold {
                debug!(
                    "Confidence {:.2} below threshold for {}, skipping",
                    classification.confidence,
                    file.display()
                );
                continue;
            }

            let filename = self.target_filename(file, &classification.suggested_name);
            let destination = target_root
                .join(category_dir(&classification.category))
                .join(&filename);

            let kind = if destination.parent() == file.parent() {
                OperationKind::Rename
            } else {
                OperationKind::Move
            };

            plan.push(
                FileOperation::new(file.clone(), destination, kind)
                    .with_confidence(classification.confidence)
                    .with_reasoning(classification.reasoning.clone()),
            );
        }

        info!(
            "Planned {} of {} files (batch {})",
            plan.planned_files, plan.total_files, plan.batch_id
        );
        plan
    }

    fn target_filename(&self, source: &Path, suggested: &str) -> String {
        let original = file_name_string(source);
        // Only the last component of a suggestion counts
        let suggested = Path::new(suggested)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(original);

        let name = if self.config.preserve_extension {
            let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("");
            force_extension(&suggested, ext)
        } else {
            suggested
        };

        truncate_filename(&name, self.config.max_filename_length)
    }
}

/// Shorten the stem so `name` fits in `max_len` bytes, keeping the extension.
pub fn truncate_filename(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }

    let path = Path::new(name);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);

    let budget = max_len.saturating_sub(ELLIPSIS.len() + ext.len());
    let mut cut = budget.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }

    format!("{}{}{}", &stem[..cut], ELLIPSIS, ext)
}

/// Category as a relative path with no `..`, root or prefix components
fn category_dir(category: &str) -> PathBuf {
    let dir: PathBuf = Path::new(category.trim())
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    if dir.as_os_str().is_empty() {
        PathBuf::from(FALLBACK_CATEGORY)
    } else {
        dir
    }
}

/// Deepest directory containing every file
fn common_parent(files: &[PathBuf]) -> PathBuf {
    let mut parents = files.iter().filter_map(|f| f.parent());
    let Some(first) = parents.next() else {
        return PathBuf::new();
    };

    let mut common = first.to_path_buf();
    for parent in parents {
        while !parent.starts_with(&common) {
            if !common.pop() {
                return PathBuf::new();
            }
        }
    }
    common
}
