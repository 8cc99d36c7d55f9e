//! Types for duplicate detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Content hash used for exact duplicates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentHashAlgorithm {
    #[default]
    Sha256,
    Md5,
}

impl fmt::Display for ContentHashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentHashAlgorithm::Sha256 => write!(f, "sha256"),
            ContentHashAlgorithm::Md5 => write!(f, "md5"),
        }
    }
}

/// How the members of a group relate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateType {
    /// Byte-for-byte identical
    Exact,
    /// Perceptually similar images
    Similar,
}

/// A set of files that duplicate each other
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub id: Uuid,
    pub duplicate_type: DuplicateType,
    /// The first member is treated as the original to keep
    pub files: Vec<PathBuf>,
    /// Shared content hash (exact groups only)
    pub hash: Option<String>,
    /// Mean similarity to the first member, 0.0-1.0 (similar groups only)
    pub similarity: Option<f64>,
    /// Size of the first member in bytes
    pub file_size: u64,
}

impl DuplicateGroup {
    pub fn exact(files: Vec<PathBuf>, hash: String, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            duplicate_type: DuplicateType::Exact,
            files,
            hash: Some(hash),
            similarity: None,
            file_size,
        }
    }

    pub fn similar(files: Vec<PathBuf>, similarity: f64, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            duplicate_type: DuplicateType::Similar,
            files,
            hash: None,
            similarity: Some(similarity),
            file_size,
        }
    }

    /// Number of redundant copies (excluding the original)
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Bytes reclaimable by keeping only the original.
    ///
    /// Assumes every member is as large as the first one. That holds for
    /// exact groups; for similar-image groups it is an estimate.
    pub fn wasted_bytes(&self) -> u64 {
        self.duplicate_count() as u64 * self.file_size
    }

    pub fn original(&self) -> Option<&PathBuf> {
        self.files.first()
    }
}

/// Everything one detection run found
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateDetectionResult {
    pub exact_duplicates: Vec<DuplicateGroup>,
    pub similar_images: Vec<DuplicateGroup>,
    pub files_scanned: usize,
    pub duration_ms: u64,
    /// Files that could not be read or decoded (non-fatal)
    pub errors: Vec<String>,
}

impl DuplicateDetectionResult {
    fn groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.exact_duplicates.iter().chain(self.similar_images.iter())
    }

    /// Redundant copies across all groups
    pub fn total_duplicates(&self) -> usize {
        self.groups().map(|g| g.duplicate_count()).sum()
    }

    /// Sum of `(members - 1) * first member size` across all groups
    pub fn wasted_space(&self) -> u64 {
        self.groups().map(|g| g.wasted_bytes()).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files scanned: {} exact group(s), {} similar group(s), {} duplicate(s), {} bytes reclaimable",
            self.files_scanned,
            self.exact_duplicates.len(),
            self.similar_images.len(),
            self.total_duplicates(),
            self.wasted_space()
        )
    }
}

/// Outcome of deleting redundant copies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletionReport {
    /// Deleted (or, in dry-run, would-be-deleted) files
    pub deleted: Vec<PathBuf>,
    /// Freed bytes, or bytes that would be freed in dry-run
    pub bytes_freed: u64,
    pub errors: Vec<String>,
    pub dry_run: bool,
}

impl DeletionReport {
    pub fn merge(&mut self, other: DeletionReport) {
        self.deleted.extend(other.deleted);
        self.bytes_freed += other.bytes_freed;
        self.errors.extend(other.errors);
    }
}
