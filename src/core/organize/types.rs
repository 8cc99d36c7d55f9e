//! Types for the organize module.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// What an operation does to its source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Move into another directory (source disappears)
    #[default]
    Move,
    /// Move within the same directory under a new name
    Rename,
    /// Copy to the destination (source stays)
    Copy,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Rename => "rename",
            Self::Copy => "copy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "move" => Some(Self::Move),
            "rename" => Some(Self::Rename),
            "copy" => Some(Self::Copy),
            _ => None,
        }
    }

    /// Whether the source no longer exists after the operation
    pub fn removes_source(&self) -> bool {
        matches!(self, Self::Move | Self::Rename)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned file operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileOperation {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: OperationKind,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub reasoning: String,
    pub original_name: String,
    pub suggested_name: String,
}

impl FileOperation {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        kind: OperationKind,
    ) -> Self {
        let source = source.into();
        let destination = destination.into();
        let original_name = file_name_string(&source);
        let suggested_name = file_name_string(&destination);
        Self {
            source,
            destination,
            kind,
            confidence: 1.0,
            reasoning: String::new(),
            original_name,
            suggested_name,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

pub(crate) fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// An ordered batch of operations sharing one batch id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationPlan {
    pub batch_id: String,
    pub source_dir: PathBuf,
    pub target_root: PathBuf,
    pub operations: Vec<FileOperation>,
    /// Files considered while planning
    pub total_files: usize,
    /// Files that made it into `operations`
    pub planned_files: usize,
    pub created_at: DateTime<Local>,
}

impl OrganizationPlan {
    /// Empty plan with a fresh batch id
    pub fn new(source_dir: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            source_dir: source_dir.into(),
            target_root: target_root.into(),
            operations: Vec::new(),
            total_files: 0,
            planned_files: 0,
            created_at: Local::now(),
        }
    }

    pub fn push(&mut self, operation: FileOperation) {
        self.operations.push(operation);
        self.planned_files = self.operations.len();
        self.total_files = self.total_files.max(self.planned_files);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn sources(&self) -> Vec<PathBuf> {
        self.operations.iter().map(|op| op.source.clone()).collect()
    }
}

/// A reason a plan must not run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("Conflict: {count} operations target {destination}")]
    Conflict { destination: PathBuf, count: usize },

    #[error("Unsafe target: {destination} is inside protected directory {protected}")]
    UnsafeTarget {
        destination: PathBuf,
        protected: PathBuf,
    },

    #[error("Source file not found: {path}")]
    MissingSource { path: PathBuf },

    #[error("Source file not readable: {path} ({reason})")]
    UnreadableSource { path: PathBuf, reason: String },

    #[error("Destination directory not writable: {directory}")]
    NotWritable { directory: PathBuf },

    #[error("Insufficient disk space: need {required_gb:.2} GB, {available_gb:.2} GB available")]
    InsufficientSpace { required_gb: f64, available_gb: f64 },
}

/// Outcome of one `execute` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// True iff no operation failed
    pub success: bool,
    pub operations_completed: usize,
    pub operations_failed: usize,
    pub errors: Vec<String>,
    pub batch_id: String,
    pub duration_ms: u64,
    pub dry_run: bool,
    /// Set when execution stopped early on cancellation
    pub cancelled: bool,
    pub backup_path: Option<PathBuf>,
}

impl ExecutionResult {
    pub(crate) fn new(batch_id: &str, dry_run: bool) -> Self {
        Self {
            success: true,
            operations_completed: 0,
            operations_failed: 0,
            errors: Vec::new(),
            batch_id: batch_id.to_string(),
            duration_ms: 0,
            dry_run,
            cancelled: false,
            backup_path: None,
        }
    }

    /// A batch that was rejected before any operation ran
    pub(crate) fn aborted(batch_id: &str, dry_run: bool, errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            ..Self::new(batch_id, dry_run)
        }
    }
}
