//! # Error Module
//!
//! Error types for the file organizer.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, rule ids, what went wrong
//! - **Per-item failures are data** - a failed move or a missing undo
//!   target lands in a result's error list, not here
//!
//! Only conditions that stop a whole operation (a broken undo database,
//! a backup that could not be written, an invalid configuration) are
//! represented as errors.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    #[error("Undo error: {0}")]
    Undo(#[from] UndoError),

    #[error("Duplicate detection error: {0}")]
    Duplicate(#[from] DuplicateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while building, validating or persisting rules
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Invalid regex in rule '{rule}': {reason}")]
    InvalidRegex { rule: String, reason: String },

    #[error("Invalid size value '{value}' (expected e.g. 10MB, 1.5GB or bytes)")]
    InvalidSize { value: String },

    #[error("Invalid date value '{value}' (expected today, yesterday, N_days_ago or YYYY-MM-DD)")]
    InvalidDate { value: String },

    #[error("Rule '{rule}' uses 'between' but has no second value")]
    MissingSecondValue { rule: String },

    #[error("Operator '{operator}' is not supported for {rule_type} rules")]
    UnsupportedOperator { rule_type: String, operator: String },

    #[error("Rule not found: {id}")]
    NotFound { id: String },

    #[error("Failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rules file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Errors raised when constructing planning components
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Invalid confidence threshold: {value} (must be 0.0-1.0)")]
    InvalidThreshold { value: f64 },

    #[error("Invalid maximum filename length: {value}")]
    InvalidFilenameLength { value: usize },

    #[error("Plan {batch_id} failed validation with {count} error(s)")]
    ValidationFailed { batch_id: String, count: usize },

    #[error("Source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to read classifications from {path}: {reason}")]
    Classifications { path: PathBuf, reason: String },
}

/// Errors raised while snapshotting files before execution
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to create backup directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {path} into backup: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read backup directory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the undo log
#[derive(Error, Debug)]
pub enum UndoError {
    #[error("Failed to open undo log at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Undo log query failed: {0}")]
    QueryFailed(String),

    #[error("Undo log is locked by a panicked writer. Restart the application.")]
    Poisoned,

    #[error("No operations recorded for batch {batch_id}")]
    BatchNotFound { batch_id: String },

    #[error("Nothing to undo")]
    NothingToUndo,
}

impl From<rusqlite::Error> for UndoError {
    fn from(e: rusqlite::Error) -> Self {
        UndoError::QueryFailed(e.to_string())
    }
}

/// Errors from duplicate detection
#[derive(Error, Debug)]
pub enum DuplicateError {
    #[error("Failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Invalid similarity threshold: {value} (must be 0-64)")]
    InvalidThreshold { value: u32 },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Scan was cancelled")]
    Cancelled,
}

/// Errors from loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganizerError>;
