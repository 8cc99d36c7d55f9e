//! # Core Module
//!
//! The UI-agnostic organizing engine.
//!
//! ## Modules
//! - `rules` - User-defined rules that map files to categories and names
//! - `classify` - The classification record and strategies that produce it
//! - `duplicates` - Exact and perceptual duplicate detection
//! - `organize` - Plans, validation, conflict resolution and execution
//! - `backup` - Per-batch snapshots taken before anything moves
//! - `undo` - Persistent operation log and batch reversal
//! - `engine` - The `Organizer` facade tying everything together

pub mod backup;
pub mod classify;
pub mod duplicates;
pub mod engine;
pub mod organize;
pub mod rules;
pub mod undo;

// Re-export commonly used types
pub use classify::{Classification, Classifier};
pub use duplicates::{DuplicateDetectionResult, DuplicateDetector, DuplicateGroup};
pub use engine::Organizer;
pub use organize::{ExecutionResult, FileOperation, OperationKind, OrganizationPlan};
pub use rules::{OrganizationRule, RuleMatchResult, RuleMatcher};
pub use undo::{UndoManager, UndoResult};
