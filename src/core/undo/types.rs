//! Types for the undo log.

use crate::core::organize::OperationKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One persisted operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: i64,
    pub batch_id: String,
    /// Unix epoch seconds
    pub timestamp: f64,
    pub kind: OperationKind,
    pub source: PathBuf,
    pub target: PathBuf,
    pub file_hash: Option<String>,
    pub undone: bool,
}

/// Per-batch rollup for history listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: String,
    /// Timestamp of the batch's first operation
    pub started_at: f64,
    pub operation_count: usize,
    pub undone_count: usize,
}

impl BatchSummary {
    pub fn pending_count(&self) -> usize {
        self.operation_count.saturating_sub(self.undone_count)
    }

    pub fn is_fully_undone(&self) -> bool {
        self.pending_count() == 0
    }
}

/// Outcome of reversing a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoResult {
    pub batch_id: String,
    /// True iff no row failed
    pub success: bool,
    pub operations_undone: usize,
    pub operations_failed: usize,
    pub errors: Vec<String>,
}

impl UndoResult {
    pub(crate) fn new(batch_id: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            success: true,
            operations_undone: 0,
            operations_failed: 0,
            errors: Vec::new(),
        }
    }
}
