//! SQLite-backed append-only log of executed operations.

use super::types::{BatchSummary, OperationRecord};
use crate::core::organize::OperationKind;
use crate::error::UndoError;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const SELECT_COLUMNS: &str =
    "id, batch_id, timestamp, operation_type, source_path, target_path, file_hash, undone";

/// Durable record of every operation, the source of truth for undo.
///
/// Writes go through one mutex-guarded connection, so row inserts and
/// undone-flag updates for a batch never interleave.
pub struct UndoLog {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl UndoLog {
    /// Open or create the log at `path`
    pub fn open(path: &Path) -> Result<Self, UndoError> {
        let open_failed = |reason: String| UndoError::OpenFailed {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| open_failed(e.to_string()))?;
        }

        let conn = Connection::open(path).map_err(|e| open_failed(e.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| open_failed(e.to_string()))?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// A throwaway log, mostly for tests and dry runs
    pub fn open_in_memory() -> Result<Self, UndoError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> Result<Self, UndoError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS operations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id TEXT NOT NULL,
                timestamp REAL NOT NULL,
                operation_type TEXT NOT NULL,
                source_path TEXT NOT NULL,
                target_path TEXT NOT NULL,
                file_hash TEXT,
                undone BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_operations_batch ON operations(batch_id);
            CREATE INDEX IF NOT EXISTS idx_operations_timestamp ON operations(timestamp);
            CREATE INDEX IF NOT EXISTS idx_operations_undone ON operations(undone);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, UndoError> {
        self.conn.lock().map_err(|_| UndoError::Poisoned)
    }

    /// Append one executed operation. Returns the new row id.
    pub fn record_operation(
        &self,
        batch_id: &str,
        kind: OperationKind,
        source: &Path,
        target: &Path,
        file_hash: Option<&str>,
    ) -> Result<i64, UndoError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO operations
             (batch_id, timestamp, operation_type, source_path, target_path, file_hash)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                batch_id,
                now_secs(),
                kind.as_str(),
                source.to_string_lossy().into_owned(),
                target.to_string_lossy().into_owned(),
                file_hash,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Recorded {} #{} in batch {}", kind, id, batch_id);
        Ok(id)
    }

    /// Every row of a batch, oldest first
    pub fn get_batch_operations(&self, batch_id: &str) -> Result<Vec<OperationRecord>, UndoError> {
        self.query_records(
            &format!(
                "SELECT {} FROM operations WHERE batch_id = ? ORDER BY timestamp ASC, id ASC",
                SELECT_COLUMNS
            ),
            batch_id,
        )
    }

    /// Rows of a batch not yet undone, newest first
    pub fn pending_operations(&self, batch_id: &str) -> Result<Vec<OperationRecord>, UndoError> {
        self.query_records(
            &format!(
                "SELECT {} FROM operations WHERE batch_id = ? AND undone = 0
                 ORDER BY timestamp DESC, id DESC",
                SELECT_COLUMNS
            ),
            batch_id,
        )
    }

    fn query_records(&self, sql: &str, batch_id: &str) -> Result<Vec<OperationRecord>, UndoError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map([batch_id], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn batch_exists(&self, batch_id: &str) -> Result<bool, UndoError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM operations WHERE batch_id = ?",
            [batch_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn mark_undone(&self, id: i64) -> Result<(), UndoError> {
        let conn = self.lock()?;
        conn.execute("UPDATE operations SET undone = 1 WHERE id = ?", [id])?;
        Ok(())
    }

    /// Most recent batch that still has at least one row to undo
    pub fn latest_pending_batch(&self) -> Result<Option<String>, UndoError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT batch_id FROM operations WHERE undone = 0
             ORDER BY timestamp DESC, id DESC LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(batch_id) => Ok(Some(batch_id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Batches, newest first
    pub fn get_history(&self, limit: usize) -> Result<Vec<BatchSummary>, UndoError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT batch_id, MIN(timestamp) AS started, COUNT(*), SUM(undone)
             FROM operations
             GROUP BY batch_id
             ORDER BY started DESC
             LIMIT ?",
        )?;

        let summaries = stmt
            .query_map([limit as i64], |row| {
                Ok(BatchSummary {
                    batch_id: row.get(0)?,
                    started_at: row.get(1)?,
                    operation_count: row.get::<_, i64>(2)? as usize,
                    undone_count: row.get::<_, Option<i64>>(3)?.unwrap_or(0) as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    /// Delete rows older than `older_than_days`. Returns rows removed.
    pub fn cleanup_history(&self, older_than_days: u32) -> Result<usize, UndoError> {
        let cutoff = now_secs() - f64::from(older_than_days) * 86_400.0;
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM operations WHERE timestamp < ?", [cutoff])?;
        debug!("Removed {} undo rows older than {} days", removed, older_than_days);
        Ok(removed)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<OperationRecord> {
    let kind: String = row.get(3)?;
    let source: String = row.get(4)?;
    let target: String = row.get(5)?;

    Ok(OperationRecord {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        timestamp: row.get(2)?,
        kind: OperationKind::parse(&kind).unwrap_or_default(),
        source: PathBuf::from(source),
        target: PathBuf::from(target),
        file_hash: row.get(6)?,
        undone: row.get(7)?,
    })
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
