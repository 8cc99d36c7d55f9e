//! # Undo Module
//!
//! Every executed operation is appended to a SQLite log (`operations`
//! table, WAL mode). [`UndoManager`] replays a batch's rows in reverse to
//! put files back where they came from.

mod manager;
mod repository;
mod types;

pub use manager::UndoManager;
pub use repository::UndoLog;
pub use types::{BatchSummary, OperationRecord, UndoResult};
