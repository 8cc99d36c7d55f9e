//! # Backup Module
//!
//! Snapshots source files before a batch mutates anything, and manages the
//! resulting `backup_<YYYYMMDD_HHMMSS>_<batch8>` directories.

mod manager;
mod types;

pub use manager::BackupManager;
pub use types::{BackupInfo, BackupSnapshot, BackupStrategy};
