//! In-memory content hash cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;
use tracing::warn;

#[derive(Debug, Clone)]
struct CachedHash {
    hash: String,
    size: u64,
    modified: Option<SystemTime>,
}

/// Content hashes keyed by path, shared across rayon workers.
///
/// An entry is only served while the file's size and modification time
/// still match what was recorded when it was hashed.
#[derive(Debug, Default)]
pub struct HashCache {
    entries: RwLock<HashMap<PathBuf, CachedHash>>,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path, size: u64, modified: Option<SystemTime>) -> Option<String> {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(_) => {
                warn!("Hash cache lock poisoned; ignoring cache");
                return None;
            }
        };

        entries
            .get(path)
            .filter(|e| e.size == size && e.modified == modified)
            .map(|e| e.hash.clone())
    }

    pub fn insert(&self, path: &Path, hash: String, size: u64, modified: Option<SystemTime>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                path.to_path_buf(),
                CachedHash {
                    hash,
                    size,
                    modified,
                },
            );
        }
    }

    pub fn remove(&self, path: &Path) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(path);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
