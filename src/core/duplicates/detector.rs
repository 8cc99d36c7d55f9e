//! Exact and similar duplicate detection.

use super::cache::HashCache;
use super::content_hash::{hash_file, prefix_fingerprint};
use super::perceptual::{is_image, ImageFingerprint, ImageFingerprinter, HASH_BITS};
use super::types::{ContentHashAlgorithm, DuplicateDetectionResult, DuplicateGroup};
use crate::error::DuplicateError;
use crate::events::{null_sender, CancellationToken, DuplicateEvent, Event, EventSender};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Default max Hamming distance for two images to count as similar
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 10;

/// A file that passed the initial stat
#[derive(Debug, Clone)]
pub(super) struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl FileEntry {
    pub fn stat(path: &Path) -> Result<Self, DuplicateError> {
        let metadata = fs::metadata(path).map_err(|e| DuplicateError::Hash {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// Finds byte-identical files and perceptually similar images.
///
/// Exact detection narrows candidates in three passes: file size, an xxh3
/// fingerprint of the first 4 KiB, then a full content hash. Content hashes
/// are cached for the lifetime of the detector.
pub struct DuplicateDetector {
    algorithm: ContentHashAlgorithm,
    similarity_threshold: u32,
    pub(super) cache: HashCache,
    events: EventSender,
    cancel: CancellationToken,
}

impl DuplicateDetector {
    /// Create a detector. `similarity_threshold` is a Hamming distance (0-64).
    pub fn new(
        algorithm: ContentHashAlgorithm,
        similarity_threshold: u32,
    ) -> Result<Self, DuplicateError> {
        if similarity_threshold > HASH_BITS {
            return Err(DuplicateError::InvalidThreshold {
                value: similarity_threshold,
            });
        }
        Ok(Self {
            algorithm,
            similarity_threshold,
            cache: HashCache::new(),
            events: null_sender(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = sender;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn algorithm(&self) -> ContentHashAlgorithm {
        self.algorithm
    }

    pub fn similarity_threshold(&self) -> u32 {
        self.similarity_threshold
    }

    /// Number of cached content hashes
    pub fn cached_hashes(&self) -> usize {
        self.cache.len()
    }

    /// Group the given files into exact and/or similar duplicate sets.
    ///
    /// Unreadable files are skipped and reported in `errors`. Group members
    /// keep the order in which they were passed in.
    pub fn find_duplicates(
        &self,
        paths: &[PathBuf],
        detect_exact: bool,
        detect_similar: bool,
    ) -> Result<DuplicateDetectionResult, DuplicateError> {
        let start = Instant::now();
        let mut result = DuplicateDetectionResult::default();

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            if !seen.insert(path.as_path()) {
                continue;
            }
            match FileEntry::stat(path) {
                Ok(entry) if path.is_file() => entries.push(entry),
                Ok(_) => debug!("Skipping non-file {}", path.display()),
                Err(e) => {
                    warn!("{}", e);
                    result.errors.push(e.to_string());
                }
            }
        }

        result.files_scanned = entries.len();
        self.events.send(Event::Duplicate(DuplicateEvent::Started {
            total_files: entries.len(),
        }));
        info!("Checking {} files for duplicates", entries.len());

        if detect_exact {
            result.exact_duplicates = self.find_exact(&entries, &mut result.errors)?;
        }
        if detect_similar {
            result.similar_images = self.find_similar(&entries, &mut result.errors)?;
        }

        result.duration_ms = start.elapsed().as_millis() as u64;

        self.events.send(Event::Duplicate(DuplicateEvent::Completed {
            exact_groups: result.exact_duplicates.len(),
            similar_groups: result.similar_images.len(),
            wasted_bytes: result.wasted_space(),
        }));
        info!("{}", result.summary());

        Ok(result)
    }

    /// Walk directories (skipping hidden entries) and run detection over every file found.
    pub fn find_duplicates_in_dirs(
        &self,
        dirs: &[PathBuf],
        recursive: bool,
        detect_exact: bool,
        detect_similar: bool,
    ) -> Result<DuplicateDetectionResult, DuplicateError> {
        let mut files = Vec::new();

        for dir in dirs {
            if !dir.is_dir() {
                return Err(DuplicateError::DirectoryNotFound { path: dir.clone() });
            }

            let walker = WalkDir::new(dir)
                .follow_links(false)
                .max_depth(if recursive { usize::MAX } else { 1 })
                .sort_by_file_name();

            for entry in walker
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
            {
                if self.cancel.is_cancelled() {
                    return Err(DuplicateError::Cancelled);
                }
                match entry {
                    Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable entry: {}", e),
                }
            }
        }

        self.find_duplicates(&files, detect_exact, detect_similar)
    }

    /// Whether two files have identical contents
    pub fn compare_files(&self, a: &Path, b: &Path) -> Result<bool, DuplicateError> {
        let a = FileEntry::stat(a)?;
        let b = FileEntry::stat(b)?;
        if a.size != b.size {
            return Ok(false);
        }
        Ok(self.content_hash(&a)? == self.content_hash(&b)?)
    }

    /// Return the candidates whose contents match `file`.
    ///
    /// Candidates that cannot be read are skipped; `file` itself is never
    /// reported as its own duplicate.
    pub fn quick_check_duplicates(
        &self,
        file: &Path,
        candidates: &[PathBuf],
    ) -> Result<Vec<PathBuf>, DuplicateError> {
        let target = FileEntry::stat(file)?;
        let target_hash = self.content_hash(&target)?;

        let matches = candidates
            .par_iter()
            .filter(|c| c.as_path() != file)
            .filter_map(|c| FileEntry::stat(c).ok())
            .filter(|c| c.size == target.size)
            .filter(|c| {
                self.content_hash(c)
                    .map(|h| h == target_hash)
                    .unwrap_or(false)
            })
            .map(|c| c.path)
            .collect();

        Ok(matches)
    }

    /// Content hash of one file, served from cache when still valid
    pub fn hash_file(&self, path: &Path) -> Result<String, DuplicateError> {
        self.content_hash(&FileEntry::stat(path)?)
    }

    fn content_hash(&self, entry: &FileEntry) -> Result<String, DuplicateError> {
        if let Some(hash) = self.cache.get(&entry.path, entry.size, entry.modified) {
            return Ok(hash);
        }

        let hash = hash_file(&entry.path, self.algorithm).map_err(|e| DuplicateError::Hash {
            path: entry.path.clone(),
            source: e,
        })?;
        self.cache
            .insert(&entry.path, hash.clone(), entry.size, entry.modified);
        Ok(hash)
    }

    fn find_exact(
        &self,
        entries: &[FileEntry],
        errors: &mut Vec<String>,
    ) -> Result<Vec<DuplicateGroup>, DuplicateError> {
        let mut by_size: HashMap<u64, Vec<usize>> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            by_size.entry(entry.size).or_default().push(i);
        }
        let same_size: Vec<usize> = by_size
            .into_values()
            .filter(|group| group.len() >= 2)
            .flatten()
            .collect();
        debug!(
            "{} of {} files share a size with another file",
            same_size.len(),
            entries.len()
        );

        let prefixes: Vec<(usize, std::io::Result<u64>)> = same_size
            .par_iter()
            .map(|&i| (i, prefix_fingerprint(&entries[i].path)))
            .collect();
        if self.cancel.is_cancelled() {
            return Err(DuplicateError::Cancelled);
        }

        let mut by_prefix: HashMap<(u64, u64), Vec<usize>> = HashMap::new();
        for (i, prefix) in prefixes {
            match prefix {
                Ok(fp) => by_prefix.entry((entries[i].size, fp)).or_default().push(i),
                Err(e) => self.record_error(&entries[i].path, e.to_string(), errors),
            }
        }
        let mut to_hash: Vec<usize> = by_prefix
            .into_values()
            .filter(|group| group.len() >= 2)
            .flatten()
            .collect();
        to_hash.sort_unstable();

        let total = to_hash.len();
        let completed = AtomicUsize::new(0);
        let hashed: Vec<(usize, Result<String, DuplicateError>)> = to_hash
            .par_iter()
            .map(|&i| {
                if self.cancel.is_cancelled() {
                    return (i, Err(DuplicateError::Cancelled));
                }
                let hash = self.content_hash(&entries[i]);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if self.events.is_listening() {
                    self.events.send(Event::Duplicate(DuplicateEvent::Hashed {
                        completed: done,
                        total,
                        path: entries[i].path.clone(),
                    }));
                }
                (i, hash)
            })
            .collect();
        if self.cancel.is_cancelled() {
            return Err(DuplicateError::Cancelled);
        }

        let mut by_hash: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, hash) in hashed {
            match hash {
                Ok(hash) => by_hash.entry(hash).or_default().push(i),
                Err(e) => self.record_error(&entries[i].path, e.to_string(), errors),
            }
        }

        let mut groups: Vec<(usize, DuplicateGroup)> = by_hash
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .map(|(hash, mut members)| {
                members.sort_unstable();
                let first = members[0];
                let files = members.iter().map(|&i| entries[i].path.clone()).collect();
                (first, DuplicateGroup::exact(files, hash, entries[first].size))
            })
            .collect();
        groups.sort_by_key(|(first, _)| *first);

        Ok(groups.into_iter().map(|(_, g)| g).collect())
    }

    fn find_similar(
        &self,
        entries: &[FileEntry],
        errors: &mut Vec<String>,
    ) -> Result<Vec<DuplicateGroup>, DuplicateError> {
        let images: Vec<&FileEntry> = entries.iter().filter(|e| is_image(&e.path)).collect();
        debug!("Fingerprinting {} images", images.len());

        let fingerprints: Vec<(&FileEntry, Result<ImageFingerprint, DuplicateError>)> = images
            .par_iter()
            .map_init(ImageFingerprinter::new, |hasher, entry| {
                if self.cancel.is_cancelled() {
                    return (*entry, Err(DuplicateError::Cancelled));
                }
                (*entry, hasher.fingerprint(&entry.path))
            })
            .collect();
        if self.cancel.is_cancelled() {
            return Err(DuplicateError::Cancelled);
        }

        let mut hashed = Vec::with_capacity(fingerprints.len());
        for (entry, fingerprint) in fingerprints {
            match fingerprint {
                Ok(fp) => hashed.push((entry, fp)),
                Err(e) => self.record_error(&entry.path, e.to_string(), errors),
            }
        }

        Ok(cluster_similar(&hashed, self.similarity_threshold))
    }

    fn record_error(&self, path: &Path, message: String, errors: &mut Vec<String>) {
        warn!("Skipping {}: {}", path.display(), message);
        self.events.send(Event::Duplicate(DuplicateEvent::Error {
            path: path.to_path_buf(),
            message: message.clone(),
        }));
        errors.push(format!("{}: {}", path.display(), message));
    }
}

/// Greedy clustering: each unclustered image anchors a group of every later
/// unclustered image within `threshold` bits of it.
fn cluster_similar(hashed: &[(&FileEntry, ImageFingerprint)], threshold: u32) -> Vec<DuplicateGroup> {
    let mut clustered = vec![false; hashed.len()];
    let mut groups = Vec::new();

    for i in 0..hashed.len() {
        if clustered[i] {
            continue;
        }
        let (anchor, anchor_fp) = &hashed[i];
        let mut members = vec![i];
        let mut similarity_total = 0.0;

        for j in (i + 1)..hashed.len() {
            if clustered[j] {
                continue;
            }
            let fp = &hashed[j].1;
            if anchor_fp.distance(fp) <= threshold {
                members.push(j);
                similarity_total += anchor_fp.similarity(fp);
            }
        }

        if members.len() < 2 {
            continue;
        }
        for &m in &members {
            clustered[m] = true;
        }

        let similarity = similarity_total / (members.len() - 1) as f64;
        let files = members.iter().map(|&m| hashed[m].0.path.clone()).collect();
        groups.push(DuplicateGroup::similar(files, similarity, anchor.size));
    }

    groups
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}
