//! # Duplicates Module
//!
//! Finds byte-identical files and visually similar images, and removes
//! redundant copies on request.
//!
//! ## Exact duplicates
//! Candidates are narrowed by size, then by an xxh3 fingerprint of the
//! first 4 KiB, and only then fully hashed (SHA-256 or MD5) in parallel.
//!
//! ## Similar images
//! Images are fingerprinted with a 64-bit gradient hash and clustered
//! greedily by Hamming distance.
//!
//! ## Example
//!
//! ```rust,ignore
//! use file_organizer::core::duplicates::{ContentHashAlgorithm, DuplicateDetector};
//!
//! let detector = DuplicateDetector::new(ContentHashAlgorithm::Sha256, 10)?;
//! let result = detector.find_duplicates_in_dirs(&[dir], true, true, true)?;
//! println!("{}", result.summary());
//! ```

mod cache;
mod content_hash;
mod deletion;
mod detector;
mod perceptual;
mod types;

pub use cache::HashCache;
pub use content_hash::{hash_file, prefix_fingerprint, CHUNK_SIZE, PREFIX_SIZE};
pub use detector::{DuplicateDetector, DEFAULT_SIMILARITY_THRESHOLD};
pub use perceptual::{is_image, ImageFingerprint, ImageFingerprinter, IMAGE_EXTENSIONS};
pub use types::{
    ContentHashAlgorithm, DeletionReport, DuplicateDetectionResult, DuplicateGroup, DuplicateType,
};
