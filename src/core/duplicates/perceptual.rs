//! Perceptual image hashing for near-duplicate detection.
//!
//! Uses a 64-bit gradient hash (8x8 grid). Two images are "similar" when
//! the Hamming distance between their hashes is at or below a threshold.

use crate::error::DuplicateError;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use std::path::Path;

/// Extensions considered for similar-image detection
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif"];

/// Bits in a hash produced by [`ImageFingerprinter`]
pub const HASH_BITS: u32 = 64;

/// Whether the path has a supported image extension (case-insensitive)
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// A perceptual hash value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFingerprint {
    bytes: Vec<u8>,
}

impl ImageFingerprint {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Number of differing bits
    pub fn distance(&self, other: &Self) -> u32 {
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// Similarity in 0.0-1.0
    pub fn similarity(&self, other: &Self) -> f64 {
        let bits = (self.bytes.len() * 8) as f64;
        if bits == 0.0 {
            return 1.0;
        }
        1.0 - self.distance(other) as f64 / bits
    }

    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Decodes images and computes their gradient hash
pub struct ImageFingerprinter {
    hasher: Hasher,
}

impl ImageFingerprinter {
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(8, 8)
            .hash_alg(HashAlg::Gradient)
            .to_hasher();
        Self { hasher }
    }

    pub fn fingerprint(&self, path: &Path) -> Result<ImageFingerprint, DuplicateError> {
        let image = image::open(path).map_err(|e| DuplicateError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let hash = self.hasher.hash_image(&image);
        Ok(ImageFingerprint::from_bytes(hash.as_bytes().to_vec()))
    }
}

impl Default for ImageFingerprinter {
    fn default() -> Self {
        Self::new()
    }
}
