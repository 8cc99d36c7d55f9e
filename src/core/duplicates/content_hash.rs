//! Content hashing for exact duplicate detection.
//!
//! Files are streamed in fixed-size chunks so memory stays flat no matter
//! how large they are. A cheap xxh3 fingerprint of the first 4 KiB is used
//! to split same-size candidates before paying for a full hash.

use super::types::ContentHashAlgorithm;
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use xxhash_rust::xxh3::xxh3_64;

/// Read buffer for full-content hashing (64 KiB)
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Bytes covered by the prefix fingerprint (4 KiB)
pub const PREFIX_SIZE: u64 = 4096;

/// Hash the complete contents of a file, returning lowercase hex.
pub fn hash_file(path: &Path, algorithm: ContentHashAlgorithm) -> io::Result<String> {
    let file = File::open(path)?;
    match algorithm {
        ContentHashAlgorithm::Sha256 => digest_reader::<Sha256, _>(file),
        ContentHashAlgorithm::Md5 => digest_reader::<Md5, _>(file),
    }
}

fn digest_reader<D: Digest, R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(to_hex(&hasher.finalize()))
}

/// xxh3 of the first [`PREFIX_SIZE`] bytes.
pub fn prefix_fingerprint(path: &Path) -> io::Result<u64> {
    let file = File::open(path)?;
    let mut buffer = Vec::with_capacity(PREFIX_SIZE as usize);
    file.take(PREFIX_SIZE).read_to_end(&mut buffer)?;
    Ok(xxh3_64(&buffer))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn sha256_matches_known_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();

        let hash = hash_file(&path, ContentHashAlgorithm::Sha256).unwrap();
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn md5_matches_known_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();

        let hash = hash_file(&path, ContentHashAlgorithm::Md5).unwrap();
        assert_eq!(hash, "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn hashes_files_larger_than_one_chunk() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.bin");
        let b = temp.path().join("b.bin");
        let mut content = vec![7u8; CHUNK_SIZE * 2 + 13];
        fs::write(&a, &content).unwrap();
        *content.last_mut().unwrap() = 8;
        fs::write(&b, &content).unwrap();

        let ha = hash_file(&a, ContentHashAlgorithm::Sha256).unwrap();
        let hb = hash_file(&b, ContentHashAlgorithm::Sha256).unwrap();
        assert_ne!(ha, hb);
    }

    #[test]
    fn prefix_ignores_bytes_past_four_kib() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.bin");
        let b = temp.path().join("b.bin");
        let mut content = vec![1u8; 8192];
        fs::write(&a, &content).unwrap();
        content[8000] = 2;
        fs::write(&b, &content).unwrap();

        assert_eq!(prefix_fingerprint(&a).unwrap(), prefix_fingerprint(&b).unwrap());
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(hash_file(&temp.path().join("nope"), ContentHashAlgorithm::Md5).is_err());
    }
}
