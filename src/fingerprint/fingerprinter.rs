//! File fingerprinting: chunked content digest plus size and timestamps.
//!
//! The fingerprinter is stateless. It reads the entire file through a bounded
//! buffer, so memory use is independent of file size, then captures metadata
//! after the read completes. Reading may bump the access time on filesystems
//! that track it; that is accepted.

#![allow(missing_docs)]

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::core::errors::{ImonError, Result};
use crate::fingerprint::algorithm::HashAlgorithm;

/// Default read buffer size.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// `ctime(3)`-style rendering used for file timestamps.
pub const FILE_TIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Snapshot of one file at one point in time.
///
/// Timestamps are stored as rendered strings and written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub hash: String,
    pub size: u64,
    pub modified: String,
    pub accessed: String,
}

/// Computes [`FileRecord`]s with a fixed digest algorithm.
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter {
    algorithm: HashAlgorithm,
    chunk_size: usize,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(HashAlgorithm::default(), DEFAULT_CHUNK_SIZE)
    }
}

impl Fingerprinter {
    /// A zero chunk size is clamped to one byte.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, chunk_size: usize) -> Self {
        Self {
            algorithm,
            chunk_size: chunk_size.max(1),
        }
    }

    #[must_use]
    pub const fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fingerprint the regular file at `path` (symlinks are followed).
    pub fn fingerprint(&self, path: &Path) -> Result<FileRecord> {
        let meta = fs::metadata(path).map_err(|e| ImonError::io(path, e))?;
        if !meta.is_file() {
            return Err(ImonError::NotRegularFile {
                path: path.to_path_buf(),
            });
        }

        let mut file = File::open(path).map_err(|e| ImonError::io(path, e))?;
        let mut hasher = self.algorithm.hasher();
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(ImonError::io(path, e)),
            }
        }

        let meta = file.metadata().map_err(|e| ImonError::io(path, e))?;
        Ok(FileRecord {
            hash: hasher.finalize_hex(),
            size: meta.len(),
            modified: format_file_time(meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)),
            accessed: format_file_time(meta.accessed().unwrap_or(SystemTime::UNIX_EPOCH)),
        })
    }
}

/// Render a filesystem timestamp in local time, second resolution.
pub fn format_file_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format(FILE_TIME_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn identical_content_yields_identical_hash() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", b"same bytes");
        let b = write(&dir, "b.txt", b"same bytes");
        let fp = Fingerprinter::default();
        assert_eq!(
            fp.fingerprint(&a).unwrap().hash,
            fp.fingerprint(&b).unwrap().hash
        );
    }

    #[test]
    fn different_content_yields_different_hash() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", b"abc");
        let b = write(&dir, "b.txt", b"abcd");
        let fp = Fingerprinter::default();
        assert_ne!(
            fp.fingerprint(&a).unwrap().hash,
            fp.fingerprint(&b).unwrap().hash
        );
    }

    #[test]
    fn record_carries_size_and_known_digest() {
        let dir = TempDir::new().unwrap();
        let f = write(&dir, "f", b"abc");
        let record = Fingerprinter::default().fingerprint(&f).unwrap();
        assert_eq!(record.size, 3);
        assert_eq!(record.hash, HashAlgorithm::Sha256.digest_hex(b"abc"));
    }

    #[test]
    fn chunk_size_does_not_change_digest() {
        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let f = write(&dir, "big.bin", &content);
        let expected = HashAlgorithm::Sha256.digest_hex(&content);
        for chunk in [1, 7, 4096, 65_536] {
            let record = Fingerprinter::new(HashAlgorithm::Sha256, chunk)
                .fingerprint(&f)
                .unwrap();
            assert_eq!(record.hash, expected, "chunk size {chunk}");
        }
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        assert_eq!(Fingerprinter::new(HashAlgorithm::Sha256, 0).chunk_size(), 1);
    }

    #[test]
    fn missing_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Fingerprinter::default()
            .fingerprint(&dir.path().join("absent"))
            .unwrap_err();
        assert_eq!(err.code(), "IMON-3002");
    }

    #[test]
    fn directory_is_not_a_regular_file() {
        let dir = TempDir::new().unwrap();
        let err = Fingerprinter::default().fingerprint(dir.path()).unwrap_err();
        assert!(matches!(err, ImonError::NotRegularFile { .. }));
    }

    #[test]
    fn modified_time_uses_ctime_layout() {
        let dir = TempDir::new().unwrap();
        let f = write(&dir, "f", b"abc");
        let pinned = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        filetime::set_file_mtime(&f, filetime::FileTime::from_system_time(pinned)).unwrap();

        let record = Fingerprinter::default().fingerprint(&f).unwrap();
        assert_eq!(record.modified, format_file_time(pinned));
        assert!(record.modified.ends_with("2023"), "got {}", record.modified);
    }

    #[test]
    fn sha512_fingerprint_uses_longer_digest() {
        let dir = TempDir::new().unwrap();
        let f = write(&dir, "f", b"abc");
        let record = Fingerprinter::new(HashAlgorithm::Sha512, 16)
            .fingerprint(&f)
            .unwrap();
        assert_eq!(record.hash.len(), 128);
    }
}
