//! Digest algorithm selection and streaming digest state.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

/// Content digest used for a baseline/history pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub const ALL: [Self; 2] = [Self::Sha256, Self::Sha512];

    /// Length of the lower-case hex rendering of a digest.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Whether `hex` could have been produced by this algorithm.
    #[must_use]
    pub fn matches_digest(self, hex: &str) -> bool {
        hex.len() == self.hex_len() && hex.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Algorithm whose digests have this hex length, if any.
    #[must_use]
    pub fn from_hex_len(len: usize) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.hex_len() == len)
    }

    /// Start a fresh streaming digest.
    #[must_use]
    pub fn hasher(self) -> StreamingDigest {
        match self {
            Self::Sha256 => StreamingDigest::Sha256(Sha256::new()),
            Self::Sha512 => StreamingDigest::Sha512(Sha512::new()),
        }
    }

    /// One-shot digest of an in-memory buffer.
    #[must_use]
    pub fn digest_hex(self, bytes: &[u8]) -> String {
        let mut hasher = self.hasher();
        hasher.update(bytes);
        hasher.finalize_hex()
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            other => Err(format!("unknown hash algorithm {other:?} (expected sha256 or sha512)")),
        }
    }
}

/// Incremental digest state fed chunk by chunk.
pub enum StreamingDigest {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl StreamingDigest {
    pub fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(chunk),
            Self::Sha512(h) => h.update(chunk),
        }
    }

    #[must_use]
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => hex_lower(&h.finalize()),
            Self::Sha512(h) => hex_lower(&h.finalize()),
        }
    }
}

/// Format digest bytes as a lower-case hex string.
pub fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}
