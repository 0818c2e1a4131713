//! IMON-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fingerprint::algorithm::HashAlgorithm;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, ImonError>;

/// Coarse failure class an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or inconsistent configuration; abort early.
    Configuration,
    /// A required persisted document is absent.
    NotFound,
    /// A monitored file could not be read; recovered per file.
    Io,
    /// A store location could not be read or written; fatal to the operation.
    Persistence,
}

/// Top-level error type for the integrity monitor.
#[derive(Debug, Error)]
pub enum ImonError {
    #[error("[IMON-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[IMON-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[IMON-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[IMON-1004] no monitored paths supplied")]
    NoMonitoredPaths,

    #[error(
        "[IMON-1005] digest algorithm mismatch for {path}: configured {configured}, {details}"
    )]
    AlgorithmMismatch {
        path: String,
        configured: HashAlgorithm,
        details: String,
    },

    #[error("[IMON-2001] baseline not found at {path}; create a baseline first")]
    BaselineNotFound { path: PathBuf },

    #[error("[IMON-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[IMON-2102] store failure at {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[IMON-3001] permission denied for {path}")]
    PermissionDenied { path: PathBuf },

    #[error("[IMON-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[IMON-3003] not a regular file: {path}")]
    NotRegularFile { path: PathBuf },

    #[error("[IMON-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl ImonError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "IMON-1001",
            Self::MissingConfig { .. } => "IMON-1002",
            Self::ConfigParse { .. } => "IMON-1003",
            Self::NoMonitoredPaths => "IMON-1004",
            Self::AlgorithmMismatch { .. } => "IMON-1005",
            Self::BaselineNotFound { .. } => "IMON-2001",
            Self::Serialization { .. } => "IMON-2101",
            Self::Persistence { .. } => "IMON-2102",
            Self::PermissionDenied { .. } => "IMON-3001",
            Self::Io { .. } => "IMON-3002",
            Self::NotRegularFile { .. } => "IMON-3003",
            Self::Runtime { .. } => "IMON-3900",
        }
    }

    /// Failure class used to decide between per-file recovery and aborting.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig { .. }
            | Self::MissingConfig { .. }
            | Self::ConfigParse { .. }
            | Self::NoMonitoredPaths
            | Self::AlgorithmMismatch { .. } => ErrorCategory::Configuration,
            Self::BaselineNotFound { .. } => ErrorCategory::NotFound,
            Self::Serialization { .. } | Self::Persistence { .. } => ErrorCategory::Persistence,
            Self::PermissionDenied { .. }
            | Self::Io { .. }
            | Self::NotRegularFile { .. }
            | Self::Runtime { .. } => ErrorCategory::Io,
        }
    }

    /// Convenience constructor for IO errors on a monitored path.
    ///
    /// `PermissionDenied` is folded into its own variant.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied { path };
        }
        Self::Io { path, source }
    }

    /// Convenience constructor for failures on a store location.
    #[must_use]
    pub fn persistence(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for ImonError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for ImonError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
