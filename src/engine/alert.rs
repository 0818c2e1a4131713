//! Alert kinds raised by integrity checks and baseline creation.

#![allow(missing_docs)]

use serde::Serialize;

/// A single finding about one monitored path.
///
/// Alerts are data, never errors. Each one becomes exactly one alert-log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    /// Baselined path no longer exists.
    FileRemoved { path: String, original_hash: String },
    /// Current digest differs from the baseline digest.
    FileModified {
        path: String,
        old_hash: String,
        new_hash: String,
    },
    /// Current digest has been recorded for this path before.
    SpoofingSuspected { path: String, hash: String },
    /// The file exists but could not be fingerprinted.
    ReadFailed { path: String, details: String },
}

impl Alert {
    pub fn path(&self) -> &str {
        match self {
            Self::FileRemoved { path, .. }
            | Self::FileModified { path, .. }
            | Self::SpoofingSuspected { path, .. }
            | Self::ReadFailed { path, .. } => path,
        }
    }

    /// Stable snake_case kind name.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FileRemoved { .. } => "file_removed",
            Self::FileModified { .. } => "file_modified",
            Self::SpoofingSuspected { .. } => "spoofing_suspected",
            Self::ReadFailed { .. } => "read_failed",
        }
    }

    /// Removal and modification are violations. Spoofing and read failures
    /// are reported but do not make a check unclean.
    pub const fn is_violation(&self) -> bool {
        matches!(self, Self::FileRemoved { .. } | Self::FileModified { .. })
    }

    /// Full message written to the alert log.
    pub fn log_message(&self) -> String {
        match self {
            Self::FileRemoved {
                path,
                original_hash,
            } => format!("Alert: File removed - {path} (original hash: {original_hash})"),
            Self::FileModified {
                path,
                old_hash,
                new_hash,
            } => format!("Alert: File modified - {path} (old hash: {old_hash}, new hash: {new_hash})"),
            Self::SpoofingSuspected { path, hash } => {
                format!("SPOOFING ALERT: Hash {hash} previously seen for {path}")
            }
            Self::ReadFailed { path, details } => {
                format!("Alert: File unreadable - {path} ({details})")
            }
        }
    }

    /// Short operator-facing message; digests are omitted or abbreviated.
    pub fn console_message(&self) -> String {
        match self {
            Self::FileRemoved { path, .. } => format!("Alert: File removed - {path}"),
            Self::FileModified { path, .. } => format!("Alert: File modified - {path}"),
            Self::SpoofingSuspected { path, hash } => format!(
                "SPOOFING ALERT: Hash {}... hash appeared before for {path}",
                short_hash(hash)
            ),
            Self::ReadFailed { path, details } => {
                format!("Alert: File unreadable - {path} ({details})")
            }
        }
    }
}

/// First eight characters of a digest.
fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
