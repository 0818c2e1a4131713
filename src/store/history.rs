//! History store: append-only per-path timeline of observed fingerprints.
//!
//! The document is a JSON object mapping each path to its observations,
//! oldest first. Entries are only ever appended; nothing is rewritten or
//! removed. Every append is persisted before it returns.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::clock::format_check_time;
use crate::core::errors::Result;
use crate::fingerprint::fingerprinter::FileRecord;
use crate::store::atomic::{read_json, write_json_atomic};

/// One observation of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the observation was made (not a file timestamp).
    pub check_timestamp: String,
    pub file_modified: String,
    pub hash: String,
    pub size: u64,
    pub accessed: String,
}

impl HistoryEntry {
    pub fn new(record: &FileRecord, checked_at: NaiveDateTime) -> Self {
        Self {
            check_timestamp: format_check_time(checked_at),
            file_modified: record.modified.clone(),
            hash: record.hash.clone(),
            size: record.size,
            accessed: record.accessed.clone(),
        }
    }

    /// The file state this entry captured.
    pub fn record(&self) -> FileRecord {
        FileRecord {
            hash: self.hash.clone(),
            size: self.size,
            modified: self.file_modified.clone(),
            accessed: self.accessed.clone(),
        }
    }
}

/// Whether the entry seeded by the current baseline takes part in
/// hash-recurrence lookups.
///
/// With `Include` an untouched file always matches its own seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedPolicy {
    #[default]
    Include,
    Exclude,
}

impl fmt::Display for SeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
        })
    }
}

impl FromStr for SeedPolicy {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "include" => Ok(Self::Include),
            "exclude" => Ok(Self::Exclude),
            other => Err(format!(
                "unknown seed policy {other:?} (expected include or exclude)"
            )),
        }
    }
}

/// Per-path observation timelines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    timelines: BTreeMap<String, Vec<HistoryEntry>>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observations for `path`, oldest first. Empty if never observed.
    pub fn entries(&self, path: &str) -> &[HistoryEntry] {
        self.timelines.get(path).map_or(&[], Vec::as_slice)
    }

    pub fn len_for(&self, path: &str) -> usize {
        self.entries(path).len()
    }

    pub fn total_entries(&self) -> usize {
        self.timelines.values().map(Vec::len).sum()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.timelines.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    /// Whether `path` has ever been observed with `hash`.
    ///
    /// Linear in the length of the path's timeline.
    pub fn contains_hash(&self, path: &str, hash: &str) -> bool {
        self.entries(path).iter().any(|entry| entry.hash == hash)
    }

    /// Position of the entry seeded by the baseline that stored `seed`: the
    /// latest entry capturing exactly that record.
    pub fn seed_index(&self, path: &str, seed: &FileRecord) -> Option<usize> {
        self.entries(path)
            .iter()
            .rposition(|entry| entry.record() == *seed)
    }

    /// [`History::contains_hash`] with control over the current baseline's
    /// seed entry. Seeds of earlier baselines always take part.
    pub fn contains_hash_with(
        &self,
        path: &str,
        hash: &str,
        policy: SeedPolicy,
        seed: &FileRecord,
    ) -> bool {
        let skip = match policy {
            SeedPolicy::Include => None,
            SeedPolicy::Exclude => self.seed_index(path, seed),
        };
        self.entries(path)
            .iter()
            .enumerate()
            .any(|(index, entry)| Some(index) != skip && entry.hash == hash)
    }

    fn push(&mut self, path: &str, entry: HistoryEntry) {
        self.timelines.entry(path.to_string()).or_default().push(entry);
    }
}

/// File-backed history document.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the history; an absent document is an empty history.
    pub fn load(&self) -> Result<History> {
        Ok(read_json(&self.path, "history_load")?.unwrap_or_default())
    }

    /// Replace the persisted history with `history`.
    pub fn save(&self, history: &History) -> Result<()> {
        write_json_atomic(&self.path, history, "history_save")
    }

    /// Append one observation for `path` and persist the whole document.
    ///
    /// The in-memory entry is kept even if the save fails; the error is
    /// returned so the caller can abort.
    pub fn append(
        &self,
        history: &mut History,
        path: &str,
        record: &FileRecord,
        checked_at: NaiveDateTime,
    ) -> Result<()> {
        history.push(path, HistoryEntry::new(record, checked_at));
        self.save(history)
    }
}
