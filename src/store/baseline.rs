//! Baseline store: the reference fingerprint for every monitored path.
//!
//! Each baseline creation fully replaces the previous document. Keys are the
//! path strings exactly as discovered, and the map is ordered so the
//! serialized document is stable for identical inputs.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{ImonError, Result};
use crate::fingerprint::fingerprinter::FileRecord;
use crate::store::atomic::{read_json, write_json_atomic};

/// Path → reference [`FileRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Baseline {
    records: BTreeMap<String, FileRecord>,
}

impl Baseline {
    /// Empty baseline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path`, replacing any previous record for it.
    pub fn insert(&mut self, path: impl Into<String>, record: FileRecord) {
        self.records.insert(path.into(), record);
    }

    /// Reference record for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    /// Entries in path order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, FileRecord> {
        self.records.iter()
    }

    /// Number of baselined paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is baselined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a Baseline {
    type Item = (&'a String, &'a FileRecord);
    type IntoIter = btree_map::Iter<'a, String, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// File-backed baseline document.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    /// Store persisted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a baseline document exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the baseline. A missing document is [`ImonError::BaselineNotFound`].
    pub fn load(&self) -> Result<Baseline> {
        read_json(&self.path, "baseline_load")?.ok_or_else(|| ImonError::BaselineNotFound {
            path: self.path.clone(),
        })
    }

    /// Overwrite the persisted baseline with `baseline`.
    pub fn save(&self, baseline: &Baseline) -> Result<()> {
        write_json_atomic(&self.path, baseline, "baseline_save")
    }
}
