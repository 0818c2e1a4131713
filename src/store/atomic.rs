//! JSON document persistence with write-then-replace semantics.
//!
//! A document is serialized to a sibling temp file, synced, then renamed over
//! the target, so a crash mid-write leaves the previous document intact.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::errors::{ImonError, Result};

/// Read and parse a JSON document. `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path, context: &'static str) -> Result<Option<T>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(ImonError::persistence(path, err)),
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| ImonError::Serialization {
            context,
            details: format!("{}: {e}", path.display()),
        })
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T, context: &'static str) -> Result<()> {
    let mut data = serde_json::to_vec_pretty(value).map_err(|e| ImonError::Serialization {
        context,
        details: e.to_string(),
    })?;
    data.push(b'\n');

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| ImonError::persistence(parent, e))?;
    }

    let temp_path = temp_sibling(path);
    let mut file = File::create(&temp_path).map_err(|e| ImonError::persistence(&temp_path, e))?;
    file.write_all(&data)
        .and_then(|()| file.sync_all())
        .map_err(|e| ImonError::persistence(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ImonError::persistence(path, e)
    })
}

/// `baseline.json` → `baseline.json.tmp`.
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
