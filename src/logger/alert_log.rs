//! Alert log: append-only text lines, one per alert.
//!
//! Each line is `<YYYY-mm-dd HH:MM:SS> - <message>`, assembled in memory and
//! written with a single `write_all` so a concurrent `tail -f` never sees a
//! partial line. The file is opened on first use; a run that raises no alerts
//! never creates it. Every line is flushed before `record` returns.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::Mutex;

use crate::core::clock::format_check_time;
use crate::core::config::AlertLogConfig;
use crate::core::errors::{ImonError, Result};

/// Destination for alert lines.
pub trait AlertSink: Send {
    /// Durably record one alert message observed at `at`.
    fn record(&mut self, at: NaiveDateTime, message: &str) -> Result<()>;

    /// Human-readable name of the destination, for summaries.
    fn describe(&self) -> String;
}

/// Render one alert line, newline included.
pub fn format_line(at: NaiveDateTime, message: &str) -> String {
    format!("{} - {message}\n", format_check_time(at))
}

/// File-backed alert log with size-based rotation.
pub struct AlertLog {
    path: PathBuf,
    max_size_bytes: u64,
    max_rotated_files: u32,
    writer: Option<BufWriter<File>>,
    bytes_written: u64,
}

impl AlertLog {
    pub fn new(path: impl Into<PathBuf>, config: &AlertLogConfig) -> Self {
        Self {
            path: path.into(),
            max_size_bytes: config.max_size_bytes,
            max_rotated_files: config.max_rotated_files.max(1),
            writer: None,
            bytes_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let len = line.len() as u64;
        if self.writer.is_none() {
            self.open()?;
        }
        if self.bytes_written > 0 && self.bytes_written + len > self.max_size_bytes {
            self.rotate()?;
        }

        let path = &self.path;
        let writer = match self.writer.as_mut() {
            Some(w) => w,
            None => {
                return Err(ImonError::Runtime {
                    details: format!("alert log {} is not open", path.display()),
                });
            }
        };
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| ImonError::persistence(path, e))?;
        self.bytes_written += len;
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        let (file, size) = open_append(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        self.bytes_written = size;
        Ok(())
    }

    /// `log` → `log.1`, `log.1` → `log.2`, … dropping the oldest.
    fn rotate(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush().map_err(|e| ImonError::persistence(&self.path, e))?;
        }

        let oldest = rotated_name(&self.path, self.max_rotated_files);
        let _ = fs::remove_file(&oldest);
        for i in (1..self.max_rotated_files).rev() {
            let from = rotated_name(&self.path, i);
            if from.exists() {
                fs::rename(&from, rotated_name(&self.path, i + 1))
                    .map_err(|e| ImonError::persistence(&from, e))?;
            }
        }
        fs::rename(&self.path, rotated_name(&self.path, 1))
            .map_err(|e| ImonError::persistence(&self.path, e))?;

        self.open()
    }
}

impl AlertSink for AlertLog {
    fn record(&mut self, at: NaiveDateTime, message: &str) -> Result<()> {
        self.write_line(&format_line(at, message))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Open for append, creating parent directories. Returns the current size.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| ImonError::persistence(parent, e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ImonError::persistence(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| ImonError::persistence(path, e))?
        .len();
    Ok((file, size))
}

/// `integrity_log.txt` + 2 → `integrity_log.txt.2`.
pub fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryAlertSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded lines without trailing newlines.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl AlertSink for MemoryAlertSink {
    fn record(&mut self, at: NaiveDateTime, message: &str) -> Result<()> {
        let line = format_line(at, message);
        self.lines.lock().push(line.trim_end().to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
