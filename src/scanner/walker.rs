//! Parallel file enumerator for monitored roots.
//!
//! Monitored inputs may be files or directories. Directories are walked
//! recursively by a small crossbeam worker pool; every regular file found is
//! reported exactly once, and the final list is sorted so callers see a
//! deterministic order regardless of thread scheduling.

#![allow(missing_docs)]

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;
use parking_lot::Mutex;
use serde::Serialize;

use crate::scanner::exclusion::ExclusionSet;

/// Hard stop for runaway nesting (e.g. symlink chains without inode support).
pub const MAX_WALK_DEPTH: usize = 256;

/// Walker configuration derived from `MonitorConfig`.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    pub follow_symlinks: bool,
    pub parallelism: usize,
    pub exclusions: ExclusionSet,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            parallelism: 1,
            exclusions: ExclusionSet::default(),
        }
    }
}

/// A path the walker could not enumerate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkIssue {
    pub path: PathBuf,
    pub details: String,
}

/// Result of enumerating all roots.
#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    /// Sorted, de-duplicated regular files.
    pub files: Vec<PathBuf>,
    pub issues: Vec<WalkIssue>,
}

/// Item in the internal work queue: (directory_path, depth).
type WorkItem = (PathBuf, usize);

enum Found {
    File(PathBuf),
    Issue(WalkIssue),
}

/// Enumerates regular files beneath monitored roots.
pub struct FileWalker {
    config: WalkerConfig,
}

impl FileWalker {
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// Enumerate every regular file reachable from `roots`.
    ///
    /// Root paths are resolved following symlinks. Missing roots and unreadable
    /// directories are reported as issues; they never abort the walk.
    pub fn collect(&self, roots: &[PathBuf]) -> WalkOutcome {
        let mut files = BTreeSet::new();
        let mut issues = Vec::new();
        let mut dirs = Vec::new();

        for root in roots {
            if self.config.exclusions.is_excluded(root) {
                continue;
            }
            match fs::metadata(root) {
                Ok(meta) if meta.is_file() => {
                    files.insert(root.clone());
                }
                Ok(meta) if meta.is_dir() => dirs.push((root.clone(), meta)),
                Ok(_) => issues.push(WalkIssue {
                    path: root.clone(),
                    details: "not a regular file or directory".to_string(),
                }),
                Err(err) if err.kind() == ErrorKind::NotFound => issues.push(WalkIssue {
                    path: root.clone(),
                    details: "path does not exist".to_string(),
                }),
                Err(err) => issues.push(WalkIssue {
                    path: root.clone(),
                    details: err.to_string(),
                }),
            }
        }

        if !dirs.is_empty() {
            for found in self.walk_dirs(dirs) {
                match found {
                    Found::File(path) => {
                        files.insert(path);
                    }
                    Found::Issue(issue) => issues.push(issue),
                }
            }
        }

        issues.sort_by(|a, b| a.path.cmp(&b.path));
        WalkOutcome {
            files: files.into_iter().collect(),
            issues,
        }
    }

    fn walk_dirs(&self, dirs: Vec<(PathBuf, fs::Metadata)>) -> Vec<Found> {
        let parallelism = self.config.parallelism.max(1);
        let (work_tx, work_rx) = channel::unbounded::<WorkItem>();
        let (result_tx, result_rx) = channel::unbounded::<Found>();
        let in_flight = AtomicUsize::new(0);
        let visited = Mutex::new(HashSet::new());

        for (dir, meta) in dirs {
            if let Some(key) = inode_key(&meta)
                && !visited.lock().insert(key)
            {
                continue;
            }
            in_flight.fetch_add(1, Ordering::Release);
            let _ = work_tx.send((dir, 0));
        }

        thread::scope(|scope| {
            for _ in 0..parallelism {
                let work_rx = work_rx.clone();
                let work_tx = work_tx.clone();
                let result_tx = result_tx.clone();
                let in_flight = &in_flight;
                let visited = &visited;
                let config = &self.config;
                scope.spawn(move || {
                    walker_thread(&work_rx, &work_tx, &result_tx, in_flight, visited, config);
                });
            }
            // Workers hold the only remaining senders; the result stream ends
            // once every worker has exited.
            drop(result_tx);
            result_rx.iter().collect()
        })
    }
}

fn walker_thread(
    work_rx: &channel::Receiver<WorkItem>,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<Found>,
    in_flight: &AtomicUsize,
    visited: &Mutex<HashSet<(u64, u64)>>,
    config: &WalkerConfig,
) {
    loop {
        match work_rx.recv_timeout(Duration::from_millis(20)) {
            Ok((dir, depth)) => {
                process_directory(&dir, depth, work_tx, result_tx, in_flight, visited, config);
                in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            Err(channel::RecvTimeoutError::Timeout) => {
                if in_flight.load(Ordering::Acquire) == 0 {
                    return;
                }
            }
            Err(channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Read one directory: emit files, enqueue subdirectories.
fn process_directory(
    dir: &Path,
    depth: usize,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<Found>,
    in_flight: &AtomicUsize,
    visited: &Mutex<HashSet<(u64, u64)>>,
    config: &WalkerConfig,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            let _ = result_tx.send(Found::Issue(WalkIssue {
                path: dir.to_path_buf(),
                details: format!("cannot read directory: {err}"),
            }));
            return;
        }
    };

    for entry_result in entries {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                let _ = result_tx.send(Found::Issue(WalkIssue {
                    path: dir.to_path_buf(),
                    details: format!("cannot read directory entry: {err}"),
                }));
                continue;
            }
        };

        let child = entry.path();
        if config.exclusions.is_excluded(&child) {
            continue;
        }

        let ft = match entry.file_type() {
            Ok(ft) => ft,
            Err(err) => {
                let _ = result_tx.send(Found::Issue(WalkIssue {
                    path: child,
                    details: format!("cannot determine file type: {err}"),
                }));
                continue;
            }
        };

        // File symlinks are always monitored through their target; the
        // policy only governs descent into linked directories.
        let (is_dir, is_file, meta) = if ft.is_symlink() {
            match fs::metadata(&child) {
                Ok(m) if m.is_dir() && !config.follow_symlinks => continue,
                Ok(m) => (m.is_dir(), m.is_file(), Some(m)),
                Err(err) => {
                    let _ = result_tx.send(Found::Issue(WalkIssue {
                        path: child,
                        details: format!("unresolvable symlink: {err}"),
                    }));
                    continue;
                }
            }
        } else {
            (ft.is_dir(), ft.is_file(), None)
        };

        if is_file {
            let _ = result_tx.send(Found::File(child));
        } else if is_dir {
            if depth + 1 > MAX_WALK_DEPTH {
                let _ = result_tx.send(Found::Issue(WalkIssue {
                    path: child,
                    details: format!("maximum walk depth {MAX_WALK_DEPTH} exceeded"),
                }));
                continue;
            }
            if config.follow_symlinks {
                let meta = meta.or_else(|| fs::metadata(&child).ok());
                if let Some(key) = meta.as_ref().and_then(inode_key)
                    && !visited.lock().insert(key)
                {
                    continue;
                }
            }
            in_flight.fetch_add(1, Ordering::Release);
            if work_tx.send((child, depth + 1)).is_err() {
                in_flight.fetch_sub(1, Ordering::Release);
            }
        }
    }
}

/// `(device, inode)` identity used to break directory cycles.
#[cfg(unix)]
fn inode_key(meta: &fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn inode_key(_meta: &fs::Metadata) -> Option<(u64, u64)> {
    None
}
