//! Baseline engine: creates baselines and checks files against them.
//!
//! The engine owns the two stores, an injected alert sink and an injected
//! clock. Fingerprinting fans out over a small crossbeam worker pool, but all
//! history appends and alert writes happen on the calling thread, one at a
//! time, in baseline (path) order.

#![allow(missing_docs)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel as channel;
use serde::Serialize;

use crate::core::clock::Clock;
use crate::core::config::Config;
use crate::core::errors::{ImonError, Result};
use crate::engine::alert::Alert;
use crate::engine::classify::{Observation, classify};
use crate::fingerprint::algorithm::HashAlgorithm;
use crate::fingerprint::fingerprinter::{DEFAULT_CHUNK_SIZE, FileRecord, Fingerprinter};
use crate::logger::alert_log::AlertSink;
use crate::scanner::exclusion::ExclusionSet;
use crate::scanner::walker::{FileWalker, WalkIssue, WalkerConfig};
use crate::store::baseline::{Baseline, BaselineStore};
use crate::store::history::{History, HistoryEntry, HistoryStore, SeedPolicy};

/// Everything the engine needs, resolved from [`Config`] and CLI overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub baseline_location: PathBuf,
    pub history_location: PathBuf,
    pub hash_algorithm: HashAlgorithm,
    pub chunk_size: usize,
    pub parallelism: usize,
    pub follow_symlinks: bool,
    pub exclude_patterns: Vec<String>,
    pub seed_policy: SeedPolicy,
}

impl EngineConfig {
    /// Defaults for everything except the two store locations.
    pub fn new(baseline_location: impl Into<PathBuf>, history_location: impl Into<PathBuf>) -> Self {
        Self {
            baseline_location: baseline_location.into(),
            history_location: history_location.into(),
            hash_algorithm: HashAlgorithm::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallelism: 1,
            follow_symlinks: false,
            exclude_patterns: Vec::new(),
            seed_policy: SeedPolicy::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            baseline_location: config.paths.baseline_file.clone(),
            history_location: config.paths.history_file.clone(),
            hash_algorithm: config.monitor.hash_algorithm,
            chunk_size: config.monitor.chunk_size_bytes,
            parallelism: config.monitor.parallelism,
            follow_symlinks: config.monitor.follow_symlinks,
            exclude_patterns: config.monitor.exclude_patterns.clone(),
            seed_policy: config.monitor.spoof_seed_policy,
        }
    }
}

/// Result of [`BaselineEngine::create_baseline`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BaselineReport {
    pub files_recorded: usize,
    pub history_seeded: usize,
    pub walk_issues: Vec<WalkIssue>,
    /// `ReadFailed` alerts for files left out of the baseline.
    pub read_failures: Vec<Alert>,
}

/// Result of [`BaselineEngine::check_integrity`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub files_checked: usize,
    pub alerts: Vec<Alert>,
    /// Lines written to the alert log.
    pub alert_count: usize,
    /// Files that were removed or modified.
    pub violations_found: usize,
    pub history_appended: usize,
}

impl CheckReport {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.violations_found == 0
    }
}

/// Baseline creation and integrity checking over one baseline/history pair.
pub struct BaselineEngine {
    config: EngineConfig,
    fingerprinter: Fingerprinter,
    walker: FileWalker,
    baselines: BaselineStore,
    history: HistoryStore,
    sink: Box<dyn AlertSink>,
    clock: Arc<dyn Clock>,
}

impl BaselineEngine {
    /// Fails only if an exclusion pattern does not compile.
    pub fn new(
        config: EngineConfig,
        sink: Box<dyn AlertSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let walker = FileWalker::new(WalkerConfig {
            follow_symlinks: config.follow_symlinks,
            parallelism: config.parallelism.max(1),
            exclusions: ExclusionSet::new(&config.exclude_patterns)?,
        });
        Ok(Self {
            fingerprinter: Fingerprinter::new(config.hash_algorithm, config.chunk_size),
            walker,
            baselines: BaselineStore::new(&config.baseline_location),
            history: HistoryStore::new(&config.history_location),
            config,
            sink,
            clock,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn baseline_store(&self) -> &BaselineStore {
        &self.baselines
    }

    pub fn history_store(&self) -> &HistoryStore {
        &self.history
    }

    /// Where alerts go, as reported by the sink.
    pub fn alert_destination(&self) -> String {
        self.sink.describe()
    }

    /// Fingerprint everything under `paths` and replace the baseline.
    ///
    /// Every recorded file also gets a seed entry appended to its history.
    /// Files that cannot be read are alerted and left out; the previous
    /// baseline is replaced only after every file has been processed.
    pub fn create_baseline(&mut self, paths: &[PathBuf]) -> Result<BaselineReport> {
        if paths.is_empty() {
            return Err(ImonError::NoMonitoredPaths);
        }

        let mut history = self.history.load()?;
        for path in history.paths() {
            self.ensure_history_digests(&history, path)?;
        }

        let walk = self.walker.collect(paths);
        let fingerprinter = self.fingerprinter;
        let results = parallel_map(&walk.files, self.config.parallelism, |path| {
            fingerprinter.fingerprint(path)
        });

        let mut report = BaselineReport {
            walk_issues: walk.issues,
            ..BaselineReport::default()
        };
        let mut baseline = Baseline::new();
        for (path, result) in walk.files.iter().zip(results) {
            let key = path_key(path);
            match result {
                Ok(record) => {
                    self.history
                        .append(&mut history, &key, &record, self.clock.now())?;
                    report.history_seeded += 1;
                    baseline.insert(key, record);
                }
                Err(err) => {
                    let alert = Alert::ReadFailed {
                        path: key,
                        details: err.to_string(),
                    };
                    self.sink.record(self.clock.now(), &alert.log_message())?;
                    report.read_failures.push(alert);
                }
            }
        }

        self.baselines.save(&baseline)?;
        report.files_recorded = baseline.len();
        Ok(report)
    }

    /// Compare every baselined file with its current state.
    ///
    /// Alerts are written to the sink as they are raised. A missing baseline
    /// is [`ImonError::BaselineNotFound`] and writes nothing.
    pub fn check_integrity(&mut self) -> Result<CheckReport> {
        let baseline = self.baselines.load()?;
        let mut history = self.history.load()?;
        for (path, stored) in &baseline {
            self.ensure_digest("baseline", path, &stored.hash)?;
            self.ensure_history_digests(&history, path)?;
        }

        let entries: Vec<(&String, &FileRecord)> = baseline.iter().collect();
        let fingerprinter = self.fingerprinter;
        let observations = parallel_map(&entries, self.config.parallelism, |(path, _)| {
            observe(&fingerprinter, Path::new(path.as_str()))
        });

        let mut report = CheckReport {
            files_checked: entries.len(),
            ..CheckReport::default()
        };
        for ((path, stored), observation) in entries.into_iter().zip(observations) {
            let outcome = classify(path, stored, &observation, &history, self.config.seed_policy);
            for alert in outcome.alerts {
                self.sink.record(self.clock.now(), &alert.log_message())?;
                report.alert_count += 1;
                report.alerts.push(alert);
            }
            if outcome.violation {
                report.violations_found += 1;
            }
            if let Some(current) = outcome.append {
                self.history
                    .append(&mut history, path, &current, self.clock.now())?;
                report.history_appended += 1;
            }
        }
        Ok(report)
    }

    /// Recorded timeline for `path`, oldest first.
    pub fn history_for(&self, path: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self.history.load()?.entries(path).to_vec())
    }

    fn ensure_history_digests(&self, history: &History, path: &str) -> Result<()> {
        history
            .entries(path)
            .iter()
            .try_for_each(|entry| self.ensure_digest("history", path, &entry.hash))
    }

    fn ensure_digest(&self, document: &str, path: &str, hash: &str) -> Result<()> {
        let configured = self.config.hash_algorithm;
        if configured.matches_digest(hash) {
            return Ok(());
        }
        let details = match HashAlgorithm::from_hex_len(hash.len()) {
            Some(recorded) if recorded != configured => {
                format!("{document} digest was produced by {recorded}")
            }
            _ => format!("{document} digest {hash:?} is not a {configured} hex digest"),
        };
        Err(ImonError::AlgorithmMismatch {
            path: path.to_string(),
            configured,
            details,
        })
    }
}

/// Baseline and history key for a discovered path.
fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn observe(fingerprinter: &Fingerprinter, path: &Path) -> Observation {
    match fs::metadata(path) {
        Err(err) if err.kind() == ErrorKind::NotFound => return Observation::Missing,
        Err(err) => return Observation::Unreadable(ImonError::io(path, err).to_string()),
        Ok(_) => {}
    }
    match fingerprinter.fingerprint(path) {
        Ok(record) => Observation::Present(record),
        Err(err) => Observation::Unreadable(err.to_string()),
    }
}

/// Apply `f` to every item on up to `parallelism` threads, preserving order.
fn parallel_map<T, R, F>(items: &[T], parallelism: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = parallelism.min(items.len());
    if workers <= 1 {
        return items.iter().map(&f).collect();
    }

    let (job_tx, job_rx) = channel::unbounded::<usize>();
    let (result_tx, result_rx) = channel::unbounded::<(usize, R)>();
    for index in 0..items.len() {
        let _ = job_tx.send(index);
    }
    drop(job_tx);

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();
    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let f = &f;
            scope.spawn(move || {
                for index in job_rx {
                    if result_tx.send((index, f(&items[index]))).is_err() {
                        return;
                    }
                }
            });
        }
        drop(result_tx);
        for (index, result) in result_rx {
            slots[index] = Some(result);
        }
    });
    slots.into_iter().flatten().collect()
}
