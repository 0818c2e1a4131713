//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{ImonError, Result};
use crate::fingerprint::algorithm::HashAlgorithm;
use crate::fingerprint::fingerprinter::DEFAULT_CHUNK_SIZE;
use crate::store::history::SeedPolicy;

/// Full imon configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub monitor: MonitorConfig,
    pub alert_log: AlertLogConfig,
}

/// Store and log locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub baseline_file: PathBuf,
    pub history_file: PathBuf,
    pub alert_log: PathBuf,
}

/// What to monitor and how to fingerprint it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Files or directories used when `imon baseline` gets no paths.
    pub monitored_paths: Vec<PathBuf>,
    /// Shell-style globs; matching paths (and their subtrees) are skipped.
    pub exclude_patterns: Vec<String>,
    /// Descend into symlinked directories. File symlinks are always hashed.
    pub follow_symlinks: bool,
    pub hash_algorithm: HashAlgorithm,
    pub chunk_size_bytes: usize,
    pub parallelism: usize,
    /// Whether the baseline-seeded history entry counts toward spoof detection.
    pub spoof_seed_policy: SeedPolicy,
}

/// Alert log rotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlertLogConfig {
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[IMON-CONFIG] WARNING: HOME not set, falling back to /tmp for config path");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("imon").join("config.toml"),
            baseline_file: PathBuf::from("baseline.json"),
            history_file: PathBuf::from("history.json"),
            alert_log: PathBuf::from("integrity_log.txt"),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitored_paths: Vec::new(),
            exclude_patterns: Vec::new(),
            follow_symlinks: false,
            hash_algorithm: HashAlgorithm::Sha256,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            parallelism: std::thread::available_parallelism()
                .map_or(2, |n| n.get().saturating_div(2).max(1)),
            spoof_seed_policy: SeedPolicy::Include,
        }
    }
}

impl Default for AlertLogConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 5,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| ImonError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(ImonError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic FNV-1a hash of the effective config for display.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("IMON_BASELINE_FILE") {
            self.paths.baseline_file = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("IMON_HISTORY_FILE") {
            self.paths.history_file = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("IMON_ALERT_LOG") {
            self.paths.alert_log = PathBuf::from(raw);
        }

        if let Some(raw) = lookup("IMON_HASH_ALGORITHM") {
            self.monitor.hash_algorithm =
                raw.parse().map_err(|details: String| ImonError::ConfigParse {
                    context: "env",
                    details: format!("IMON_HASH_ALGORITHM={raw:?}: {details}"),
                })?;
        }
        if let Some(raw) = lookup("IMON_CHUNK_SIZE_BYTES") {
            self.monitor.chunk_size_bytes = parse_env("IMON_CHUNK_SIZE_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("IMON_PARALLELISM") {
            self.monitor.parallelism = parse_env("IMON_PARALLELISM", &raw)?;
        }
        if let Some(raw) = lookup("IMON_FOLLOW_SYMLINKS") {
            self.monitor.follow_symlinks = parse_env("IMON_FOLLOW_SYMLINKS", &raw)?;
        }
        if let Some(raw) = lookup("IMON_SPOOF_SEED_POLICY") {
            self.monitor.spoof_seed_policy =
                raw.parse().map_err(|details: String| ImonError::ConfigParse {
                    context: "env",
                    details: format!("IMON_SPOOF_SEED_POLICY={raw:?}: {details}"),
                })?;
        }

        Ok(())
    }

    /// Strip trailing slashes from monitored roots (root itself is kept).
    fn normalize_paths(&mut self) {
        for path in &mut self.monitor.monitored_paths {
            let s = path.to_string_lossy();
            if s.len() > 1
                && let Some(stripped) = s.strip_suffix('/')
            {
                *path = PathBuf::from(stripped);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.monitor.chunk_size_bytes == 0 {
            return Err(ImonError::InvalidConfig {
                details: "monitor.chunk_size_bytes must be >= 1".to_string(),
            });
        }
        if self.monitor.parallelism == 0 {
            return Err(ImonError::InvalidConfig {
                details: "monitor.parallelism must be >= 1".to_string(),
            });
        }
        if self.alert_log.max_size_bytes == 0 {
            return Err(ImonError::InvalidConfig {
                details: "alert_log.max_size_bytes must be > 0".to_string(),
            });
        }
        if self.alert_log.max_rotated_files == 0 {
            return Err(ImonError::InvalidConfig {
                details: "alert_log.max_rotated_files must be >= 1".to_string(),
            });
        }

        let p = &self.paths;
        for (a_name, a, b_name, b) in [
            ("baseline_file", &p.baseline_file, "history_file", &p.history_file),
            ("baseline_file", &p.baseline_file, "alert_log", &p.alert_log),
            ("history_file", &p.history_file, "alert_log", &p.alert_log),
        ] {
            if a == b {
                return Err(ImonError::InvalidConfig {
                    details: format!(
                        "paths.{a_name} and paths.{b_name} must differ (both {})",
                        a.display()
                    ),
                });
            }
        }

        for pattern in &self.monitor.exclude_patterns {
            crate::scanner::exclusion::validate_glob_pattern(pattern)?;
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| ImonError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
