//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use integrity_monitor::prelude::*;
//! ```

// Core
pub use crate::core::clock::{Clock, FixedClock, SystemClock};
pub use crate::core::config::Config;
pub use crate::core::errors::{ImonError, Result};

// Engine
pub use crate::engine::{
    Alert, BaselineEngine, BaselineReport, CheckReport, EngineConfig, Observation, classify,
};

// Fingerprint
pub use crate::fingerprint::algorithm::HashAlgorithm;
pub use crate::fingerprint::fingerprinter::{FileRecord, Fingerprinter};

// Logger
pub use crate::logger::alert_log::{AlertLog, AlertSink, MemoryAlertSink};

// Scanner
pub use crate::scanner::exclusion::ExclusionSet;
pub use crate::scanner::walker::{FileWalker, WalkerConfig};

// Store
pub use crate::store::baseline::{Baseline, BaselineStore};
pub use crate::store::history::{History, HistoryEntry, HistoryStore, SeedPolicy};
