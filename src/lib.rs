#![forbid(unsafe_code)]

//! File integrity monitor (imon): records a baseline of file fingerprints
//! and detects removal, modification and reverted content.
//!
//! 1. **Baseline**: every monitored file is fingerprinted and recorded;
//!    each observation is also appended to a per-path history.
//! 2. **Check**: files are compared with the baseline; a digest that has
//!    been seen before for the same path raises a spoofing alert.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use integrity_monitor::prelude::*;
//!
//! # fn main() -> integrity_monitor::core::errors::Result<()> {
//! let config = Config::load(None)?;
//! let sink = AlertLog::new(&config.paths.alert_log, &config.alert_log);
//! let mut engine = BaselineEngine::new(
//!     EngineConfig::from_config(&config),
//!     Box::new(sink),
//!     Arc::new(SystemClock),
//! )?;
//! let report = engine.check_integrity()?;
//! println!("{} alerts", report.alert_count);
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod core;
pub mod engine;
pub mod fingerprint;
pub mod logger;
pub mod scanner;
pub mod store;
