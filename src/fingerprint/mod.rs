//! Fingerprinting: digest algorithms and per-file content snapshots.

pub mod algorithm;
pub mod fingerprinter;
