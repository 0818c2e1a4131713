//! Persisted documents: baseline snapshot and append-only history.

pub mod atomic;
pub mod baseline;
pub mod history;
