//! Integrity engine: alert model, pure classification and orchestration.

pub mod alert;
pub mod classify;
pub mod monitor;

pub use alert::Alert;
pub use classify::{Classification, Observation, classify};
pub use monitor::{BaselineEngine, BaselineReport, CheckReport, EngineConfig};

#[cfg(test)]
mod test_properties;
