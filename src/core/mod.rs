//! Core types: errors, configuration, clock.

pub mod clock;
pub mod config;
pub mod errors;
