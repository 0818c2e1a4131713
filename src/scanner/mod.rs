//! File discovery: recursive walker and exclusion globs.

pub mod exclusion;
pub mod walker;
