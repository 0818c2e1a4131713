//! Injected wall-clock source for check timestamps and alert-line prefixes.

use chrono::{Local, NaiveDateTime};

/// Layout used for check timestamps and alert-log prefixes.
pub const CHECK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of "now" for observation records.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

/// Reads the host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Render a timestamp with [`CHECK_TIME_FORMAT`].
pub fn format_check_time(at: NaiveDateTime) -> String {
    at.format(CHECK_TIME_FORMAT).to_string()
}
