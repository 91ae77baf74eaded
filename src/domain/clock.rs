//! Time source abstraction
//!
//! Services read the current time through [`Clock`] so that expiry and
//! rate-limit windows can be driven deterministically in tests.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

#[cfg(test)]
pub use manual::ManualClock;

/// Source of the current time
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
