//! Time source abstraction
//!
//! Services read "now" through [`Clock`] so entry/exit timestamps and fare
//! estimates can be pinned in tests.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by `Utc::now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
///
/// Used to simulate parked durations without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    time: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `time`
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut time = self.time.lock();
        *time += by;
    }

    /// Jump to an absolute instant
    pub fn set(&self, time: DateTime<Utc>) {
        *self.time.lock() = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.lock()
    }
}
