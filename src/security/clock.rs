//! Time source for challenge generation and expiry.
//!
//! Every admission attempt reads the clock exactly once and threads that
//! instant through cache lookup and replay check.

use std::fmt;
use std::time::SystemTime;

/// Wall-clock source.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;
}

/// The operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Seconds since the unix epoch, saturating at zero for pre-epoch times.
pub fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use super::Clock;
    use parking_lot::Mutex;
    use std::time::{Duration, SystemTime};

    /// Clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<SystemTime>,
    }

    impl ManualClock {
        pub fn at_unix(secs: u64) -> Self {
            Self {
                now: Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
            }
        }

        pub fn advance(&self, by: Duration) {
            *self.now.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> SystemTime {
            *self.now.lock()
        }
    }
}
