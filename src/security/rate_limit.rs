//! Rate limiting for admission attempts.
//!
//! Each uid gets its own governor token bucket, refilled at
//! `attempts_per_minute` with an equal burst. An exhausted bucket rejects
//! the attempt before any cryptographic work.

use dashmap::DashMap;
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;
use tracing::debug;

/// Type alias for governor's direct rate limiter.
type DirectRateLimiter = governor::DefaultDirectRateLimiter;

/// Entries kept before [`AttemptLimiter::cleanup`] starts over.
const MAX_ENTRIES: usize = 10_000;

/// Thread-safe per-uid attempt limiter.
#[derive(Debug)]
pub struct AttemptLimiter {
    limiters: DashMap<u32, DirectRateLimiter>,
    quota: Quota,
}

impl AttemptLimiter {
    /// Limit every uid to `per_minute` attempts per minute.
    pub fn new(per_minute: u32) -> Self {
        let rate = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiters: DashMap::new(),
            quota: Quota::per_minute(rate),
        }
    }

    /// Check whether `uid` may attempt admission now.
    ///
    /// Returns `true` if allowed, `false` if rate limited.
    pub fn check_attempt(&self, uid: u32) -> bool {
        let limiter = self
            .limiters
            .entry(uid)
            .or_insert_with(|| GovRateLimiter::direct(self.quota));

        let allowed = limiter.check().is_ok();
        if !allowed {
            debug!(uid, "admission attempt rate limit exceeded");
        }
        allowed
    }

    /// Cleanup old entries to prevent memory growth.
    ///
    /// Call periodically from a maintenance task.
    pub fn cleanup(&self) {
        if self.limiters.len() > MAX_ENTRIES {
            self.limiters.clear();
            debug!("cleared attempt rate limiters (exceeded {} entries)", MAX_ENTRIES);
        }
    }

    pub fn tracked(&self) -> usize {
        self.limiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_limited() {
        let limiter = AttemptLimiter::new(3);

        for _ in 0..3 {
            assert!(limiter.check_attempt(1000));
        }
        assert!(!limiter.check_attempt(1000));
    }

    #[test]
    fn test_uids_are_independent() {
        let limiter = AttemptLimiter::new(1);
        assert!(limiter.check_attempt(1000));
        assert!(!limiter.check_attempt(1000));
        assert!(limiter.check_attempt(1001));
        assert_eq!(limiter.tracked(), 2);
    }

    #[test]
    fn test_zero_rate_still_allows_one() {
        let limiter = AttemptLimiter::new(0);
        assert!(limiter.check_attempt(7));
        assert!(!limiter.check_attempt(7));
    }

    #[test]
    fn test_cleanup_keeps_small_tables() {
        let limiter = AttemptLimiter::new(5);
        limiter.check_attempt(1);
        limiter.cleanup();
        assert_eq!(limiter.tracked(), 1);
    }
}
