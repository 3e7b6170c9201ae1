//! The process-wide cached challenge code.
//!
//! One [`CachedChallenge`] exists per daemon. Its state lives behind a
//! single short-held mutex that the [`ReplayGuard`](super::replay::ReplayGuard)
//! shares, so "read code", "regenerate on expiry" and "consume" are all
//! linearizable with each other. The HMAC for a fresh code is computed
//! before the lock is taken; only the install happens inside it.

use fmac_proto::TotpGenerator;
use parking_lot::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use tracing::trace;

use super::clock::unix_secs;

/// Mutable part of the challenge, guarded by one lock.
#[derive(Debug)]
pub(super) struct ChallengeState {
    pub(super) code: u32,
    pub(super) counter: u64,
    pub(super) expires_at: SystemTime,
    pub(super) consumed: bool,
}

/// Current valid code with its expiry and single-use flag.
pub struct CachedChallenge {
    totp: TotpGenerator,
    window: Duration,
    state: Mutex<ChallengeState>,
}

impl CachedChallenge {
    /// Create an empty cache; the first read generates a code.
    pub fn new(totp: TotpGenerator, window: Duration) -> Self {
        Self {
            totp,
            window,
            state: Mutex::new(ChallengeState {
                code: 0,
                counter: 0,
                expires_at: SystemTime::UNIX_EPOCH,
                consumed: false,
            }),
        }
    }

    /// Code valid at `now`, regenerating it if the window has passed.
    ///
    /// A regenerated window starts unconsumed, except when it belongs to
    /// the same TOTP step as the previous one: the code is then identical
    /// and an earlier consumption still stands.
    pub fn get(&self, now: SystemTime) -> u32 {
        let secs = unix_secs(now);
        let counter = TotpGenerator::counter(secs);
        let fresh = self.totp.code_for_counter(counter);

        let mut state = self.state.lock();
        if now >= state.expires_at {
            let carried = state.consumed && state.counter == counter;
            state.code = fresh;
            state.counter = counter;
            state.expires_at = now + self.window;
            state.consumed = carried;
            trace!(counter, carried, "challenge regenerated");
        }
        state.code
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, ChallengeState> {
        self.state.lock()
    }
}

impl std::fmt::Debug for CachedChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedChallenge")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
