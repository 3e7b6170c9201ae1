//! Single-use enforcement for challenge codes.

use std::sync::Arc;
use std::time::SystemTime;
use subtle::ConstantTimeEq;

use super::challenge::CachedChallenge;

/// Admits each cached code at most once per window.
///
/// Shares the challenge lock, so a code can never be consumed twice even
/// when many callers present it at the same instant. Must only be asked
/// after the signature has verified; otherwise a caller guessing codes
/// could burn a legitimate caller's window.
#[derive(Debug, Clone)]
pub struct ReplayGuard {
    challenge: Arc<CachedChallenge>,
}

impl ReplayGuard {
    pub fn new(challenge: Arc<CachedChallenge>) -> Self {
        Self { challenge }
    }

    /// Consume `candidate` if it is the current, unexpired, unconsumed code.
    pub fn admit(&self, candidate: u32, now: SystemTime) -> bool {
        let mut state = self.challenge.lock();
        let matches: bool = candidate.ct_eq(&state.code).into();
        if state.consumed || !matches || now >= state.expires_at {
            return false;
        }
        state.consumed = true;
        true
    }
}
