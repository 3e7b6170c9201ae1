//! The admission engine: length check, signature, replay guard.
//!
//! Each attempt walks
//! `RECEIVED -> LENGTH_CHECKED -> SIGNATURE_CHECKED -> REPLAY_CHECKED`
//! and ends `ADMITTED` or `REJECTED`. There are no retries; a rejected
//! caller signs the next code and tries again.
//!
//! `verify` never blocks on I/O and never allocates proportionally to the
//! input: the challenge is copied into a fixed stack buffer that is wiped
//! on every return path.

use fmac_proto::TotpGenerator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use super::challenge::CachedChallenge;
use super::clock::Clock;
use super::replay::ReplayGuard;
use super::signature::SignatureVerifier;
use super::ticket::AdmissionTicket;
use crate::config::AdmissionConfig;
use crate::error::{KeyError, RejectReason};

/// Size of the local challenge buffer. No scheme accepts more.
pub const MAX_CHALLENGE_LEN: usize = fmac_proto::MAX_FRAME_LEN;

/// Minimum decoded TOTP key length accepted outside test setups.
pub const MIN_SECRET_LEN: usize = 16;

/// Outcome of one admission attempt. Never persisted.
#[derive(Debug)]
pub enum AdmissionResult {
    Admitted(AdmissionTicket),
    Rejected(RejectReason),
}

impl AdmissionResult {
    #[cfg(test)]
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionResult::Admitted(_))
    }
}

/// Gate deciding, once per window, whether a signed challenge is admitted.
#[derive(Debug)]
pub struct AdmissionEngine {
    challenge: Arc<CachedChallenge>,
    replay: ReplayGuard,
    verifier: SignatureVerifier,
    clock: Arc<dyn Clock>,
}

impl AdmissionEngine {
    pub fn new(
        totp: TotpGenerator,
        window: Duration,
        verifier: SignatureVerifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let challenge = Arc::new(CachedChallenge::new(totp, window));
        let replay = ReplayGuard::new(Arc::clone(&challenge));
        Self {
            challenge,
            replay,
            verifier,
            clock,
        }
    }

    /// Build from deployment configuration.
    ///
    /// Fails when the key material cannot be used. A TOTP key shorter than
    /// [`MIN_SECRET_LEN`] is refused unless `allow_weak_secret` is set.
    pub fn from_config(
        config: &AdmissionConfig,
        clock: Arc<dyn Clock>,
        allow_weak_secret: bool,
    ) -> Result<Self, KeyError> {
        let key = config.totp_key();
        if key.is_empty() || (key.len() < MIN_SECRET_LEN && !allow_weak_secret) {
            return Err(KeyError::WeakSecret(key.len()));
        }
        let verifier = SignatureVerifier::new(config.scheme, &config.public_key_bytes()?)?;
        Ok(Self::new(
            TotpGenerator::new(&key),
            config.window(),
            verifier,
            clock,
        ))
    }

    /// Decide on one raw challenge.
    pub fn verify(&self, raw: &[u8]) -> AdmissionResult {
        // LENGTH_CHECKED
        if !self.verifier.length_bounds().contains(&raw.len()) || raw.len() > MAX_CHALLENGE_LEN {
            trace!(len = raw.len(), "challenge length out of range");
            return AdmissionResult::Rejected(RejectReason::InvalidLength);
        }

        let mut local = Zeroizing::new([0u8; MAX_CHALLENGE_LEN]);
        local[..raw.len()].copy_from_slice(raw);
        let signature = &local[..raw.len()];

        let now = self.clock.now();
        let code = self.challenge.get(now);

        // SIGNATURE_CHECKED
        if !self.verifier.verify(signature, code) {
            debug!("challenge signature mismatch");
            return AdmissionResult::Rejected(RejectReason::SignatureMismatch);
        }

        // REPLAY_CHECKED
        if !self.replay.admit(code, now) {
            debug!("challenge replay rejected");
            return AdmissionResult::Rejected(RejectReason::ReplayDetected);
        }

        let ticket = AdmissionTicket::mint(now);
        debug!(ticket = %ticket.id(), "challenge admitted");
        AdmissionResult::Admitted(ticket)
    }

    /// Current code. Exposed for the diagnostics surface only.
    #[cfg(test)]
    pub fn current_code(&self) -> u32 {
        self.challenge.get(self.clock.now())
    }
}
