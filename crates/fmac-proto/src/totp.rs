//! Time-based one-time codes (RFC 6238 with the RFC 4226 truncation).
//!
//! Codes are HMAC-SHA1 over the big-endian 30-second counter, dynamically
//! truncated to 31 bits and reduced to six decimal digits.
//!
//! The string a client signs is [`challenge_message`]: the code rendered
//! in plain decimal, *without* leading zeros.

use ring::hmac;
use zeroize::Zeroizing;

use crate::base32;

/// Length of one TOTP step in seconds.
pub const TIME_STEP_SECS: u64 = 30;

/// Codes are reduced modulo this value (six digits).
pub const CODE_MODULUS: u32 = 1_000_000;

/// Derives six-digit codes from a shared secret.
///
/// The raw key is held only inside the HMAC key schedule; the decoded
/// bytes are wiped as soon as the key is built.
pub struct TotpGenerator {
    key: hmac::Key,
}

impl TotpGenerator {
    /// Build a generator from raw key bytes.
    pub fn new(raw_key: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, raw_key),
        }
    }

    /// Build a generator from a base32 secret, skipping invalid characters.
    pub fn from_base32(secret: &str) -> Self {
        let raw = Zeroizing::new(base32::decode_lenient(secret));
        Self::new(&raw)
    }

    /// The step counter for a unix timestamp.
    pub fn counter(unix_secs: u64) -> u64 {
        unix_secs / TIME_STEP_SECS
    }

    /// Code valid during the step containing `unix_secs`.
    pub fn generate(&self, unix_secs: u64) -> u32 {
        self.code_for_counter(Self::counter(unix_secs))
    }

    /// Code for an explicit step counter.
    pub fn code_for_counter(&self, counter: u64) -> u32 {
        let tag = hmac::sign(&self.key, &counter.to_be_bytes());
        let digest = tag.as_ref();
        let offset = usize::from(digest[digest.len() - 1] & 0x0f);
        let truncated = u32::from_be_bytes([
            digest[offset] & 0x7f,
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]);
        truncated % CODE_MODULUS
    }
}

impl std::fmt::Debug for TotpGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpGenerator").finish_non_exhaustive()
    }
}

/// Six-digit, zero-padded rendering for display.
pub fn format_code(code: u32) -> String {
    format!("{code:06}")
}

/// The exact bytes a client signs for `code`.
pub fn challenge_message(code: u32) -> String {
    code.to_string()
}
