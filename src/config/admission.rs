//! Admission configuration: challenge secret, verification key, outcomes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::error::KeyError;

/// Admission configuration.
#[derive(Clone, Deserialize)]
pub struct AdmissionConfig {
    /// Shared TOTP secret.
    pub totp_secret: String,
    /// How `totp_secret` is turned into key bytes.
    #[serde(default)]
    pub secret_encoding: SecretEncoding,
    /// Verification public key, base64.
    pub public_key: String,
    /// Signature scheme the key belongs to.
    #[serde(default)]
    pub scheme: SignatureScheme,
    /// How long a generated code stays cached (milliseconds).
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// What an admitted caller receives.
    #[serde(default = "default_outcomes")]
    pub outcomes: Vec<Outcome>,
    /// Admission attempts allowed per uid per minute.
    #[serde(default = "default_attempts_per_minute")]
    pub attempts_per_minute: u32,
}

impl AdmissionConfig {
    /// Raw TOTP key bytes. Base32 decoding skips invalid characters.
    pub fn totp_key(&self) -> Zeroizing<Vec<u8>> {
        match self.secret_encoding {
            SecretEncoding::Base32 => {
                Zeroizing::new(fmac_proto::base32::decode_lenient(&self.totp_secret))
            }
            SecretEncoding::Raw => Zeroizing::new(self.totp_secret.as_bytes().to_vec()),
        }
    }

    /// Decoded verification key.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, KeyError> {
        BASE64
            .decode(self.public_key.trim())
            .map_err(|e| KeyError::DecodeFailure {
                what: "admission.public_key",
                reason: e.to_string(),
            })
    }

    /// Code cache window.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Whether `outcome` is enabled.
    pub fn wants(&self, outcome: Outcome) -> bool {
        self.outcomes.contains(&outcome)
    }
}

impl fmt::Debug for AdmissionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionConfig")
            .field("totp_secret", &"<redacted>")
            .field("secret_encoding", &self.secret_encoding)
            .field("public_key", &self.public_key)
            .field("scheme", &self.scheme)
            .field("window_ms", &self.window_ms)
            .field("outcomes", &self.outcomes)
            .field("attempts_per_minute", &self.attempts_per_minute)
            .finish()
    }
}

/// Encoding of the configured TOTP secret.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SecretEncoding {
    /// RFC 4648 base32, invalid characters skipped.
    #[default]
    Base32,
    /// The secret string's bytes, verbatim.
    Raw,
}

/// Asymmetric signature scheme used for challenge signatures.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureScheme {
    /// ECDSA P-256 / SHA-256, ASN.1 DER signatures.
    #[default]
    EcdsaP256Sha256,
    /// ECDSA P-256 / SHA-256, fixed 64-byte `r || s` signatures.
    EcdsaP256Sha256Fixed,
    /// RSA PKCS#1 v1.5 / SHA-256, 2048 to 4096 bit keys.
    RsaPkcs1Sha256,
}

/// Privileged outcome granted on admission.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Escalate the caller's identity.
    Escalate,
    /// Issue a capability handle.
    Capability,
}

fn default_window_ms() -> u64 {
    5000
}

fn default_outcomes() -> Vec<Outcome> {
    vec![Outcome::Escalate, Outcome::Capability]
}

fn default_attempts_per_minute() -> u32 {
    30
}
