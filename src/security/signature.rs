//! Detached signature verification over challenge codes.
//!
//! The signed message is the code in plain decimal (no zero padding). The
//! verification algorithms hash it with SHA-256 before checking.

use fmac_proto::totp::challenge_message;
use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use std::ops::RangeInclusive;

use crate::config::SignatureScheme;
use crate::error::KeyError;

/// DER SubjectPublicKeyInfo header for an uncompressed P-256 point.
const P256_SPKI_PREFIX: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08,
    0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];

/// Uncompressed P-256 point length (`0x04 || X || Y`).
const P256_POINT_LEN: usize = 65;

/// Accepted signature lengths for a scheme.
pub fn length_bounds(scheme: SignatureScheme) -> RangeInclusive<usize> {
    match scheme {
        SignatureScheme::EcdsaP256Sha256 => 64..=96,
        SignatureScheme::EcdsaP256Sha256Fixed => 64..=64,
        SignatureScheme::RsaPkcs1Sha256 => 256..=512,
    }
}

fn algorithm(scheme: SignatureScheme) -> &'static dyn VerificationAlgorithm {
    match scheme {
        SignatureScheme::EcdsaP256Sha256 => &signature::ECDSA_P256_SHA256_ASN1,
        SignatureScheme::EcdsaP256Sha256Fixed => &signature::ECDSA_P256_SHA256_FIXED,
        SignatureScheme::RsaPkcs1Sha256 => &signature::RSA_PKCS1_2048_8192_SHA256,
    }
}

/// Accept a raw uncompressed point or its SPKI wrapping.
fn p256_point(key: &[u8]) -> Result<Vec<u8>, KeyError> {
    let point = match key.len() {
        P256_POINT_LEN => key,
        len if len == P256_SPKI_PREFIX.len() + P256_POINT_LEN
            && key.starts_with(&P256_SPKI_PREFIX) =>
        {
            &key[P256_SPKI_PREFIX.len()..]
        }
        len => {
            return Err(KeyError::UnsupportedKey(format!(
                "{len}-byte P-256 key; expected a 65-byte point or 91-byte SubjectPublicKeyInfo"
            )));
        }
    };
    if point.first() != Some(&0x04) {
        return Err(KeyError::UnsupportedKey(
            "P-256 point is not uncompressed".to_string(),
        ));
    }
    Ok(point.to_vec())
}

/// Verifies challenge signatures with the fixed deployment key.
pub struct SignatureVerifier {
    scheme: SignatureScheme,
    key: UnparsedPublicKey<Vec<u8>>,
}

impl SignatureVerifier {
    /// Build a verifier, normalising the key encoding for the scheme.
    pub fn new(scheme: SignatureScheme, public_key: &[u8]) -> Result<Self, KeyError> {
        let key = match scheme {
            SignatureScheme::EcdsaP256Sha256 | SignatureScheme::EcdsaP256Sha256Fixed => {
                p256_point(public_key)?
            }
            SignatureScheme::RsaPkcs1Sha256 => {
                // DER RSAPublicKey is a SEQUENCE
                if public_key.first() != Some(&0x30) {
                    return Err(KeyError::UnsupportedKey(
                        "RSA key must be a DER RSAPublicKey".to_string(),
                    ));
                }
                public_key.to_vec()
            }
        };
        Ok(Self {
            scheme,
            key: UnparsedPublicKey::new(algorithm(scheme), key),
        })
    }

    /// Accepted signature lengths.
    pub fn length_bounds(&self) -> RangeInclusive<usize> {
        length_bounds(self.scheme)
    }

    /// Check `signature` over the decimal rendering of `code`.
    ///
    /// Out-of-range lengths are refused before any cryptographic work.
    pub fn verify(&self, signature: &[u8], code: u32) -> bool {
        if !self.length_bounds().contains(&signature.len()) {
            return false;
        }
        let message = challenge_message(code);
        self.key.verify(message.as_bytes(), signature).is_ok()
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_keys {
    use ring::rand::SystemRandom;
    use ring::signature::{
        ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P256_SHA256_FIXED_SIGNING, EcdsaKeyPair,
        EcdsaSigningAlgorithm, KeyPair,
    };

    /// Throwaway signing key for tests.
    pub struct TestSigner {
        pair: EcdsaKeyPair,
        rng: SystemRandom,
    }

    impl TestSigner {
        pub fn asn1() -> Self {
            Self::generate(&ECDSA_P256_SHA256_ASN1_SIGNING)
        }

        pub fn fixed() -> Self {
            Self::generate(&ECDSA_P256_SHA256_FIXED_SIGNING)
        }

        fn generate(alg: &'static EcdsaSigningAlgorithm) -> Self {
            let rng = SystemRandom::new();
            let pkcs8 = EcdsaKeyPair::generate_pkcs8(alg, &rng).unwrap();
            let pair = EcdsaKeyPair::from_pkcs8(alg, pkcs8.as_ref(), &rng).unwrap();
            Self { pair, rng }
        }

        pub fn public_point(&self) -> Vec<u8> {
            self.pair.public_key().as_ref().to_vec()
        }

        pub fn sign_code(&self, code: u32) -> Vec<u8> {
            self.sign_bytes(fmac_proto::totp::challenge_message(code).as_bytes())
        }

        pub fn sign_bytes(&self, message: &[u8]) -> Vec<u8> {
            self.pair.sign(&self.rng, message).unwrap().as_ref().to_vec()
        }
    }
}
