//! Security module for fmacd: the privilege-admission engine.
//!
//! Provides:
//! - **Cached Challenge**: the current TOTP code with expiry and consumption state
//! - **Signature Verification**: detached ECDSA/RSA signatures over the decimal code
//! - **Replay Guard**: at most one admission per code window
//! - **Admission Engine**: length check, signature, replay, ticket minting
//! - **Rate Limiting**: governor-based per-uid attempt limits
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      AdmissionEngine                            │
//! ├────────────┬──────────────────┬──────────────────┬──────────────┤
//! │   Length   │ SignatureVerifier│   ReplayGuard    │    Ticket    │
//! │  64..=96   │  ring / SHA-256  │  subtle ct_eq    │  !Clone      │
//! │  (scheme)  │  ECDSA | RSA     │  shared mutex ◄──┼─ CachedChal. │
//! └────────────┴──────────────────┴──────────────────┴──────────────┘
//! ```

pub mod admission;
pub mod challenge;
pub mod clock;
pub mod rate_limit;
pub mod replay;
pub mod signature;
pub mod ticket;

// Re-export primary types for convenience
pub use admission::{AdmissionEngine, AdmissionResult};
pub use clock::SystemClock;
pub use rate_limit::AttemptLimiter;
pub use ticket::AdmissionTicket;
