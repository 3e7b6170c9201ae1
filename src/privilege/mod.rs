//! Caller privilege records and the escalation path.

pub mod escalation;
pub mod record;
pub mod store;

pub use escalation::{EscalationHandler, EscalationOutcome};
pub use store::{CredentialStore, MemoryCredentialStore, StaticLabelPolicy};
