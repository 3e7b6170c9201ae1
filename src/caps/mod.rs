//! Capability handles: allocation, per-caller namespaces, deferred issuance.

pub mod handles;
pub mod issuer;

pub use handles::HandleTable;
pub use issuer::{CapabilityIssuer, IssueWorker};
