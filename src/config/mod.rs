//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, DiagnosticsConfig)
//! - [`listen`]: Unix socket listener configuration (ListenConfig)
//! - [`admission`]: Challenge secrets, verification key and outcomes (AdmissionConfig)
//! - [`privilege`]: Escalation and capability issuance (EscalationConfig, CapabilityConfig)
//! - [`rules`]: Path authorization table and uid allowlist (RulesConfig)

mod admission;
mod listen;
mod privilege;
mod rules;
mod types;
pub mod validation;

pub use admission::{AdmissionConfig, Outcome, SignatureScheme};
pub use listen::ListenConfig;
pub use privilege::{CapabilityConfig, EscalationConfig};
pub use types::Config;
