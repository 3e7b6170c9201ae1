//! Escalation and capability issuance configuration.

use serde::Deserialize;

use super::types::default_true;

/// Identity escalation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EscalationConfig {
    /// Security label assigned to escalated callers.
    #[serde(default = "default_target_label")]
    pub target_label: String,
    /// Whether a mandatory access control policy is active.
    #[serde(default = "default_true")]
    pub mac_enabled: bool,
    /// Label of callers that have not been escalated.
    #[serde(default = "default_initial_label")]
    pub initial_label: String,
    /// Labels the loaded policy defines, in identifier order (first is 1).
    #[serde(default = "default_known_labels")]
    pub known_labels: Vec<String>,
    /// Drop the caller's syscall filter on escalation.
    #[serde(default = "default_true")]
    pub disable_sandbox: bool,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            target_label: default_target_label(),
            mac_enabled: true,
            initial_label: default_initial_label(),
            known_labels: default_known_labels(),
            disable_sandbox: true,
        }
    }
}

impl EscalationConfig {
    /// Emit warnings for combinations that are accepted but cannot succeed.
    pub fn warn_inconsistent(&self) {
        if self.mac_enabled && !self.known_labels.contains(&self.target_label) {
            tracing::warn!(
                label = %self.target_label,
                "[escalation].target_label is not in known_labels; every escalation will be aborted"
            );
        }
    }
}

fn default_target_label() -> String {
    "u:r:su:s0".to_string()
}

fn default_initial_label() -> String {
    "u:r:untrusted_app:s0".to_string()
}

fn default_known_labels() -> Vec<String> {
    vec![
        "u:r:init:s0".to_string(),
        "u:r:shell:s0".to_string(),
        default_initial_label(),
        default_target_label(),
    ]
}

/// Capability issuance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CapabilityConfig {
    /// Size of each shared region in bytes.
    #[serde(default = "default_region_size")]
    pub region_size: u64,
    /// Protocol version reported to the caller.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,
    /// Flags reported to the caller.
    #[serde(default)]
    pub flags: u32,
    /// Handles a single caller may hold at once.
    #[serde(default = "default_max_handles")]
    pub max_handles_per_caller: usize,
    /// Pending issuance jobs before new ones are refused.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            region_size: default_region_size(),
            protocol_version: default_protocol_version(),
            flags: 0,
            max_handles_per_caller: default_max_handles(),
            queue_depth: default_queue_depth(),
        }
    }
}

fn default_region_size() -> u64 {
    4096
}

fn default_protocol_version() -> u32 {
    1
}

fn default_max_handles() -> usize {
    16
}

fn default_queue_depth() -> usize {
    1024
}
