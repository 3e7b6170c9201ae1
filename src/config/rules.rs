//! Path authorization configuration.

use serde::Deserialize;

/// Rule table and allowlist configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    /// Deny operations no rule matches. Defaults to allow.
    #[serde(default)]
    pub default_deny: bool,
    /// Maximum number of rules.
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,
    /// Maximum number of allowlisted uids.
    #[serde(default = "default_max_allowlist")]
    pub max_allowlist: usize,
    /// Initial state of denial logging (`printk_on`).
    #[serde(default)]
    pub verbose: bool,
    /// Uids allowed to attempt admission. Empty means everyone.
    #[serde(default)]
    pub allowlist: Vec<u32>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            default_deny: false,
            max_rules: default_max_rules(),
            max_allowlist: default_max_allowlist(),
            verbose: false,
            allowlist: Vec::new(),
        }
    }
}

fn default_max_rules() -> usize {
    128
}

fn default_max_allowlist() -> usize {
    128
}
