//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::admission::AdmissionConfig;
use super::listen::ListenConfig;
use super::privilege::{CapabilityConfig, EscalationConfig};
use super::rules::RulesConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration. Read once at startup; nothing here changes at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Daemon identity and metrics.
    #[serde(default)]
    pub server: ServerConfig,
    /// Unix socket listeners.
    #[serde(default)]
    pub listen: ListenConfig,
    /// Challenge secret, verification key and admission outcomes.
    pub admission: AdmissionConfig,
    /// Identity escalation.
    #[serde(default)]
    pub escalation: EscalationConfig,
    /// Capability handle issuance.
    #[serde(default)]
    pub capability: CapabilityConfig,
    /// Path authorization table.
    #[serde(default)]
    pub rules: RulesConfig,
    /// In-memory diagnostic log.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Daemon identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name used in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Prometheus HTTP port (0 disables the endpoint).
    #[serde(default)]
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            metrics_port: 0,
        }
    }
}

fn default_server_name() -> String {
    "fmacd".to_string()
}

/// Diagnostic log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsConfig {
    /// Bytes of log text kept in memory before the oldest lines are evicted.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_log_capacity() -> usize {
    64 * 1024
}

pub(super) fn default_true() -> bool {
    true
}
