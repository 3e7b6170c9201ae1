//! Unix socket listener configuration.

use serde::Deserialize;
use std::path::PathBuf;

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Socket receiving signed challenges from callers.
    #[serde(default = "default_trigger_socket")]
    pub trigger_socket: PathBuf,
    /// Permission bits of the trigger socket.
    #[serde(default = "default_trigger_mode")]
    pub trigger_mode: u32,
    /// Socket accepting rule control commands.
    #[serde(default = "default_control_socket")]
    pub control_socket: PathBuf,
    /// Permission bits of the control socket.
    #[serde(default = "default_control_mode")]
    pub control_mode: u32,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            trigger_socket: default_trigger_socket(),
            trigger_mode: default_trigger_mode(),
            control_socket: default_control_socket(),
            control_mode: default_control_mode(),
        }
    }
}

fn default_trigger_socket() -> PathBuf {
    PathBuf::from("/run/fmacd/trigger.sock")
}

fn default_trigger_mode() -> u32 {
    0o666
}

fn default_control_socket() -> PathBuf {
    PathBuf::from("/run/fmacd/control.sock")
}

fn default_control_mode() -> u32 {
    0o600
}
