//! Network module.
//!
//! Contains the Gateway (Unix socket listeners) and the per-connection
//! tasks for the trigger and control sockets.

mod connection;
mod gateway;

pub use connection::{ControlConnection, TriggerConnection};
pub use gateway::Gateway;
