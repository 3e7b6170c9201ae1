//! Integration test common infrastructure.
//!
//! Provides utilities for spawning a test daemon, signing challenges and
//! driving its trigger and control sockets.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::{ControlClient, TriggerClient};
#[allow(unused_imports)]
pub use server::TestServer;
