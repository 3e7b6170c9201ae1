//! Telemetry utilities for command timing and span construction.

use std::time::Instant;

/// Guard for timing a control command and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: &'static str,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_control_command(self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use crate::caller::CallerIdentity;
    use tracing::{Span, info_span};

    /// Span for one trigger connection.
    pub fn trigger(caller: &CallerIdentity) -> Span {
        info_span!("trigger", uid = caller.uid, pid = caller.pid)
    }

    /// Span for one control connection.
    pub fn control(caller: &CallerIdentity) -> Span {
        info_span!("control", uid = caller.uid, pid = caller.pid)
    }

    /// Span for one admission attempt.
    pub fn admission(caller: &CallerIdentity, len: usize) -> Span {
        info_span!("admission", uid = caller.uid, pid = caller.pid, len)
    }
}
