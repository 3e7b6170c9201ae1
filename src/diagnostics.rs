//! Bounded in-memory diagnostic log.
//!
//! Holds recent human-readable lines (rejection reasons, denials when
//! verbose) for the control plane `log` command. When appending a line
//! would exceed the byte capacity, the oldest lines are evicted first.

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct Ring {
    lines: VecDeque<String>,
    bytes: usize,
}

/// Diagnostic sink shared by admission and authorization.
#[derive(Debug)]
pub struct DiagnosticLog {
    ring: Mutex<Ring>,
    capacity: usize,
    verbose: AtomicBool,
}

impl DiagnosticLog {
    pub fn new(capacity: usize, verbose: bool) -> Self {
        Self {
            ring: Mutex::new(Ring::default()),
            capacity,
            verbose: AtomicBool::new(verbose),
        }
    }

    /// Append a timestamped line.
    pub fn record(&self, message: impl AsRef<str>) {
        let line = format!(
            "[{}] {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            message.as_ref()
        );
        if line.len() > self.capacity {
            return;
        }

        let mut ring = self.ring.lock();
        while ring.bytes + line.len() > self.capacity {
            match ring.lines.pop_front() {
                Some(old) => ring.bytes -= old.len(),
                None => break,
            }
        }
        ring.bytes += line.len();
        ring.lines.push_back(line);
    }

    /// Whether denials are logged (`printk_on`).
    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn set_verbose(&self, on: bool) {
        self.verbose.store(on, Ordering::Relaxed);
    }

    /// Copy of the current lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.ring.lock().lines.iter().cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.ring.lock().lines.len()
    }
}
