//! Authorization entry point used by interception hooks.

use fmac_proto::OpType;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::table::RuleTable;
use crate::diagnostics::DiagnosticLog;

/// Rule table plus the global enable switch and denial logging.
#[derive(Debug)]
pub struct AccessGuard {
    table: RuleTable,
    disabled: AtomicBool,
    diag: Arc<DiagnosticLog>,
}

impl AccessGuard {
    pub fn new(table: RuleTable, diag: Arc<DiagnosticLog>) -> Self {
        Self {
            table,
            disabled: AtomicBool::new(false),
            diag,
        }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Returns `true` if the operation must be denied.
    ///
    /// While disabled every operation is allowed and nothing is counted.
    pub fn check(&self, path: &str, uid: u32, op: OpType) -> bool {
        if self.is_disabled() {
            return false;
        }

        let deny = self.table.authorize(path, uid, op);
        crate::metrics::record_authorization(if deny { "deny" } else { "allow" });
        if deny {
            debug!(path, uid, op = %op, "operation denied");
            if self.diag.verbose() {
                self.diag
                    .record(format!("denied {op} of {path} for uid {uid}"));
            }
        }
        deny
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }
}
