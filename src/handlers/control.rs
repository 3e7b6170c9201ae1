//! Control-plane command dispatch.
//!
//! Every command either fully applies or returns `ERR` and changes nothing.

use fmac_proto::{ControlCommand, ControlReply};
use tracing::{debug, info};

use crate::error::RuleError;
use crate::privilege::CredentialStore;
use crate::state::Gate;
use crate::telemetry::CommandTimer;

/// Parse and run one control line.
pub fn handle_line(gate: &Gate, line: &str) -> ControlReply {
    match line.parse::<ControlCommand>() {
        Ok(command) => dispatch(gate, command),
        Err(e) => {
            debug!(error = %e, "malformed control command");
            crate::metrics::record_control_command("invalid", 0.0);
            ControlReply::error(e)
        }
    }
}

/// Run one parsed command against the gate.
pub fn dispatch(gate: &Gate, command: ControlCommand) -> ControlReply {
    let _timer = CommandTimer::new(command.name());
    if command.is_mutation() {
        info!(command = %command, "control command");
    }

    match command {
        ControlCommand::Add {
            prefix,
            uid,
            deny,
            op,
        } => match gate.guard.table().add_rule(&prefix, uid, deny, op) {
            Ok(()) => {
                crate::metrics::set_rules_installed(gate.guard.table().len());
                ControlReply::ok()
            }
            Err(e) => rule_error(e),
        },
        ControlCommand::Del { prefix, uid, op } => {
            match gate.guard.table().remove_rule(&prefix, uid, op) {
                Ok(removed) => {
                    crate::metrics::set_rules_installed(gate.guard.table().len());
                    ControlReply::lines([format!("removed {removed}")])
                }
                Err(e) => rule_error(e),
            }
        }
        ControlCommand::Flush => {
            let removed = gate.guard.table().flush();
            crate::metrics::set_rules_installed(0);
            ControlReply::lines([format!("removed {removed}")])
        }
        ControlCommand::Disable => {
            gate.guard.set_disabled(true);
            ControlReply::ok()
        }
        ControlCommand::Enable => {
            gate.guard.set_disabled(false);
            ControlReply::ok()
        }
        ControlCommand::PrintkOn => {
            gate.diag.set_verbose(true);
            ControlReply::ok()
        }
        ControlCommand::PrintkOff => {
            gate.diag.set_verbose(false);
            ControlReply::ok()
        }
        ControlCommand::List => ControlReply::lines(gate.guard.table().list()),
        ControlCommand::Uids => ControlReply::lines([gate.allowlist.to_csv()]),
        ControlCommand::Allow(uids) => {
            let added = gate.allowlist.extend(uids);
            ControlReply::lines([format!("added {added}")])
        }
        ControlCommand::Check { path, uid, op } => {
            let deny = gate.guard.check(&path, uid, op);
            ControlReply::lines([if deny { "deny" } else { "allow" }])
        }
        ControlCommand::Log => ControlReply::lines(gate.diag.lines()),
        ControlCommand::Creds { pid } => match gate.credentials.snapshot(pid) {
            Some(record) => {
                let mut lines = record.describe();
                lines.push(format!("handles={}", gate.handles.count(pid)));
                ControlReply::lines(lines)
            }
            None => ControlReply::error(format!("no privilege record for pid {pid}")),
        },
    }
}

fn rule_error(e: RuleError) -> ControlReply {
    debug!(code = e.error_code(), error = %e, "rule command refused");
    ControlReply::error(e)
}
