//! The Gate - central shared state of the daemon.
//!
//! The Gate owns the admission engine, the two privileged outcomes and the
//! path authorization table. It is built once at startup and shared by
//! every connection task behind an `Arc`.

use std::sync::Arc;

use crate::caps::{CapabilityIssuer, HandleTable, IssueWorker};
use crate::config::{Config, Outcome};
use crate::diagnostics::DiagnosticLog;
use crate::privilege::{EscalationHandler, MemoryCredentialStore, StaticLabelPolicy};
use crate::rules::{AccessGuard, RuleTable, UidAllowlist};
use crate::security::{AdmissionEngine, AttemptLimiter};

use super::peers::PeerRegistry;

/// Which privileged outcomes an admission produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcomes {
    pub escalate: bool,
    pub capability: bool,
}

/// Central shared state container.
pub struct Gate {
    /// Daemon name, for logs.
    pub name: String,

    /// Challenge verification.
    pub engine: AdmissionEngine,

    /// Identity escalation.
    pub escalation: EscalationHandler,

    /// Deferred capability issuance.
    pub issuer: CapabilityIssuer,

    /// Installed capability handles, per caller.
    pub handles: Arc<HandleTable>,

    /// Privilege records of connected callers.
    pub credentials: Arc<MemoryCredentialStore>,

    /// Open trigger connections per caller pid.
    pub peers: PeerRegistry,

    /// Per-uid admission attempt limits.
    pub limiter: AttemptLimiter,

    /// Uids allowed to attempt admission.
    pub allowlist: UidAllowlist,

    /// Path authorization.
    pub guard: AccessGuard,

    /// Rejection reasons and verbose denials.
    pub diag: Arc<DiagnosticLog>,

    /// Outcomes granted on admission.
    pub outcomes: Outcomes,
}

impl Gate {
    /// Build the gate. The returned worker must be spawned for capability
    /// issuance to make progress.
    pub fn new(config: &Config, engine: AdmissionEngine) -> (Self, IssueWorker) {
        let diag = Arc::new(DiagnosticLog::new(
            config.diagnostics.log_capacity,
            config.rules.verbose,
        ));

        let credentials = Arc::new(MemoryCredentialStore::new(
            config.escalation.initial_label.clone(),
        ));
        let escalation = EscalationHandler::new(
            credentials.clone(),
            Arc::new(StaticLabelPolicy::from_config(&config.escalation)),
            &config.escalation,
        );

        let handles = Arc::new(HandleTable::new(config.capability.max_handles_per_caller));
        let (issuer, worker) = CapabilityIssuer::new(&config.capability, handles.clone());

        let guard = AccessGuard::new(
            RuleTable::new(config.rules.max_rules, config.rules.default_deny),
            diag.clone(),
        );

        let gate = Self {
            name: config.server.name.clone(),
            engine,
            escalation,
            issuer,
            handles,
            credentials,
            peers: PeerRegistry::new(),
            limiter: AttemptLimiter::new(config.admission.attempts_per_minute),
            allowlist: UidAllowlist::new(config.rules.max_allowlist, &config.rules.allowlist),
            guard,
            diag,
            outcomes: Outcomes {
                escalate: config.admission.wants(Outcome::Escalate),
                capability: config.admission.wants(Outcome::Capability),
            },
        };
        (gate, worker)
    }
}
