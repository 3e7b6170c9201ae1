//! Atomic identity escalation.
//!
//! The new record is built on a private copy and committed in one step.
//! Any failure before the commit discards the copy, so a caller is either
//! fully escalated or untouched.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::record::{ESCALATION_CAPS, IdSet, PrivilegeRecord, ROOT_ID, SandboxMode};
use super::store::{CredentialStore, LabelResolver};
use crate::caller::CallerIdentity;
use crate::config::EscalationConfig;
use crate::error::EscalationError;
use crate::security::AdmissionTicket;

/// Result of a successful `escalate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    Escalated,
    /// The caller was already administrative; nothing changed.
    AlreadyPrivileged,
}

/// Raises an admitted caller to the administrative identity.
pub struct EscalationHandler {
    store: Arc<dyn CredentialStore>,
    labels: Arc<dyn LabelResolver>,
    target_label: String,
    disable_sandbox: bool,
}

impl EscalationHandler {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        labels: Arc<dyn LabelResolver>,
        config: &EscalationConfig,
    ) -> Self {
        Self {
            store,
            labels,
            target_label: config.target_label.clone(),
            disable_sandbox: config.disable_sandbox,
        }
    }

    /// Escalate `caller`. Requires proof of admission.
    pub fn escalate(
        &self,
        caller: &CallerIdentity,
        ticket: &AdmissionTicket,
    ) -> Result<EscalationOutcome, EscalationError> {
        let current = self
            .store
            .snapshot(caller.pid)
            .ok_or(EscalationError::UnknownCaller(caller.pid))?;

        if current.is_administrative() {
            info!(pid = caller.pid, ticket = %ticket.id(), "caller already administrative; escalation is a no-op");
            return Ok(EscalationOutcome::AlreadyPrivileged);
        }

        let next = self.build(current)?;
        self.store.commit(caller.pid, next)?;

        info!(
            pid = caller.pid,
            uid = caller.uid,
            ticket = %ticket.id(),
            label = %self.target_label,
            "caller escalated"
        );
        Ok(EscalationOutcome::Escalated)
    }

    fn build(&self, mut next: PrivilegeRecord) -> Result<PrivilegeRecord, EscalationError> {
        next.uid = IdSet::uniform(ROOT_ID);
        next.gid = IdSet::uniform(ROOT_ID);

        next.cap_effective = next.cap_effective.with_all(&ESCALATION_CAPS);
        next.cap_permitted = next.cap_permitted.with_all(&ESCALATION_CAPS);
        next.cap_bounding = next.cap_bounding.with_all(&ESCALATION_CAPS);

        next.securebits = 0;

        if self.labels.is_enabled() {
            let Some(sid) = self.labels.resolve(&self.target_label) else {
                warn!(label = %self.target_label, "security label did not resolve; escalation aborted");
                return Err(EscalationError::LabelResolutionFailed(
                    self.target_label.clone(),
                ));
            };
            next.label = self.target_label.clone();
            next.label_sid = Some(sid);
        }

        if self.disable_sandbox && next.sandbox != SandboxMode::Disabled {
            debug!("dropping syscall filter");
            next.sandbox = SandboxMode::Disabled;
        }

        Ok(next)
    }
}
