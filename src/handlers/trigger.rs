//! Trigger delivery: one signed challenge in, one reply out.
//!
//! Nothing about a rejection crosses back to the caller beyond the
//! `Rejected` tag; the reason goes to the diagnostic log and metrics.

use fmac_proto::TriggerReply;
use tracing::{Instrument, debug, info, warn};

use crate::caller::CallerIdentity;
use crate::error::RejectReason;
use crate::privilege::EscalationOutcome;
use crate::security::AdmissionResult;
use crate::state::Gate;
use crate::telemetry::spans;

/// Run one admission attempt for `caller` and deliver its outcomes.
pub async fn deliver(gate: &Gate, caller: CallerIdentity, raw: &[u8]) -> TriggerReply {
    let span = spans::admission(&caller, raw.len());
    deliver_inner(gate, caller, raw).instrument(span).await
}

async fn deliver_inner(gate: &Gate, caller: CallerIdentity, raw: &[u8]) -> TriggerReply {
    if !gate.allowlist.permits(caller.uid) {
        return reject(gate, &caller, RejectReason::NotAllowlisted);
    }
    if !gate.limiter.check_attempt(caller.uid) {
        return reject(gate, &caller, RejectReason::RateLimited);
    }

    let ticket = match gate.engine.verify(raw) {
        AdmissionResult::Admitted(ticket) => ticket,
        AdmissionResult::Rejected(reason) => return reject(gate, &caller, reason),
    };
    crate::metrics::record_admission("admitted");
    info!(uid = caller.uid, pid = caller.pid, ticket = %ticket.id(), "caller admitted");

    if gate.outcomes.escalate {
        match gate.escalation.escalate(&caller, &ticket) {
            Ok(EscalationOutcome::Escalated) => crate::metrics::record_escalation("escalated"),
            Ok(EscalationOutcome::AlreadyPrivileged) => {
                crate::metrics::record_escalation("already_privileged")
            }
            Err(e) => {
                warn!(pid = caller.pid, error = %e, "escalation failed");
                gate.diag.record(format!("escalation failed for {caller}: {e}"));
                crate::metrics::record_escalation(e.error_code());
            }
        }
    }

    if !gate.outcomes.capability {
        return TriggerReply::Admitted;
    }

    let result = match gate.issuer.issue(caller, ticket) {
        Ok(pending) => pending.wait().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(grant) => {
            crate::metrics::record_capability("issued");
            crate::metrics::set_handles_installed(gate.handles.total());
            TriggerReply::Granted(grant)
        }
        Err(e) => {
            warn!(pid = caller.pid, error = %e, "capability issuance failed");
            gate.diag.record(format!("capability issuance failed for {caller}: {e}"));
            crate::metrics::record_capability(e.error_code());
            TriggerReply::Admitted
        }
    }
}

fn reject(gate: &Gate, caller: &CallerIdentity, reason: RejectReason) -> TriggerReply {
    debug!(uid = caller.uid, pid = caller.pid, reason = reason.error_code(), "admission rejected");
    gate.diag.record(format!("admission rejected for {caller}: {reason}"));
    crate::metrics::record_admission(reason.error_code());
    TriggerReply::Rejected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privilege::CredentialStore;
    use crate::state::test_support::{config, gate};

    const CALLER: CallerIdentity = CallerIdentity {
        uid: 2000,
        gid: 2000,
        pid: 31337,
    };

    #[tokio::test]
    async fn admitted_caller_is_escalated_and_granted() {
        let t = gate(&config(""));
        t.gate.credentials.observe(&CALLER);

        let reply = deliver(&t.gate, CALLER, &t.signed_current()).await;

        let TriggerReply::Granted(grant) = reply else {
            panic!("expected a grant, got {reply:?}");
        };
        assert_eq!(grant.handle, 3);
        assert_eq!(t.gate.handles.count(CALLER.pid), 1);
        let record = t.gate.credentials.snapshot(CALLER.pid).unwrap();
        assert!(record.is_administrative());
        assert_eq!(record.label, "u:r:su:s0");
    }

    #[tokio::test]
    async fn replay_is_rejected_with_reason_logged() {
        let t = gate(&config(""));
        t.gate.credentials.observe(&CALLER);
        let sig = t.signed_current();

        assert!(matches!(deliver(&t.gate, CALLER, &sig).await, TriggerReply::Granted(_)));
        assert_eq!(deliver(&t.gate, CALLER, &sig).await, TriggerReply::Rejected);

        let lines = t.gate.diag.lines();
        assert!(lines.last().unwrap().contains("code already consumed or expired"));
        assert_eq!(t.gate.handles.count(CALLER.pid), 1);
    }

    #[tokio::test]
    async fn escalate_only_outcome() {
        let t = gate(&config(r#"outcomes = ["escalate"]"#));
        t.gate.credentials.observe(&CALLER);

        let reply = deliver(&t.gate, CALLER, &t.signed_current()).await;

        assert_eq!(reply, TriggerReply::Admitted);
        assert_eq!(t.gate.handles.count(CALLER.pid), 0);
        assert!(t.gate.credentials.snapshot(CALLER.pid).unwrap().is_administrative());
    }

    #[tokio::test]
    async fn capability_only_leaves_identity_alone() {
        let t = gate(&config(r#"outcomes = ["capability"]"#));
        t.gate.credentials.observe(&CALLER);

        let reply = deliver(&t.gate, CALLER, &t.signed_current()).await;

        assert!(matches!(reply, TriggerReply::Granted(_)));
        assert!(!t.gate.credentials.snapshot(CALLER.pid).unwrap().is_administrative());
    }

    #[tokio::test]
    async fn allowlist_rejects_before_verification() {
        let t = gate(&config(""));
        t.gate.allowlist.extend([1000]);
        let sig = t.signed_current();

        assert_eq!(deliver(&t.gate, CALLER, &sig).await, TriggerReply::Rejected);
        assert!(t.gate.diag.lines()[0].contains("not on the allowlist"));

        // The code was never consumed.
        let allowed = CallerIdentity { uid: 1000, ..CALLER };
        t.gate.credentials.observe(&allowed);
        assert!(matches!(deliver(&t.gate, allowed, &sig).await, TriggerReply::Granted(_)));
    }

    #[tokio::test]
    async fn rate_limit_applies_per_uid() {
        let t = gate(&config("attempts_per_minute = 1"));
        let sig = t.signed_current();

        assert_eq!(deliver(&t.gate, CALLER, b"nope").await, TriggerReply::Rejected);
        assert_eq!(deliver(&t.gate, CALLER, &sig).await, TriggerReply::Rejected);
        assert!(t.gate.diag.lines()[1].contains("too many attempts"));

        let other = CallerIdentity { uid: 2001, ..CALLER };
        t.gate.credentials.observe(&other);
        assert!(matches!(deliver(&t.gate, other, &sig).await, TriggerReply::Granted(_)));
    }

    #[tokio::test]
    async fn escalation_failure_still_delivers_capability() {
        let t = gate(&config(
            r#"
            [escalation]
            target_label = "u:r:missing:s0"
            "#,
        ));
        t.gate.credentials.observe(&CALLER);

        let reply = deliver(&t.gate, CALLER, &t.signed_current()).await;

        assert!(matches!(reply, TriggerReply::Granted(_)));
        assert!(!t.gate.credentials.snapshot(CALLER.pid).unwrap().is_administrative());
        assert!(
            t.gate
                .diag
                .lines()
                .iter()
                .any(|l| l.contains("escalation failed"))
        );
    }
}
