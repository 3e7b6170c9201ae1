//! Deferred capability issuance.
//!
//! Admission may run where blocking or allocating is not allowed, so
//! `issue` only posts a job to a dedicated worker and returns. The worker
//! allocates the region on the blocking pool, installs the handle and
//! delivers the grant.
//!
//! Every job runs exactly once or reports failure: a job dropped without
//! running (queue torn down, runtime shutting down) answers its caller
//! with [`IssueError::Dropped`] from its `Drop` impl.

use fmac_proto::CapabilityGrant;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::handles::{CapabilityRegion, HandleTable};
use crate::caller::CallerIdentity;
use crate::config::CapabilityConfig;
use crate::error::IssueError;
use crate::security::AdmissionTicket;

type GrantResult = Result<CapabilityGrant, IssueError>;

#[derive(Debug, Clone, Copy)]
struct IssueSettings {
    region_size: u64,
    protocol_version: u32,
    flags: u32,
}

/// One deferred issuance.
struct IssueJob {
    caller: CallerIdentity,
    ticket: AdmissionTicket,
    reply: Option<oneshot::Sender<GrantResult>>,
}

impl IssueJob {
    async fn run(mut self, handles: &HandleTable, settings: IssueSettings) {
        let Some(reply) = self.reply.take() else {
            return;
        };
        let pid = self.caller.pid;

        let result = CapabilityRegion::allocate_off_thread(settings.region_size)
            .await
            .and_then(|region| handles.install(pid, region))
            .map(|handle| CapabilityGrant {
                handle,
                protocol_version: settings.protocol_version,
                flags: settings.flags,
            });

        match &result {
            Ok(grant) => {
                let waited_ms = self
                    .ticket
                    .admitted_at()
                    .elapsed()
                    .map(|d| d.as_millis())
                    .unwrap_or(0);
                debug!(pid, handle = grant.handle, ticket = %self.ticket.id(), waited_ms, "capability installed")
            }
            Err(e) => warn!(pid, ticket = %self.ticket.id(), error = %e, "capability issuance failed"),
        }

        if let Err(Ok(grant)) = reply.send(result) {
            // Output went away; undo the install.
            handles.revoke(pid, grant.handle);
            warn!(pid, handle = grant.handle, "{}", IssueError::OutputUnavailable);
            crate::metrics::record_capability(IssueError::OutputUnavailable.error_code());
        }
    }

    /// Withdraw a job that was never queued, without reporting.
    fn abandon(mut self) {
        self.reply.take();
    }
}

impl Drop for IssueJob {
    fn drop(&mut self) {
        if let Some(reply) = self.reply.take() {
            warn!(pid = self.caller.pid, "capability issuance dropped before running");
            let _ = reply.send(Err(IssueError::Dropped));
        }
    }
}

/// Grant that will be delivered by the worker.
#[derive(Debug)]
pub struct PendingGrant {
    rx: oneshot::Receiver<GrantResult>,
}

impl PendingGrant {
    /// Wait for the worker's answer.
    pub async fn wait(self) -> GrantResult {
        self.rx.await.unwrap_or(Err(IssueError::Dropped))
    }
}

/// Posts issuance jobs to the worker.
#[derive(Clone)]
pub struct CapabilityIssuer {
    tx: mpsc::Sender<IssueJob>,
}

/// The worker half; run it on its own task.
pub struct IssueWorker {
    rx: mpsc::Receiver<IssueJob>,
    handles: Arc<HandleTable>,
    settings: IssueSettings,
}

impl CapabilityIssuer {
    pub fn new(config: &CapabilityConfig, handles: Arc<HandleTable>) -> (Self, IssueWorker) {
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let settings = IssueSettings {
            region_size: config.region_size,
            protocol_version: config.protocol_version,
            flags: config.flags,
        };
        (
            Self { tx },
            IssueWorker {
                rx,
                handles,
                settings,
            },
        )
    }

    /// Queue issuance for `caller`. Never blocks.
    ///
    /// Consumes the ticket: one admission, one capability.
    pub fn issue(
        &self,
        caller: CallerIdentity,
        ticket: AdmissionTicket,
    ) -> Result<PendingGrant, IssueError> {
        let (reply, rx) = oneshot::channel();
        let job = IssueJob {
            caller,
            ticket,
            reply: Some(reply),
        };
        match self.tx.try_send(job) {
            Ok(()) => Ok(PendingGrant { rx }),
            Err(mpsc::error::TrySendError::Full(job)) => {
                job.abandon();
                Err(IssueError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                job.abandon();
                Err(IssueError::WorkerUnavailable)
            }
        }
    }
}

impl IssueWorker {
    /// Run jobs until every issuer is dropped.
    pub async fn run(mut self) {
        info!("Capability issuance worker started");
        while let Some(job) = self.rx.recv().await {
            job.run(&self.handles, self.settings).await;
        }
        info!("Capability issuance worker stopped");
    }
}
