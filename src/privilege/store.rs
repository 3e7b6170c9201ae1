//! Credential storage and security label resolution.
//!
//! Both are traits so the escalation logic does not care whether records
//! live in this process or in an external enforcement point.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use super::record::PrivilegeRecord;
use crate::caller::CallerIdentity;
use crate::config::EscalationConfig;
use crate::error::EscalationError;

/// Source of truth for caller privilege records.
pub trait CredentialStore: Send + Sync {
    /// Copy of the caller's current record.
    fn snapshot(&self, pid: u32) -> Option<PrivilegeRecord>;

    /// Replace the caller's record in one step.
    ///
    /// `record.generation` must equal the generation of the record being
    /// replaced; otherwise nothing changes and `CommitFailed` is returned.
    fn commit(&self, pid: u32, record: PrivilegeRecord) -> Result<(), EscalationError>;
}

/// Resolves human-readable security labels to policy identifiers.
pub trait LabelResolver: Send + Sync {
    /// Whether a mandatory access control policy is loaded.
    fn is_enabled(&self) -> bool;

    fn resolve(&self, label: &str) -> Option<u32>;
}

/// In-process credential store, seeded from peer credentials.
#[derive(Debug)]
pub struct MemoryCredentialStore {
    records: DashMap<u32, PrivilegeRecord>,
    initial_label: String,
}

impl MemoryCredentialStore {
    pub fn new(initial_label: impl Into<String>) -> Self {
        Self {
            records: DashMap::new(),
            initial_label: initial_label.into(),
        }
    }

    /// Ensure a record exists for `caller`.
    ///
    /// A record whose real uid no longer matches the peer belongs to a
    /// recycled pid and is replaced.
    pub fn observe(&self, caller: &CallerIdentity) {
        match self.records.entry(caller.pid) {
            Entry::Occupied(mut entry) => {
                if entry.get().uid.real != caller.uid && !entry.get().is_administrative() {
                    debug!(pid = caller.pid, "pid reused; resetting privilege record");
                    entry.insert(self.fresh(caller));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(self.fresh(caller));
            }
        }
    }

    /// Drop the record of a caller that went away.
    pub fn forget(&self, pid: u32) {
        self.records.remove(&pid);
    }

    fn fresh(&self, caller: &CallerIdentity) -> PrivilegeRecord {
        PrivilegeRecord::unprivileged(caller.uid, caller.gid, self.initial_label.clone())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn snapshot(&self, pid: u32) -> Option<PrivilegeRecord> {
        self.records.get(&pid).map(|r| r.value().clone())
    }

    fn commit(&self, pid: u32, mut record: PrivilegeRecord) -> Result<(), EscalationError> {
        match self.records.entry(pid) {
            Entry::Occupied(mut entry) if entry.get().generation == record.generation => {
                record.generation += 1;
                entry.insert(record);
                Ok(())
            }
            _ => Err(EscalationError::CommitFailed(pid)),
        }
    }
}

/// Label policy taken from configuration. Identifiers are 1-based
/// positions in `known_labels`.
#[derive(Debug, Clone)]
pub struct StaticLabelPolicy {
    enabled: bool,
    labels: Vec<String>,
}

impl StaticLabelPolicy {
    pub fn new(enabled: bool, labels: Vec<String>) -> Self {
        Self { enabled, labels }
    }

    pub fn from_config(config: &EscalationConfig) -> Self {
        Self::new(config.mac_enabled, config.known_labels.clone())
    }
}

impl LabelResolver for StaticLabelPolicy {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn resolve(&self, label: &str) -> Option<u32> {
        self.labels
            .iter()
            .position(|known| known == label)
            .and_then(|i| u32::try_from(i + 1).ok())
    }
}
