//! Proof of admission.

use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

/// An unforgeable proof that one challenge was admitted.
///
/// Only the [`AdmissionEngine`](super::AdmissionEngine) can mint tickets
/// (`pub(super)` constructor). Tickets are neither `Clone` nor `Copy`:
/// escalation borrows one, capability issuance consumes it, so a single
/// admission yields at most one capability.
pub struct AdmissionTicket {
    id: Uuid,
    admitted_at: SystemTime,
}

impl AdmissionTicket {
    #[inline]
    pub(super) fn mint(admitted_at: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            admitted_at,
        }
    }

    /// Correlation id for logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn admitted_at(&self) -> SystemTime {
        self.admitted_at
    }

    /// Mint a ticket without a challenge, for exercising privileged paths.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::mint(SystemTime::now())
    }
}

impl fmt::Debug for AdmissionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionTicket").field("id", &self.id).finish()
    }
}
