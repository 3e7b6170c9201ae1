//! Unified error handling for fmacd.
//!
//! Each subsystem has its own error enum with a static `error_code()` used
//! for metric labels and diagnostic log lines. Admission rejections are a
//! separate type ([`RejectReason`]) because they never cross the trust
//! boundary: callers only ever see "rejected".

use fmac_proto::ParseError;
use thiserror::Error;

// ============================================================================
// Admission (never shown to the caller)
// ============================================================================

/// Why an admission attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("challenge length outside accepted range")]
    InvalidLength,

    #[error("signature does not verify against the current code")]
    SignatureMismatch,

    #[error("code already consumed or expired")]
    ReplayDetected,

    #[error("caller uid is not on the allowlist")]
    NotAllowlisted,

    #[error("too many attempts")]
    RateLimited,
}

impl RejectReason {
    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidLength => "invalid_length",
            Self::SignatureMismatch => "signature_mismatch",
            Self::ReplayDetected => "replay_detected",
            Self::NotAllowlisted => "not_allowlisted",
            Self::RateLimited => "rate_limited",
        }
    }
}

// ============================================================================
// Key material (deployment time)
// ============================================================================

/// Deployment key material that cannot be used.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to decode {what}: {reason}")]
    DecodeFailure { what: &'static str, reason: String },

    #[error("unsupported public key: {0}")]
    UnsupportedKey(String),

    #[error("TOTP secret decodes to {0} bytes; at least 16 are required")]
    WeakSecret(usize),
}

impl KeyError {
    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DecodeFailure { .. } => "decode_failure",
            Self::UnsupportedKey(_) => "unsupported_key",
            Self::WeakSecret(_) => "weak_secret",
        }
    }
}

// ============================================================================
// Escalation
// ============================================================================

/// Escalation failures. The caller's record is unchanged in every case.
#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("no privilege record for pid {0}")]
    UnknownCaller(u32),

    #[error("failed to resolve security label {0:?}")]
    LabelResolutionFailed(String),

    #[error("privilege record for pid {0} changed during escalation")]
    CommitFailed(u32),
}

impl EscalationError {
    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCaller(_) => "unknown_caller",
            Self::LabelResolutionFailed(_) => "label_resolution_failed",
            Self::CommitFailed(_) => "commit_failed",
        }
    }
}

// ============================================================================
// Capability issuance
// ============================================================================

/// Capability issuance failures. Partially acquired resources are always
/// released before one of these is reported.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("failed to allocate capability region: {0}")]
    AllocationFailure(#[source] std::io::Error),

    #[error("failed to install handle for pid {pid}: {reason}")]
    HandleInstallFailure { pid: u32, reason: &'static str },

    #[error("caller went away before the grant could be delivered")]
    OutputUnavailable,

    #[error("issuance queue is full")]
    QueueFull,

    #[error("issuance worker is not running")]
    WorkerUnavailable,

    #[error("deferred issuance was dropped before it ran")]
    Dropped,
}

impl IssueError {
    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AllocationFailure(_) => "allocation_failure",
            Self::HandleInstallFailure { .. } => "handle_install_failure",
            Self::OutputUnavailable => "output_unavailable",
            Self::QueueFull => "queue_full",
            Self::WorkerUnavailable => "worker_unavailable",
            Self::Dropped => "dropped",
        }
    }
}

// ============================================================================
// Rules (control plane)
// ============================================================================

/// Control-plane rule errors, reported back to the administrator.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("rule table is full ({0} rules)")]
    TableFull(usize),

    #[error("no rule matches {0}")]
    NotFound(String),
}

impl RuleError {
    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "rule_parse_error",
            Self::TableFull(_) => "table_full",
            Self::NotFound(_) => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_reason_codes() {
        assert_eq!(RejectReason::InvalidLength.error_code(), "invalid_length");
        assert_eq!(RejectReason::ReplayDetected.error_code(), "replay_detected");
    }

    #[test]
    fn test_issue_error_codes() {
        let err = IssueError::AllocationFailure(std::io::Error::other("enospc"));
        assert_eq!(err.error_code(), "allocation_failure");
        assert!(err.to_string().contains("enospc"));
        assert_eq!(IssueError::Dropped.error_code(), "dropped");
    }

    #[test]
    fn test_rule_parse_error_is_transparent() {
        let err: RuleError = ParseError::UnknownCommand("x".into()).into();
        assert_eq!(err.to_string(), "unknown command: x");
        assert_eq!(err.error_code(), "rule_parse_error");
    }
}
