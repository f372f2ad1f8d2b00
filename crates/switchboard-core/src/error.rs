//! Error taxonomy shared by the registry, the relay, and the API.
//!
//! Closed set: every failure a caller can observe is one of these variants,
//! each carrying the structured fields needed to report it (url, cause,
//! status code) rather than an opaque message.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwitchboardError {
    /// Malformed registration or message payload. Rejected before any
    /// state change.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Peer id not present in the registry at resolve time.
    #[error("peer {id} is not registered")]
    NotFound { id: String },

    /// Connection-level failure reaching a resolved address.
    #[error("peer unreachable at {url}: {cause}")]
    Unreachable { url: String, cause: String },

    /// Attempt exceeded its deadline.
    #[error("request to {url} timed out after {after_ms}ms")]
    Timeout { url: String, after_ms: u64 },

    /// Peer reachable but answered with an unexpected status or body.
    #[error("unexpected response from {url} (status {status:?}): {detail}")]
    Protocol {
        url: String,
        status: Option<u16>,
        detail: String,
    },

    /// Every target of a relay request failed. Carries each failure in
    /// request order.
    #[error("delivery failed for all {} targets", failures.len())]
    AllTargetsFailed {
        failures: Vec<(String, SwitchboardError)>,
    },
}

impl SwitchboardError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Short machine-readable tag, used in JSON delivery reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Unreachable { .. } => "unreachable",
            Self::Timeout { .. } => "timeout",
            Self::Protocol { .. } => "protocol",
            Self::AllTargetsFailed { .. } => "all_targets_failed",
        }
    }

    /// Transport-level failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }
}
