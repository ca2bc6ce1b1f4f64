//! Core error types.
//!
//! Semantic error kinds shared by the decision pipeline and the scheduling
//! engine. Transient upstream failures are recovered locally (model fallback,
//! publish retry); every other kind is surfaced to the caller.

use thiserror::Error;

/// Core error type for the decision and scheduling engines.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid input or configuration; never retried
    #[error("validation error: {0}")]
    Validation(String),

    /// A scheduling conflict the caller opted not to allow
    #[error("scheduling conflict: {0}")]
    Conflict(String),

    /// Decision pool is full; the caller gets an immediate rejection
    #[error("capacity exceeded: {in_flight} decisions in flight (max {max})")]
    CapacityExceeded { in_flight: usize, max: usize },

    /// The pipeline missed its deadline
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Referenced entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Operation forbidden in the entity's current state
    #[error("invalid state: {0}")]
    State(String),

    /// Upstream failure worth retrying (network, rate limit)
    #[error("transient upstream failure: {0}")]
    TransientUpstream(String),

    /// Upstream failure that must not be retried (content validation, auth)
    #[error("terminal upstream failure: {0}")]
    TerminalUpstream(String),

    /// Storage-layer failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether a retry may succeed. Only transient upstream failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::TransientUpstream(_))
    }

    /// Stable kind label for metrics and audit rows
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::Conflict(_) => "conflict",
            CoreError::CapacityExceeded { .. } => "capacity_exceeded",
            CoreError::Timeout { .. } => "timeout",
            CoreError::NotFound { .. } => "not_found",
            CoreError::State(_) => "state",
            CoreError::TransientUpstream(_) => "transient_upstream",
            CoreError::TerminalUpstream(_) => "terminal_upstream",
            CoreError::Storage(_) => "storage",
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Storage(format!("serialization: {err}"))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(CoreError::TransientUpstream("rate limited".into()).is_retryable());
        assert!(!CoreError::TerminalUpstream("auth failed".into()).is_retryable());
        assert!(!CoreError::Validation("bad weights".into()).is_retryable());
        assert!(!CoreError::Timeout { timeout_ms: 500 }.is_retryable());
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(
            CoreError::CapacityExceeded {
                in_flight: 8,
                max: 8
            }
            .kind(),
            "capacity_exceeded"
        );
        assert_eq!(CoreError::not_found("schedule", "s1").kind(), "not_found");
    }
}
