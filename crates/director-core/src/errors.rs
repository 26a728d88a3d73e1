//! Error types shared across the Director crates.
//!
//! - [`ValidationError`]: malformed input, rejected before any state mutation
//! - [`CollaboratorError`]: an external integration (console, audio engine,
//!   cue generator) failed; shared state is left unchanged

use thiserror::Error;

/// Input rejected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field, as it appears on the wire.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    /// Build a validation error for `field`.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Failure reported by an external collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The remote endpoint could not be reached.
    #[error("{target} unreachable: {reason}")]
    Unreachable {
        /// What was being contacted (e.g. `console at 10.0.0.5:30000`).
        target: String,
        /// Underlying cause.
        reason: String,
    },

    /// The operation did not complete in time.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Operation name.
        operation: &'static str,
        /// Elapsed budget in milliseconds.
        timeout_ms: u64,
    },

    /// The resource is already in use.
    #[error("{0} is busy")]
    Busy(String),

    /// An operation required a live connection that does not exist.
    #[error("not connected to {0}")]
    NotConnected(&'static str),

    /// The collaborator refused the request.
    #[error("{0}")]
    Rejected(String),

    /// Transport-level I/O failure.
    #[error("i/o error: {0}")]
    Io(String),
}

impl CollaboratorError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::Timeout { .. } => "timeout",
            Self::Busy(_) => "busy",
            Self::NotConnected(_) => "not_connected",
            Self::Rejected(_) => "rejected",
            Self::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for CollaboratorError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
