//! Gateway error type.

use director_core::{CollaboratorError, ValidationError};
use thiserror::Error;

/// Why a gateway command failed. Shared state is unchanged in every case.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request was malformed; no collaborator was contacted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The collaborator call failed.
    #[error("{command} failed: {source}")]
    Collaborator {
        /// Command name, e.g. `console.connect`.
        command: &'static str,
        /// Underlying failure.
        source: CollaboratorError,
    },
}

impl GatewayError {
    /// Stable error code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Collaborator { .. } => "COLLABORATOR_ERROR",
        }
    }

    /// Whether the caller sent a bad request.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
