//! Error types for canvas sessions and external collaborators.

use thiserror::Error;

use crate::contour::{ContourError, ContourId};
use crate::pending::Operation;

/// Failures reported by an external collaborator (segmentation service,
/// persistence backend).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The service could not be reached or timed out
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with an error
    #[error("Request rejected: {message}")]
    Rejected {
        /// Message from the service
        message: String,
    },

    /// Referenced contour is unknown to the backend
    #[error("Contour not found: {id}")]
    ContourNotFound {
        /// The missing contour ID
        id: ContourId,
    },

    /// Response could not be interpreted
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ServiceError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

impl From<ContourError> for ServiceError {
    fn from(e: ContourError) -> Self {
        ServiceError::Malformed(e.to_string())
    }
}

/// Errors surfaced to the user by session operations. None are fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Input rejected before any external call
    #[error("{message}")]
    InvalidInput {
        /// Description of what is wrong
        message: String,
    },

    /// The same operation is already running
    #[error("{0} is already in progress")]
    OperationInProgress(Operation),

    /// The response belongs to an image or session that is no longer active
    #[error("Discarded stale {0} response")]
    StaleResponse(Operation),

    /// No image is loaded
    #[error("No active image")]
    NoImage,

    /// The collaborator failed
    #[error("{operation} failed: {source}")]
    Service {
        /// Which operation failed
        operation: Operation,
        /// Underlying failure
        #[source]
        source: ServiceError,
    },
}

impl SessionError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn service(operation: Operation, source: ServiceError) -> Self {
        Self::Service { operation, source }
    }

    /// Whether this error is a discarded stale response rather than a failure.
    pub fn is_stale(&self) -> bool {
        matches!(self, SessionError::StaleResponse(_))
    }
}
