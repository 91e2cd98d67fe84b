//! Workflow error types for the approval lifecycle.

use thiserror::Error;

use trezo_shared::types::UserId;
use trezo_shared::AppError;

use crate::workflow::types::{ApprovalStatus, DocumentKind};

/// Errors that can occur during workflow state transitions.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// The requested operation is illegal for the document's current status.
    #[error("Cannot {operation} a {kind} in {status} status")]
    InvalidState {
        /// The document kind.
        kind: DocumentKind,
        /// The document's current status.
        status: ApprovalStatus,
        /// The operation attempted.
        operation: &'static str,
    },

    /// The acted-on level is no longer the document's current level.
    ///
    /// Raised when a decision races another: the document advanced (or was
    /// finalized) between the actor reading it and acting on it.
    #[error("Level {level} is already resolved; the document is at level {current}")]
    StaleLevel {
        /// The level the actor decided on.
        level: u8,
        /// The document's current level.
        current: u8,
    },

    /// Actor is not the document's requester.
    #[error("User {user_id} is not the requester of this document")]
    NotRequester {
        /// The acting user.
        user_id: UserId,
    },

    /// Submission routed to zero approval levels.
    #[error("At least one approval level is required, got {0}")]
    NoApprovalLevels(u8),
}

impl WorkflowError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::StaleLevel { .. } => "STALE_LEVEL",
            Self::NotRequester { .. } => "NOT_REQUESTER",
            Self::NoApprovalLevels(_) => "NO_APPROVAL_LEVELS",
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidState { .. } | WorkflowError::StaleLevel { .. } => {
                Self::InvalidState(err.to_string())
            }
            WorkflowError::NotRequester { .. } => Self::Forbidden(err.to_string()),
            WorkflowError::NoApprovalLevels(_) => Self::Configuration(err.to_string()),
        }
    }
}
