//! RBAC error types.

use thiserror::Error;

use trezo_shared::AppError;

/// Errors from role graph construction and permission resolution.
#[derive(Debug, Clone, Error)]
pub enum RbacError {
    /// Queried role is not in the graph.
    #[error("Role {0} is not configured")]
    UnknownRole(String),

    /// A role names a parent that is not in the graph.
    #[error("Role {role} inherits from unknown role {parent}")]
    UnknownParent {
        /// The role declaring the bad parent.
        role: String,
        /// The missing parent name.
        parent: String,
    },

    /// The inheritance graph contains a cycle.
    #[error("Role inheritance cycle detected through {0}")]
    CycleDetected(String),
}

impl RbacError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownRole(_) => "UNKNOWN_ROLE",
            Self::UnknownParent { .. } => "UNKNOWN_PARENT_ROLE",
            Self::CycleDetected(_) => "ROLE_CYCLE_DETECTED",
        }
    }
}

impl From<RbacError> for AppError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::UnknownRole(role) => Self::NotFound(format!("role {role}")),
            // Graph defects are startup configuration failures.
            RbacError::UnknownParent { .. } | RbacError::CycleDetected(_) => {
                Self::Configuration(err.to_string())
            }
        }
    }
}
