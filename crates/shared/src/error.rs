//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// This is the taxonomy the transport layer sees. Domain crates define their
/// own error enums and convert into `AppError` at the engine boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource (document, approver, unit) not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation is illegal for the entity's current status.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Actor lacks the resolved permission or approval-level authority.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Actor identity mismatch (e.g. not the requester).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate derivation attempt (e.g. voucher already generated).
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Invalid startup configuration (cyclic role graph, unknown parent).
    /// Fatal: detected once at load time, the process does not start.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidState(_) => 409,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::AlreadyExists(_) => 409,
            Self::Configuration(_) | Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns true if the error is fatal at startup rather than per-call.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
