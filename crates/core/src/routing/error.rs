//! Routing error types.

use rust_decimal::Decimal;
use thiserror::Error;

use trezo_shared::types::{OrgUnitId, UserId};
use trezo_shared::AppError;

/// Errors from approval routing resolution.
#[derive(Debug, Clone, Error)]
pub enum RoutingError {
    /// Referenced organizational unit does not exist.
    #[error("Organizational unit {0} not found")]
    UnknownUnit(OrgUnitId),

    /// Approver configured with a level below 1.
    #[error("Approver level must be at least 1, got {0}")]
    InvalidLevel(u8),

    /// User does not resolve to an approver for the unit/level.
    #[error("User {user_id} is not an approver at level {level} for this unit")]
    NotAuthorized {
        /// The acting user.
        user_id: UserId,
        /// The level the user attempted to act at.
        level: u8,
    },

    /// Document amount exceeds the approver's ceiling.
    #[error("Amount {amount} exceeds approval ceiling {ceiling}")]
    CeilingExceeded {
        /// The document amount.
        amount: Decimal,
        /// The approver's ceiling.
        ceiling: Decimal,
    },
}

impl RoutingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownUnit(_) => "UNIT_NOT_FOUND",
            Self::InvalidLevel(_) => "INVALID_APPROVER_LEVEL",
            Self::NotAuthorized { .. } => "NOT_AN_APPROVER",
            Self::CeilingExceeded { .. } => "CEILING_EXCEEDED",
        }
    }
}

impl From<RoutingError> for AppError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::UnknownUnit(unit) => Self::NotFound(format!("unit {unit}")),
            // Bad approver configuration is caught at startup.
            RoutingError::InvalidLevel(_) => Self::Configuration(err.to_string()),
            RoutingError::NotAuthorized { .. } | RoutingError::CeilingExceeded { .. } => {
                Self::Unauthorized(err.to_string())
            }
        }
    }
}
