//! Ledger error types.

use thiserror::Error;

use trezo_shared::AppError;

/// Errors from ledger entry resolution and consistency checks.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// A pending entry was resolved twice.
    #[error("Ledger entry at level {level} is already resolved")]
    AlreadyResolved {
        /// The entry's approval level.
        level: i16,
    },

    /// The cached document status does not match the ledger.
    #[error("Document projection inconsistent with ledger: {0}")]
    InconsistentProjection(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyResolved { .. } => "LEDGER_ENTRY_RESOLVED",
            Self::InconsistentProjection(_) => "LEDGER_INCONSISTENT",
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AlreadyResolved { .. } => Self::InvalidState(err.to_string()),
            // Drift between projection and ledger is an internal defect.
            LedgerError::InconsistentProjection(_) => Self::Storage(err.to_string()),
        }
    }
}
