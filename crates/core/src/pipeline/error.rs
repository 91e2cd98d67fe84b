//! Pipeline error types.

use thiserror::Error;

use trezo_shared::AppError;

use super::types::{InstrumentStatus, PaymentRequestStatus, VoucherStatus};

/// Errors from voucher and instrument derivation.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The source document is not in a state the derivation accepts.
    #[error("Payment request is {status}, expected {expected}")]
    RequestNotReady {
        /// Current request status.
        status: PaymentRequestStatus,
        /// Required status for the operation.
        expected: PaymentRequestStatus,
    },

    /// A voucher or instrument was already derived from this source.
    // Field cannot be called `source`: thiserror reserves that name for the
    // error chain.
    #[error("A {derived} has already been derived from this {source_kind}")]
    AlreadyDerived {
        /// What the caller tried to derive.
        derived: &'static str,
        /// The source document kind.
        source_kind: &'static str,
    },

    /// The voucher is not in a state the transition accepts.
    #[error("Voucher is {status}, expected {expected}")]
    InvalidVoucherState {
        /// Current voucher status.
        status: VoucherStatus,
        /// Required status for the operation.
        expected: VoucherStatus,
    },

    /// The instrument is not in a state the transition accepts.
    #[error("Instrument is {status}, expected {expected}")]
    InvalidInstrumentState {
        /// Current instrument status.
        status: InstrumentStatus,
        /// Required status for the operation.
        expected: InstrumentStatus,
    },

    /// Voiding an instrument requires a reason.
    #[error("A reason is required to void an instrument")]
    VoidReasonRequired,
}

impl PipelineError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::RequestNotReady { .. } => "REQUEST_NOT_READY",
            Self::AlreadyDerived { .. } => "ALREADY_DERIVED",
            Self::InvalidVoucherState { .. } => "INVALID_VOUCHER_STATE",
            Self::InvalidInstrumentState { .. } => "INVALID_INSTRUMENT_STATE",
            Self::VoidReasonRequired => "VOID_REASON_REQUIRED",
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::AlreadyDerived { .. } => Self::AlreadyExists(err.to_string()),
            PipelineError::RequestNotReady { .. }
            | PipelineError::InvalidVoucherState { .. }
            | PipelineError::InvalidInstrumentState { .. }
            | PipelineError::VoidReasonRequired => Self::InvalidState(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PipelineError::AlreadyDerived {
            derived: "voucher",
            source_kind: "payment request",
        };
        assert_eq!(err.error_code(), "ALREADY_DERIVED");
        assert_eq!(PipelineError::VoidReasonRequired.error_code(), "VOID_REASON_REQUIRED");
    }

    #[test]
    fn test_app_error_mapping() {
        let err: AppError = PipelineError::AlreadyDerived {
            derived: "instrument",
            source_kind: "voucher",
        }
        .into();
        assert_eq!(err.error_code(), "ALREADY_EXISTS");
        assert_eq!(err.status_code(), 409);

        let err: AppError = PipelineError::RequestNotReady {
            status: PaymentRequestStatus::Pending,
            expected: PaymentRequestStatus::Approved,
        }
        .into();
        assert_eq!(err.error_code(), "INVALID_STATE");
    }
}
