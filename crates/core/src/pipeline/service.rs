//! Derivation and settlement rules for vouchers and instruments.

use chrono::Utc;

use trezo_shared::types::UserId;

use super::error::PipelineError;
use super::types::{
    DisbursementInstrument, InstrumentStatus, PaymentRequestStatus, PaymentVoucher, PipelineAction,
    VoucherStatus,
};

/// Stateless derivation rules for the post-approval payment pipeline.
///
/// Each method validates a transition and returns a [`PipelineAction`]
/// describing every mutation to persist. Methods never mutate their inputs;
/// the caller applies the action inside a single transaction so that a
/// derived document and its source never disagree.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstrumentPipeline;

impl InstrumentPipeline {
    /// Creates a new pipeline service.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates generating a voucher from a payment request.
    ///
    /// The request must be fully `Approved`. A request that already moved
    /// into a later phase has a voucher, so a second attempt fails with
    /// [`PipelineError::AlreadyDerived`] rather than a generic state error.
    pub fn generate_voucher(
        &self,
        request_status: PaymentRequestStatus,
        generated_by: UserId,
    ) -> Result<PipelineAction, PipelineError> {
        match request_status {
            PaymentRequestStatus::Approved => Ok(PipelineAction::GenerateVoucher {
                request_status: PaymentRequestStatus::VoucherGenerated,
                generated_by,
                generated_at: Utc::now(),
            }),
            PaymentRequestStatus::VoucherGenerated
            | PaymentRequestStatus::InstrumentIssued
            | PaymentRequestStatus::Disbursed => Err(PipelineError::AlreadyDerived {
                derived: "voucher",
                source_kind: "payment request",
            }),
            _ => Err(PipelineError::RequestNotReady {
                status: request_status,
                expected: PaymentRequestStatus::Approved,
            }),
        }
    }

    /// Validates verifying a pending voucher.
    pub fn verify_voucher(
        &self,
        voucher: &PaymentVoucher,
        verified_by: UserId,
    ) -> Result<PipelineAction, PipelineError> {
        if voucher.status != VoucherStatus::Pending {
            return Err(PipelineError::InvalidVoucherState {
                status: voucher.status,
                expected: VoucherStatus::Pending,
            });
        }
        Ok(PipelineAction::VerifyVoucher {
            new_status: VoucherStatus::Verified,
            verified_by,
            verified_at: Utc::now(),
        })
    }

    /// Validates approving a verified voucher.
    pub fn approve_voucher(
        &self,
        voucher: &PaymentVoucher,
        approved_by: UserId,
        comment: Option<String>,
    ) -> Result<PipelineAction, PipelineError> {
        if voucher.status != VoucherStatus::Verified {
            return Err(PipelineError::InvalidVoucherState {
                status: voucher.status,
                expected: VoucherStatus::Verified,
            });
        }
        Ok(PipelineAction::ApproveVoucher {
            new_status: VoucherStatus::Approved,
            approved_by,
            approved_at: Utc::now(),
            comment,
        })
    }

    /// Validates issuing an instrument from an approved voucher.
    ///
    /// The voucher moves to `Issued` and the ancestral payment request to
    /// `InstrumentIssued` in the same transaction. An already issued
    /// voucher fails with [`PipelineError::AlreadyDerived`].
    pub fn issue_instrument(
        &self,
        voucher: &PaymentVoucher,
        issued_by: UserId,
    ) -> Result<PipelineAction, PipelineError> {
        match voucher.status {
            VoucherStatus::Approved => Ok(PipelineAction::IssueInstrument {
                voucher_status: VoucherStatus::Issued,
                request_status: PaymentRequestStatus::InstrumentIssued,
                issued_by,
                issued_at: Utc::now(),
            }),
            VoucherStatus::Issued => Err(PipelineError::AlreadyDerived {
                derived: "instrument",
                source_kind: "voucher",
            }),
            status => Err(PipelineError::InvalidVoucherState {
                status,
                expected: VoucherStatus::Approved,
            }),
        }
    }

    /// Validates clearing an issued instrument.
    ///
    /// Clearing settles the ancestral payment request as `Disbursed`.
    pub fn clear_instrument(
        &self,
        instrument: &DisbursementInstrument,
        cleared_by: UserId,
    ) -> Result<PipelineAction, PipelineError> {
        if instrument.status != InstrumentStatus::Issued {
            return Err(PipelineError::InvalidInstrumentState {
                status: instrument.status,
                expected: InstrumentStatus::Issued,
            });
        }
        Ok(PipelineAction::ClearInstrument {
            instrument_status: InstrumentStatus::Cleared,
            request_status: PaymentRequestStatus::Disbursed,
            cleared_by,
            cleared_at: Utc::now(),
        })
    }

    /// Validates voiding an issued instrument.
    ///
    /// Voiding is terminal for the instrument and drops the ancestral
    /// payment request back to `Rejected`. A non-empty reason is required.
    pub fn void_instrument(
        &self,
        instrument: &DisbursementInstrument,
        voided_by: UserId,
        reason: &str,
    ) -> Result<PipelineAction, PipelineError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PipelineError::VoidReasonRequired);
        }
        if instrument.status != InstrumentStatus::Issued {
            return Err(PipelineError::InvalidInstrumentState {
                status: instrument.status,
                expected: InstrumentStatus::Issued,
            });
        }
        Ok(PipelineAction::VoidInstrument {
            instrument_status: InstrumentStatus::Voided,
            request_status: PaymentRequestStatus::Rejected,
            voided_by,
            voided_at: Utc::now(),
            reason: reason.to_string(),
        })
    }

    /// Formats a voucher number from an opaque sequence value.
    #[must_use]
    pub fn voucher_number(sequence: u64) -> String {
        format!("PV-{sequence:06}")
    }

    /// Formats an instrument number from an opaque sequence value.
    #[must_use]
    pub fn instrument_number(sequence: u64) -> String {
        format!("DI-{sequence:06}")
    }
}
