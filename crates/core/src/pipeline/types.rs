//! Pipeline domain types: payment request phases, vouchers, and instruments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use trezo_shared::types::{InstrumentId, Money, OrgUnitId, PaymentRequestId, UserId, VoucherId};

use crate::workflow::types::ApprovalStatus;

/// Full lifecycle status of a payment request.
///
/// The first five variants mirror the generic approval chain; the rest are
/// the post-approval pipeline phases:
/// Approved → VoucherGenerated → InstrumentIssued → Disbursed.
/// Voiding the instrument lands the request back on `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRequestStatus {
    /// Being drafted.
    Draft,
    /// In the approval chain.
    Pending,
    /// Fully approved, no voucher yet.
    Approved,
    /// Rejected in the chain, or voided downstream.
    Rejected,
    /// Withdrawn before a decision.
    Cancelled,
    /// A payment voucher has been generated.
    VoucherGenerated,
    /// A disbursement instrument has been issued.
    InstrumentIssued,
    /// The instrument cleared; the request is settled.
    Disbursed,
}

impl PaymentRequestStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::VoucherGenerated => "voucher_generated",
            Self::InstrumentIssued => "instrument_issued",
            Self::Disbursed => "disbursed",
        }
    }

    /// Parses a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            "voucher_generated" => Some(Self::VoucherGenerated),
            "instrument_issued" => Some(Self::InstrumentIssued),
            "disbursed" => Some(Self::Disbursed),
            _ => None,
        }
    }

    /// Projects the status into the generic approval chain, `None` once the
    /// request has moved past the chain into the pipeline.
    #[must_use]
    pub const fn as_approval(&self) -> Option<ApprovalStatus> {
        match self {
            Self::Draft => Some(ApprovalStatus::Draft),
            Self::Pending => Some(ApprovalStatus::Pending),
            Self::Approved => Some(ApprovalStatus::Approved),
            Self::Rejected => Some(ApprovalStatus::Rejected),
            Self::Cancelled => Some(ApprovalStatus::Cancelled),
            _ => None,
        }
    }

    /// Lifts a generic approval status back into the request lifecycle.
    #[must_use]
    pub const fn from_approval(status: ApprovalStatus) -> Self {
        match status {
            ApprovalStatus::Draft => Self::Draft,
            ApprovalStatus::Pending => Self::Pending,
            ApprovalStatus::Approved => Self::Approved,
            ApprovalStatus::Rejected => Self::Rejected,
            ApprovalStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl fmt::Display for PaymentRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a payment voucher's two-step internal approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    /// Generated, awaiting verification.
    Pending,
    /// First step passed.
    Verified,
    /// Second step passed; an instrument may be issued.
    Approved,
    /// An instrument has been issued from this voucher.
    Issued,
    /// Withdrawn before issuance.
    Cancelled,
}

impl VoucherStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Approved => "approved",
            Self::Issued => "issued",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a disbursement instrument (check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentStatus {
    /// Issued and outstanding.
    Issued,
    /// Presented and cleared; the originating request is disbursed.
    Cleared,
    /// Voided; the originating request falls back to rejected.
    Voided,
}

impl InstrumentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Cleared => "cleared",
            Self::Voided => "voided",
        }
    }
}

impl fmt::Display for InstrumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payment voucher derived from an approved payment request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentVoucher {
    /// Voucher identifier.
    pub id: VoucherId,
    /// Human-readable sequence number.
    pub number: String,
    /// The payment request this voucher was generated from.
    pub request_id: PaymentRequestId,
    /// Owning organizational unit, inherited from the request.
    pub org_unit: OrgUnitId,
    /// Payee, copied from the request.
    pub payee: String,
    /// Amount, copied from the request.
    pub amount: Money,
    /// Two-step approval status.
    pub status: VoucherStatus,
    /// Who generated the voucher.
    pub generated_by: UserId,
    /// When the voucher was generated.
    pub generated_at: DateTime<Utc>,
}

/// A disbursement instrument (check) issued from an approved voucher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisbursementInstrument {
    /// Instrument identifier.
    pub id: InstrumentId,
    /// Human-readable instrument number (e.g. check number).
    pub number: String,
    /// The voucher this instrument was issued from; unique per voucher.
    pub voucher_id: VoucherId,
    /// The ancestral payment request, for settlement propagation.
    pub request_id: PaymentRequestId,
    /// Owning organizational unit.
    pub org_unit: OrgUnitId,
    /// Payee.
    pub payee: String,
    /// Amount.
    pub amount: Money,
    /// Settlement status.
    pub status: InstrumentStatus,
    /// Who issued the instrument.
    pub issued_by: UserId,
    /// When the instrument was issued.
    pub issued_at: DateTime<Utc>,
    /// When the instrument was cleared or voided.
    pub settled_at: Option<DateTime<Utc>>,
    /// The reason given when the instrument was voided.
    pub void_reason: Option<String>,
}

/// A validated pipeline transition with audit data.
///
/// Like the workflow actions, each variant names every mutation the caller
/// must persist in one transaction, including the back-propagation to the
/// originating payment request where applicable.
#[derive(Debug, Clone)]
pub enum PipelineAction {
    /// Generate a voucher from an approved payment request.
    GenerateVoucher {
        /// Status the source request moves to.
        request_status: PaymentRequestStatus,
        /// The generating user.
        generated_by: UserId,
        /// When.
        generated_at: DateTime<Utc>,
    },
    /// Verify a pending voucher (first internal step).
    VerifyVoucher {
        /// Status the voucher moves to.
        new_status: VoucherStatus,
        /// The verifying user.
        verified_by: UserId,
        /// When.
        verified_at: DateTime<Utc>,
    },
    /// Approve a verified voucher (second internal step).
    ApproveVoucher {
        /// Status the voucher moves to.
        new_status: VoucherStatus,
        /// The approving user.
        approved_by: UserId,
        /// When.
        approved_at: DateTime<Utc>,
        /// Optional comment.
        comment: Option<String>,
    },
    /// Issue an instrument from an approved voucher.
    IssueInstrument {
        /// Status the voucher moves to.
        voucher_status: VoucherStatus,
        /// Status the ancestral request moves to.
        request_status: PaymentRequestStatus,
        /// The issuing user.
        issued_by: UserId,
        /// When.
        issued_at: DateTime<Utc>,
    },
    /// Mark an instrument cleared; settles the ancestral request.
    ClearInstrument {
        /// Status the instrument moves to.
        instrument_status: InstrumentStatus,
        /// Status the ancestral request moves to.
        request_status: PaymentRequestStatus,
        /// The clearing user.
        cleared_by: UserId,
        /// When.
        cleared_at: DateTime<Utc>,
    },
    /// Void an instrument; the ancestral request falls back to rejected.
    VoidInstrument {
        /// Status the instrument moves to.
        instrument_status: InstrumentStatus,
        /// Status the ancestral request moves to.
        request_status: PaymentRequestStatus,
        /// The voiding user.
        voided_by: UserId,
        /// When.
        voided_at: DateTime<Utc>,
        /// The reason for voiding (required).
        reason: String,
    },
}
