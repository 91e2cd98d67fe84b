//! Workflow domain types for the approval lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use trezo_shared::types::{Money, OrgUnitId, UserId};

/// The kinds of approvable documents the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Purchase/service requisition.
    Requisition,
    /// Payment request.
    PaymentRequest,
    /// Payment voucher derived from an approved payment request.
    PaymentVoucher,
    /// Disbursement instrument (check) derived from an approved voucher.
    DisbursementInstrument,
}

impl DocumentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Requisition => "requisition",
            Self::PaymentRequest => "payment_request",
            Self::PaymentVoucher => "payment_voucher",
            Self::DisbursementInstrument => "disbursement_instrument",
        }
    }

    /// Parses a kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requisition" => Some(Self::Requisition),
            "payment_request" => Some(Self::PaymentRequest),
            "payment_voucher" => Some(Self::PaymentVoucher),
            "disbursement_instrument" => Some(Self::DisbursementInstrument),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a document in the multi-level approval chain.
///
/// The valid transitions are:
/// - Draft → Pending (submit)
/// - Pending → Approved (approve at the final level)
/// - Pending → Rejected (reject)
/// - Draft | Pending → Cancelled (cancel)
/// - Rejected → Draft (resubmit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Document is being drafted and can be modified.
    Draft,
    /// Document has been submitted and awaits approval at some level.
    Pending,
    /// Document has collected every required approval.
    Approved,
    /// Document was rejected at some level.
    Rejected,
    /// Document was withdrawn before reaching a decision.
    Cancelled,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
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
            _ => None,
        }
    }

    /// Returns true if the document payload may still be edited.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if no further approval-workflow transition is legal.
    ///
    /// `Rejected` is terminal for the approval chain itself; a separate
    /// resubmit operation may return the document to `Draft`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Cancelled)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The capability set the generic state machine operates on.
///
/// Every approvable document exposes this head; entity-specific payload
/// (line items, payee) stays outside the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHead {
    /// Document kind.
    pub kind: DocumentKind,
    /// Document identity (the typed id's inner UUID).
    pub id: Uuid,
    /// Human-readable sequence number; opaque to the engine.
    pub number: String,
    /// Owning organizational unit.
    pub org_unit: OrgUnitId,
    /// The user who created the document.
    pub requester: UserId,
    /// Total document amount.
    pub amount: Money,
    /// Current approval status.
    pub status: ApprovalStatus,
    /// Current approval level; 0 = not yet submitted.
    pub current_level: u8,
    /// Levels required to fully approve; fixed at submission time.
    pub max_level: u8,
}

impl DocumentHead {
    /// Creates a head in the initial Draft status.
    #[must_use]
    pub fn draft(
        kind: DocumentKind,
        id: Uuid,
        number: impl Into<String>,
        org_unit: OrgUnitId,
        requester: UserId,
        amount: Money,
    ) -> Self {
        Self {
            kind,
            id,
            number: number.into(),
            org_unit,
            requester,
            amount,
            status: ApprovalStatus::Draft,
            current_level: 0,
            max_level: 0,
        }
    }
}

/// Outcome of an approval at the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproveOutcome {
    /// More levels remain; the document advances to `next_level`.
    Advance {
        /// The level now awaiting action.
        next_level: u8,
    },
    /// This was the final level; the document is fully approved.
    Finalize,
}

/// A validated state transition with audit data.
///
/// Each variant captures what the caller must persist: the status/level
/// mutation and the ledger entries to append or resolve, all in one
/// transaction.
#[derive(Debug, Clone)]
pub enum ApprovalAction {
    /// Submit a draft into the approval chain.
    Submit {
        /// Levels for which a pending ledger entry must be written (1..=max).
        pending_levels: Vec<u8>,
        /// Levels required for full approval, from the routing resolver.
        max_level: u8,
        /// The user who submitted the document.
        submitted_by: UserId,
        /// When the document was submitted.
        submitted_at: DateTime<Utc>,
    },
    /// Approve at the current level.
    Approve {
        /// The level being resolved.
        level: u8,
        /// Advance or finalize.
        outcome: ApproveOutcome,
        /// The approving user.
        approved_by: UserId,
        /// When the approval happened.
        approved_at: DateTime<Utc>,
        /// Optional approver comment.
        comment: Option<String>,
    },
    /// Reject at the current level.
    Reject {
        /// The level being resolved.
        level: u8,
        /// The rejecting user.
        rejected_by: UserId,
        /// When the rejection happened.
        rejected_at: DateTime<Utc>,
        /// Optional rejection reason.
        reason: Option<String>,
    },
    /// Withdraw a draft or pending document.
    Cancel {
        /// The cancelling user.
        cancelled_by: UserId,
        /// When the cancellation happened.
        cancelled_at: DateTime<Utc>,
    },
    /// Return a rejected document to Draft for another round.
    Resubmit {
        /// The user who reopened the document.
        reopened_by: UserId,
        /// When the document was reopened.
        reopened_at: DateTime<Utc>,
    },
}

impl ApprovalAction {
    /// Returns the status the document holds after this action.
    #[must_use]
    pub const fn new_status(&self) -> ApprovalStatus {
        match self {
            Self::Submit { .. } => ApprovalStatus::Pending,
            Self::Approve { outcome, .. } => match outcome {
                ApproveOutcome::Advance { .. } => ApprovalStatus::Pending,
                ApproveOutcome::Finalize => ApprovalStatus::Approved,
            },
            Self::Reject { .. } => ApprovalStatus::Rejected,
            Self::Cancel { .. } => ApprovalStatus::Cancelled,
            Self::Resubmit { .. } => ApprovalStatus::Draft,
        }
    }
}
