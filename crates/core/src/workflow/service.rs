//! State transition logic for the approval lifecycle.
//!
//! All methods are associated functions: they validate a transition against
//! a [`DocumentHead`] and return the [`ApprovalAction`] the caller must
//! apply, together with its ledger writes, in one atomic transaction.
//! Authorization (routing, RBAC) is the caller's concern; this service only
//! enforces the state machine and requester identity.

use chrono::Utc;

use trezo_shared::types::UserId;

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{ApprovalAction, ApprovalStatus, ApproveOutcome, DocumentHead};

/// Stateless service for approval workflow transitions.
pub struct ApprovalService;

impl ApprovalService {
    /// Submit a draft document into the approval chain.
    ///
    /// Legal only from `Draft`; the actor must be the requester. The caller
    /// supplies `max_level` from the routing resolver; the action carries
    /// the pending ledger entries to create for levels `1..=max_level`.
    ///
    /// # Errors
    ///
    /// `InvalidState` if not in Draft, `NotRequester` if the actor is not
    /// the document's requester, `NoApprovalLevels` if `max_level` is 0.
    pub fn submit(
        head: &DocumentHead,
        actor: UserId,
        max_level: u8,
    ) -> Result<ApprovalAction, WorkflowError> {
        if head.status != ApprovalStatus::Draft {
            return Err(WorkflowError::InvalidState {
                kind: head.kind,
                status: head.status,
                operation: "submit",
            });
        }
        if head.requester != actor {
            return Err(WorkflowError::NotRequester { user_id: actor });
        }
        if max_level < 1 {
            return Err(WorkflowError::NoApprovalLevels(max_level));
        }

        Ok(ApprovalAction::Submit {
            pending_levels: (1..=max_level).collect(),
            max_level,
            submitted_by: actor,
            submitted_at: Utc::now(),
        })
    }

    /// Approve the document at `level`.
    ///
    /// Legal only from `Pending`, and only when `level` is still the
    /// document's current level: the actor decides on the level they read,
    /// so a decision that raced another and lost fails instead of silently
    /// resolving the next level. If the current level is below the
    /// document's max level the action advances to the next level; otherwise
    /// it finalizes the document as `Approved`.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the document is not pending, `StaleLevel` if the
    /// document has moved past `level`.
    pub fn approve(
        head: &DocumentHead,
        level: u8,
        actor: UserId,
        comment: Option<String>,
    ) -> Result<ApprovalAction, WorkflowError> {
        if head.status != ApprovalStatus::Pending {
            return Err(WorkflowError::InvalidState {
                kind: head.kind,
                status: head.status,
                operation: "approve",
            });
        }
        if head.current_level != level {
            return Err(WorkflowError::StaleLevel {
                level,
                current: head.current_level,
            });
        }

        let outcome = if head.current_level < head.max_level {
            ApproveOutcome::Advance {
                next_level: head.current_level + 1,
            }
        } else {
            ApproveOutcome::Finalize
        };

        Ok(ApprovalAction::Approve {
            level: head.current_level,
            outcome,
            approved_by: actor,
            approved_at: Utc::now(),
            comment,
        })
    }

    /// Reject the document at `level`.
    ///
    /// Legal only from `Pending`, with the same stale-level guard as
    /// [`Self::approve`]. The level does not advance; no further approvals
    /// are possible without resubmission.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the document is not pending, `StaleLevel` if the
    /// document has moved past `level`.
    pub fn reject(
        head: &DocumentHead,
        level: u8,
        actor: UserId,
        reason: Option<String>,
    ) -> Result<ApprovalAction, WorkflowError> {
        if head.status != ApprovalStatus::Pending {
            return Err(WorkflowError::InvalidState {
                kind: head.kind,
                status: head.status,
                operation: "reject",
            });
        }
        if head.current_level != level {
            return Err(WorkflowError::StaleLevel {
                level,
                current: head.current_level,
            });
        }

        Ok(ApprovalAction::Reject {
            level: head.current_level,
            rejected_by: actor,
            rejected_at: Utc::now(),
            reason,
        })
    }

    /// Withdraw a draft or pending document.
    ///
    /// Legal from `Draft` or `Pending`, never from a terminal status. The
    /// actor must be the requester unless `admin_override` is set (the
    /// caller grants that from the `workflow:cancel:any` permission).
    ///
    /// # Errors
    ///
    /// `InvalidState` for terminal statuses, `NotRequester` when a
    /// non-requester cancels without the override.
    pub fn cancel(
        head: &DocumentHead,
        actor: UserId,
        admin_override: bool,
    ) -> Result<ApprovalAction, WorkflowError> {
        if !matches!(
            head.status,
            ApprovalStatus::Draft | ApprovalStatus::Pending
        ) {
            return Err(WorkflowError::InvalidState {
                kind: head.kind,
                status: head.status,
                operation: "cancel",
            });
        }
        if head.requester != actor && !admin_override {
            return Err(WorkflowError::NotRequester { user_id: actor });
        }

        Ok(ApprovalAction::Cancel {
            cancelled_by: actor,
            cancelled_at: Utc::now(),
        })
    }

    /// Return a rejected document to `Draft` for another round.
    ///
    /// Resets the current level to 0; the old ledger stream is retained and
    /// a fresh submission appends new entries.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the document is not rejected, `NotRequester` if
    /// the actor is not the requester.
    pub fn resubmit(head: &DocumentHead, actor: UserId) -> Result<ApprovalAction, WorkflowError> {
        if head.status != ApprovalStatus::Rejected {
            return Err(WorkflowError::InvalidState {
                kind: head.kind,
                status: head.status,
                operation: "resubmit",
            });
        }
        if head.requester != actor {
            return Err(WorkflowError::NotRequester { user_id: actor });
        }

        Ok(ApprovalAction::Resubmit {
            reopened_by: actor,
            reopened_at: Utc::now(),
        })
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Draft → Pending (submit)
    /// - Pending → Approved (final approve)
    /// - Pending → Rejected (reject)
    /// - Draft | Pending → Cancelled (cancel)
    /// - Rejected → Draft (resubmit)
    #[must_use]
    pub fn is_valid_transition(from: ApprovalStatus, to: ApprovalStatus) -> bool {
        matches!(
            (from, to),
            (
                ApprovalStatus::Draft,
                ApprovalStatus::Pending | ApprovalStatus::Cancelled
            ) | (
                ApprovalStatus::Pending,
                ApprovalStatus::Approved | ApprovalStatus::Rejected | ApprovalStatus::Cancelled
            ) | (ApprovalStatus::Rejected, ApprovalStatus::Draft)
        )
    }

    /// Apply an action to a head, producing the updated head.
    ///
    /// This is the single place status and level move; storage layers call
    /// it inside their transaction so the cached projection always matches
    /// the ledger writes derived from the same action.
    #[must_use]
    pub fn apply(head: &DocumentHead, action: &ApprovalAction) -> DocumentHead {
        let mut updated = head.clone();
        updated.status = action.new_status();
        match action {
            ApprovalAction::Submit { max_level, .. } => {
                updated.current_level = 1;
                updated.max_level = *max_level;
            }
            ApprovalAction::Approve { outcome, .. } => {
                if let ApproveOutcome::Advance { next_level } = outcome {
                    updated.current_level = *next_level;
                }
            }
            ApprovalAction::Resubmit { .. } => {
                updated.current_level = 0;
            }
            // Reject keeps the level for audit; Cancel leaves it untouched.
            ApprovalAction::Reject { .. } | ApprovalAction::Cancel { .. } => {}
        }
        updated
    }
}
