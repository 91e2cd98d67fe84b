//! Ledger entries, ordering helpers, and the projection consistency check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trezo_shared::types::{LedgerEntryId, UserId};

use crate::ledger::error::LedgerError;
use crate::workflow::types::{ApprovalStatus, DocumentHead, DocumentKind};

/// Level marker for submission entries.
pub const LEVEL_SUBMISSION: i16 = 0;
/// Level marker for cancellation entries.
pub const LEVEL_CANCELLATION: i16 = -1;

/// One immutable lifecycle event in a document's approval history.
///
/// The three actor fields are mutually exclusive: an entry records a
/// submission, an approval, or a rejection, never more than one. An entry
/// with a positive level and no actor is pending — the entry currently
/// awaiting action at that level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry identifier.
    pub id: LedgerEntryId,
    /// Kind of the referenced document.
    pub document_kind: DocumentKind,
    /// Identity of the referenced document (reference, not ownership).
    pub document_id: Uuid,
    /// Approval level: 0 = submission, -1 = cancellation, N ≥ 1 = level N.
    pub level: i16,
    /// Set on submission entries.
    pub submitted_by: Option<UserId>,
    /// Set when a pending entry is resolved as approved.
    pub approved_by: Option<UserId>,
    /// Set when a pending entry is resolved as rejected.
    pub rejected_by: Option<UserId>,
    /// Free-text comment or reason.
    pub comment: Option<String>,
    /// When the entry was written or resolved.
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// A level-0 entry recording who submitted the document.
    #[must_use]
    pub fn submission(
        kind: DocumentKind,
        document_id: Uuid,
        submitted_by: UserId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            document_kind: kind,
            document_id,
            level: LEVEL_SUBMISSION,
            submitted_by: Some(submitted_by),
            approved_by: None,
            rejected_by: None,
            comment: None,
            recorded_at: at,
        }
    }

    /// A pending entry awaiting action at the given approval level.
    #[must_use]
    pub fn pending(kind: DocumentKind, document_id: Uuid, level: u8, at: DateTime<Utc>) -> Self {
        Self {
            id: LedgerEntryId::new(),
            document_kind: kind,
            document_id,
            level: i16::from(level),
            submitted_by: None,
            approved_by: None,
            rejected_by: None,
            comment: None,
            recorded_at: at,
        }
    }

    /// A level -1 entry marking a cancellation.
    #[must_use]
    pub fn cancellation(
        kind: DocumentKind,
        document_id: Uuid,
        cancelled_by: UserId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            document_kind: kind,
            document_id,
            level: LEVEL_CANCELLATION,
            submitted_by: Some(cancelled_by),
            approved_by: None,
            rejected_by: None,
            comment: None,
            recorded_at: at,
        }
    }

    /// True when the entry awaits action at a positive approval level.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.level >= 1
            && self.submitted_by.is_none()
            && self.approved_by.is_none()
            && self.rejected_by.is_none()
    }

    /// Resolves a pending entry as approved.
    ///
    /// # Errors
    ///
    /// `LedgerError::AlreadyResolved` if the entry is not pending.
    pub fn resolve_approved(
        &mut self,
        actor: UserId,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if !self.is_pending() {
            return Err(LedgerError::AlreadyResolved { level: self.level });
        }
        self.approved_by = Some(actor);
        self.comment = comment;
        self.recorded_at = at;
        Ok(())
    }

    /// Resolves a pending entry as rejected.
    ///
    /// # Errors
    ///
    /// `LedgerError::AlreadyResolved` if the entry is not pending.
    pub fn resolve_rejected(
        &mut self,
        actor: UserId,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if !self.is_pending() {
            return Err(LedgerError::AlreadyResolved { level: self.level });
        }
        self.rejected_by = Some(actor);
        self.comment = reason;
        self.recorded_at = at;
        Ok(())
    }
}

/// Returns the entries sorted chronologically (stable on id for equal times).
#[must_use]
pub fn chronological(entries: &[LedgerEntry]) -> Vec<LedgerEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)));
    sorted
}

/// Returns the entries sorted by level, then chronologically within a level.
#[must_use]
pub fn by_level(entries: &[LedgerEntry]) -> Vec<LedgerEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then(a.recorded_at.cmp(&b.recorded_at))
            .then(a.id.cmp(&b.id))
    });
    sorted
}

/// Index of the pending entry at `level`, scanning the latest stream first.
#[must_use]
pub fn pending_at(entries: &[LedgerEntry], level: u8) -> Option<usize> {
    entries
        .iter()
        .rposition(|e| e.level == i16::from(level) && e.is_pending())
}

/// Validates the cached head projection against the ledger.
///
/// Only the latest stream (entries at or after the last submission entry) is
/// inspected; earlier streams belong to previous submission rounds and stay
/// untouched for audit.
///
/// # Errors
///
/// `LedgerError::InconsistentProjection` when the head's status/level cannot
/// be derived from the ledger.
pub fn check_consistency(head: &DocumentHead, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
    let ordered = chronological(entries);
    let stream_start = ordered
        .iter()
        .rposition(|e| e.level == LEVEL_SUBMISSION)
        .unwrap_or(0);
    let stream = &ordered[stream_start..];

    match head.status {
        ApprovalStatus::Draft => Ok(()),
        ApprovalStatus::Pending => {
            if !stream.iter().any(|e| e.level == LEVEL_SUBMISSION) {
                return Err(LedgerError::InconsistentProjection(
                    "pending document has no submission entry".to_string(),
                ));
            }
            let pending_here = stream
                .iter()
                .filter(|e| e.level == i16::from(head.current_level) && e.is_pending())
                .count();
            if pending_here != 1 {
                return Err(LedgerError::InconsistentProjection(format!(
                    "expected 1 pending entry at level {}, found {pending_here}",
                    head.current_level
                )));
            }
            Ok(())
        }
        ApprovalStatus::Approved => {
            let unresolved = stream
                .iter()
                .filter(|e| e.is_pending() && e.level <= i16::from(head.max_level))
                .count();
            if unresolved != 0 {
                return Err(LedgerError::InconsistentProjection(format!(
                    "approved document still has {unresolved} pending entries"
                )));
            }
            Ok(())
        }
        ApprovalStatus::Rejected => {
            let rejected_here = stream
                .iter()
                .any(|e| e.level == i16::from(head.current_level) && e.rejected_by.is_some());
            if rejected_here {
                Ok(())
            } else {
                Err(LedgerError::InconsistentProjection(format!(
                    "rejected document has no rejection entry at level {}",
                    head.current_level
                )))
            }
        }
        ApprovalStatus::Cancelled => {
            if stream.iter().any(|e| e.level == LEVEL_CANCELLATION) {
                Ok(())
            } else {
                Err(LedgerError::InconsistentProjection(
                    "cancelled document has no cancellation entry".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trezo_shared::types::{Currency, Money, OrgUnitId};

    fn head(status: ApprovalStatus, level: u8, max: u8) -> DocumentHead {
        let mut h = DocumentHead::draft(
            DocumentKind::Requisition,
            Uuid::now_v7(),
            "RQ-0001",
            OrgUnitId::new(),
            UserId::new(),
            Money::new(dec!(100), Currency::Usd),
        );
        h.status = status;
        h.current_level = level;
        h.max_level = max;
        h
    }

    fn stream_for(doc: Uuid, max: u8, now: DateTime<Utc>) -> Vec<LedgerEntry> {
        let mut entries = vec![LedgerEntry::submission(
            DocumentKind::Requisition,
            doc,
            UserId::new(),
            now,
        )];
        for level in 1..=max {
            entries.push(LedgerEntry::pending(
                DocumentKind::Requisition,
                doc,
                level,
                now,
            ));
        }
        entries
    }

    #[test]
    fn test_entry_kinds() {
        let doc = Uuid::now_v7();
        let now = Utc::now();

        let submission =
            LedgerEntry::submission(DocumentKind::PaymentRequest, doc, UserId::new(), now);
        assert_eq!(submission.level, LEVEL_SUBMISSION);
        assert!(!submission.is_pending());
        assert!(submission.submitted_by.is_some());

        let pending = LedgerEntry::pending(DocumentKind::PaymentRequest, doc, 2, now);
        assert_eq!(pending.level, 2);
        assert!(pending.is_pending());

        let cancellation =
            LedgerEntry::cancellation(DocumentKind::PaymentRequest, doc, UserId::new(), now);
        assert_eq!(cancellation.level, LEVEL_CANCELLATION);
        assert!(!cancellation.is_pending());
    }

    #[test]
    fn test_resolution_is_single_shot() {
        let doc = Uuid::now_v7();
        let now = Utc::now();
        let approver = UserId::new();

        let mut entry = LedgerEntry::pending(DocumentKind::Requisition, doc, 1, now);
        entry
            .resolve_approved(approver, Some("ok".to_string()), now)
            .unwrap();
        assert_eq!(entry.approved_by, Some(approver));
        assert!(entry.rejected_by.is_none());
        assert!(!entry.is_pending());

        // Second resolution of either kind must fail.
        assert!(matches!(
            entry.resolve_approved(UserId::new(), None, now),
            Err(LedgerError::AlreadyResolved { level: 1 })
        ));
        assert!(matches!(
            entry.resolve_rejected(UserId::new(), None, now),
            Err(LedgerError::AlreadyResolved { level: 1 })
        ));
    }

    #[test]
    fn test_never_both_approved_and_rejected() {
        let doc = Uuid::now_v7();
        let now = Utc::now();

        let mut entry = LedgerEntry::pending(DocumentKind::Requisition, doc, 1, now);
        entry
            .resolve_rejected(UserId::new(), Some("no budget".to_string()), now)
            .unwrap();
        assert!(entry.approved_by.is_none());
        assert!(entry.rejected_by.is_some());
    }

    #[test]
    fn test_chronological_ordering() {
        let doc = Uuid::now_v7();
        let base = Utc::now();

        let mut late = LedgerEntry::pending(DocumentKind::Requisition, doc, 2, base);
        late.recorded_at = base + chrono::Duration::seconds(10);
        let early = LedgerEntry::submission(DocumentKind::Requisition, doc, UserId::new(), base);

        let sorted = chronological(&[late.clone(), early.clone()]);
        assert_eq!(sorted[0].id, early.id);
        assert_eq!(sorted[1].id, late.id);
    }

    #[test]
    fn test_by_level_ordering() {
        let doc = Uuid::now_v7();
        let now = Utc::now();

        let cancel = LedgerEntry::cancellation(DocumentKind::Requisition, doc, UserId::new(), now);
        let l2 = LedgerEntry::pending(DocumentKind::Requisition, doc, 2, now);
        let l1 = LedgerEntry::pending(DocumentKind::Requisition, doc, 1, now);
        let sub = LedgerEntry::submission(DocumentKind::Requisition, doc, UserId::new(), now);

        let sorted = by_level(&[l2, sub, cancel, l1]);
        let levels: Vec<i16> = sorted.iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![-1, 0, 1, 2]);
    }

    #[test]
    fn test_pending_at_finds_latest_stream() {
        let doc = Uuid::now_v7();
        let now = Utc::now();

        let mut old = LedgerEntry::pending(DocumentKind::Requisition, doc, 1, now);
        old.resolve_rejected(UserId::new(), None, now).unwrap();
        let fresh = LedgerEntry::pending(DocumentKind::Requisition, doc, 1, now);
        let entries = vec![old, fresh.clone()];

        let idx = pending_at(&entries, 1).unwrap();
        assert_eq!(entries[idx].id, fresh.id);
        assert!(pending_at(&entries, 3).is_none());
    }

    #[test]
    fn test_consistency_pending_ok() {
        let doc = Uuid::now_v7();
        let entries = stream_for(doc, 2, Utc::now());
        let head = head(ApprovalStatus::Pending, 1, 2);
        assert!(check_consistency(&head, &entries).is_ok());
    }

    #[test]
    fn test_consistency_pending_missing_entry() {
        let doc = Uuid::now_v7();
        let now = Utc::now();
        let mut entries = stream_for(doc, 2, now);
        // Resolve the level-1 entry: the head claiming level 1 is now stale.
        let idx = pending_at(&entries, 1).unwrap();
        entries[idx].resolve_approved(UserId::new(), None, now).unwrap();

        let head = head(ApprovalStatus::Pending, 1, 2);
        assert!(matches!(
            check_consistency(&head, &entries),
            Err(LedgerError::InconsistentProjection(_))
        ));
    }

    #[test]
    fn test_consistency_approved_requires_all_resolved() {
        let doc = Uuid::now_v7();
        let now = Utc::now();
        let mut entries = stream_for(doc, 2, now);

        let head = head(ApprovalStatus::Approved, 2, 2);
        assert!(check_consistency(&head, &entries).is_err());

        for level in 1..=2 {
            let idx = pending_at(&entries, level).unwrap();
            entries[idx].resolve_approved(UserId::new(), None, now).unwrap();
        }
        assert!(check_consistency(&head, &entries).is_ok());
    }

    #[test]
    fn test_consistency_rejected_and_cancelled() {
        let doc = Uuid::now_v7();
        let now = Utc::now();
        let mut entries = stream_for(doc, 2, now);
        let idx = pending_at(&entries, 1).unwrap();
        entries[idx].resolve_rejected(UserId::new(), None, now).unwrap();

        assert!(check_consistency(&head(ApprovalStatus::Rejected, 1, 2), &entries).is_ok());
        assert!(check_consistency(&head(ApprovalStatus::Cancelled, 1, 2), &entries).is_err());

        entries.push(LedgerEntry::cancellation(
            DocumentKind::Requisition,
            doc,
            UserId::new(),
            now,
        ));
        assert!(check_consistency(&head(ApprovalStatus::Cancelled, 1, 2), &entries).is_ok());
    }

    #[test]
    fn test_consistency_ignores_previous_streams() {
        let doc = Uuid::now_v7();
        let base = Utc::now();

        // First round: submitted, rejected at level 1.
        let mut entries = stream_for(doc, 2, base);
        let idx = pending_at(&entries, 1).unwrap();
        entries[idx].resolve_rejected(UserId::new(), None, base).unwrap();

        // Second round after resubmit.
        let later = base + chrono::Duration::seconds(30);
        for mut e in stream_for(doc, 2, later) {
            e.recorded_at = later;
            entries.push(e);
        }

        // Level-2 entry from round one is still pending, but only the latest
        // stream counts.
        let head = head(ApprovalStatus::Pending, 1, 2);
        assert!(check_consistency(&head, &entries).is_ok());
    }

    #[test]
    fn test_consistency_cancellation_scoped_to_latest_stream() {
        let doc = Uuid::now_v7();
        let base = Utc::now();

        // Round one ends in a cancellation marker.
        let mut entries = stream_for(doc, 1, base);
        entries.push(LedgerEntry::cancellation(
            DocumentKind::Requisition,
            doc,
            UserId::new(),
            base,
        ));

        // A later submission opens a fresh stream without one.
        let later = base + chrono::Duration::seconds(30);
        entries.extend(stream_for(doc, 1, later));

        assert!(check_consistency(&head(ApprovalStatus::Cancelled, 1, 1), &entries).is_err());
        assert!(check_consistency(&head(ApprovalStatus::Pending, 1, 1), &entries).is_ok());
    }
}
