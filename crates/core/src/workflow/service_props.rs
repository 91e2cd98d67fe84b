//! Property-based tests for the approval state machine.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use trezo_shared::types::{Currency, Money, OrgUnitId, UserId};

use crate::workflow::error::WorkflowError;
use crate::workflow::service::ApprovalService;
use crate::workflow::types::{ApprovalAction, ApprovalStatus, DocumentHead, DocumentKind};

fn arb_status() -> impl Strategy<Value = ApprovalStatus> {
    prop_oneof![
        Just(ApprovalStatus::Draft),
        Just(ApprovalStatus::Pending),
        Just(ApprovalStatus::Approved),
        Just(ApprovalStatus::Rejected),
        Just(ApprovalStatus::Cancelled),
    ]
}

fn arb_kind() -> impl Strategy<Value = DocumentKind> {
    prop_oneof![
        Just(DocumentKind::Requisition),
        Just(DocumentKind::PaymentRequest),
    ]
}

fn head_with(kind: DocumentKind, status: ApprovalStatus, level: u8, max: u8) -> DocumentHead {
    let mut head = DocumentHead::draft(
        kind,
        Uuid::now_v7(),
        "DOC-0001",
        OrgUnitId::new(),
        UserId::new(),
        Money::new(Decimal::new(1000, 0), Currency::Usd),
    );
    head.status = status;
    head.current_level = level;
    head.max_level = max;
    head
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Submit from Draft yields pending entries for exactly levels 1..=max.
    #[test]
    fn prop_submit_creates_all_pending_levels(kind in arb_kind(), max in 1u8..8) {
        let head = head_with(kind, ApprovalStatus::Draft, 0, 0);
        let action = ApprovalService::submit(&head, head.requester, max).unwrap();
        let ApprovalAction::Submit { pending_levels, .. } = &action else {
            return Err(TestCaseError::fail("expected Submit"));
        };
        let expected: Vec<u8> = (1..=max).collect();
        prop_assert_eq!(pending_levels, &expected);

        let updated = ApprovalService::apply(&head, &action);
        prop_assert_eq!(updated.current_level, 1);
        prop_assert_eq!(updated.max_level, max);
    }

    /// Submit from any non-Draft status fails with InvalidState.
    #[test]
    fn prop_submit_only_from_draft(kind in arb_kind(), status in arb_status(), max in 1u8..8) {
        prop_assume!(status != ApprovalStatus::Draft);
        let head = head_with(kind, status, 1, max);
        let result = ApprovalService::submit(&head, head.requester, max);
        let invalid_state = matches!(result, Err(WorkflowError::InvalidState { .. }));
        prop_assert!(invalid_state, "submit from {} must fail, got {:?}", status, result);
    }

    /// Approving through every level finalizes with a monotonically
    /// non-decreasing level, ending Approved at max.
    #[test]
    fn prop_full_approval_round(kind in arb_kind(), max in 1u8..8) {
        let draft = head_with(kind, ApprovalStatus::Draft, 0, 0);
        let submit = ApprovalService::submit(&draft, draft.requester, max).unwrap();
        let mut head = ApprovalService::apply(&draft, &submit);

        let mut previous_level = head.current_level;
        for _ in 0..max {
            prop_assert_eq!(head.status, ApprovalStatus::Pending);
            let action =
                ApprovalService::approve(&head, head.current_level, UserId::new(), None).unwrap();
            head = ApprovalService::apply(&head, &action);
            prop_assert!(head.current_level >= previous_level);
            previous_level = head.current_level;
        }

        prop_assert_eq!(head.status, ApprovalStatus::Approved);
        prop_assert_eq!(head.current_level, max);

        // One more approve must fail: the chain is complete.
        let extra = ApprovalService::approve(&head, head.current_level, UserId::new(), None);
        let invalid_state = matches!(extra, Err(WorkflowError::InvalidState { .. }));
        prop_assert!(invalid_state, "approve after finalization must fail, got {:?}", extra);
    }

    /// Reject never moves the level.
    #[test]
    fn prop_reject_preserves_level(kind in arb_kind(), level in 1u8..8, extra in 0u8..4) {
        let head = head_with(kind, ApprovalStatus::Pending, level, level + extra);
        let action = ApprovalService::reject(&head, level, UserId::new(), None).unwrap();
        let updated = ApprovalService::apply(&head, &action);
        prop_assert_eq!(updated.status, ApprovalStatus::Rejected);
        prop_assert_eq!(updated.current_level, level);
    }

    /// Cancel is legal exactly from Draft and Pending.
    #[test]
    fn prop_cancel_only_in_flight(kind in arb_kind(), status in arb_status()) {
        let head = head_with(kind, status, 1, 2);
        let result = ApprovalService::cancel(&head, head.requester, false);
        let legal = matches!(status, ApprovalStatus::Draft | ApprovalStatus::Pending);
        prop_assert_eq!(result.is_ok(), legal);
    }

    /// apply() always lands on the action's advertised status.
    #[test]
    fn prop_apply_matches_new_status(kind in arb_kind(), max in 1u8..6) {
        let draft = head_with(kind, ApprovalStatus::Draft, 0, 0);
        let submit = ApprovalService::submit(&draft, draft.requester, max).unwrap();
        prop_assert_eq!(
            ApprovalService::apply(&draft, &submit).status,
            submit.new_status()
        );

        let pending = head_with(kind, ApprovalStatus::Pending, 1, max);
        let approve = ApprovalService::approve(&pending, 1, UserId::new(), None).unwrap();
        prop_assert_eq!(
            ApprovalService::apply(&pending, &approve).status,
            approve.new_status()
        );
    }
}
