//! Atomic orchestration of RBAC, routing, workflow, ledger, and pipeline.
//!
//! Every operation follows the same shape: resolve the actor through the
//! directory, gate on the role graph, then validate and commit the state
//! change under the store lock. The pure services in `trezo-core` decide
//! what is legal; this module is the only place their decisions are applied.

use std::sync::Arc;

use uuid::Uuid;

use trezo_core::ledger::{by_level, check_consistency, chronological, pending_at, LedgerEntry};
use trezo_core::pipeline::{
    DisbursementInstrument, InstrumentPipeline, InstrumentStatus, PaymentRequestStatus,
    PaymentVoucher, PipelineAction, VoucherStatus,
};
use trezo_core::rbac::{catalog, RoleGraph};
use trezo_core::routing::{Approver, OrgUnit, RoutingResolver};
use trezo_core::workflow::{
    ApprovalAction, ApprovalService, ApprovalStatus, DocumentHead, DocumentKind,
};
use trezo_shared::types::{
    InstrumentId, Money, PaymentRequestId, RequisitionId, UserId, VoucherId,
};
use trezo_shared::{AppConfig, AppError, AppResult};

use crate::directory::{Directory, Principal};
use crate::store::{MemoryStore, PaymentRequest, Requisition, State};

/// The approval engine.
///
/// Holds the validated administrative configuration (role graph and routing)
/// plus the document store. Cheap to share behind an `Arc`; all methods take
/// `&self`.
pub struct ApprovalEngine {
    roles: RoleGraph,
    routing: RoutingResolver,
    directory: Arc<dyn Directory>,
    pipeline: InstrumentPipeline,
    store: MemoryStore,
}

impl ApprovalEngine {
    /// Creates an engine from pre-built configuration.
    #[must_use]
    pub fn new(roles: RoleGraph, routing: RoutingResolver, directory: Arc<dyn Directory>) -> Self {
        Self {
            roles,
            routing,
            directory,
            pipeline: InstrumentPipeline::new(),
            store: MemoryStore::new(),
        }
    }

    /// Creates an engine from application configuration.
    ///
    /// The role graph comes from `config.roles` and the routing resolver from
    /// the given units and approver assignments, with the configured default
    /// level count applied.
    ///
    /// # Errors
    ///
    /// `AppError::Configuration` for an invalid role graph or routing setup.
    pub fn from_config(
        config: &AppConfig,
        units: Vec<OrgUnit>,
        approvers: Vec<Approver>,
        directory: Arc<dyn Directory>,
    ) -> AppResult<Self> {
        let roles = RoleGraph::from_config(&config.roles)?;
        let routing = RoutingResolver::new(units, approvers)?
            .with_default_level(config.engine.default_max_level)?;
        Ok(Self::new(roles, routing, directory))
    }

    // ------------------------------------------------------------------
    // Requisitions
    // ------------------------------------------------------------------

    /// Creates a draft requisition owned by the actor.
    pub async fn create_requisition(
        &self,
        actor: UserId,
        description: &str,
        amount: Money,
    ) -> AppResult<RequisitionId> {
        let principal = self.require(actor, catalog::REQUISITION_CREATE).await?;
        let id = RequisitionId::new();
        self.store.with(|state| {
            let seq = state.next_sequence(DocumentKind::Requisition);
            let head = DocumentHead::draft(
                DocumentKind::Requisition,
                id.into_inner(),
                format!("RQ-{seq:06}"),
                principal.org_unit,
                actor,
                amount,
            );
            state.requisitions.insert(
                id,
                Requisition {
                    id,
                    head,
                    description: description.to_string(),
                },
            );
            Ok(())
        })?;
        tracing::info!(%id, %actor, "requisition created");
        Ok(id)
    }

    /// Submits a draft requisition into its approval chain.
    pub async fn submit_requisition(&self, actor: UserId, id: RequisitionId) -> AppResult<()> {
        self.require(actor, catalog::REQUISITION_SUBMIT).await?;
        self.store.with(|state| {
            let head = requisition_head(state, id)?;
            let max_level = self.routing.max_level(head.org_unit)?;
            let action = ApprovalService::submit(&head, actor, max_level)?;
            let updated = commit_action(state, &head, &action)?;
            write_requisition_head(state, id, updated);
            Ok(())
        })?;
        tracing::info!(%id, %actor, "requisition submitted");
        Ok(())
    }

    /// Approves a pending requisition at `level`.
    ///
    /// `level` is the approval level the actor decided on; if the document
    /// has already moved past it (for example because a concurrent approval
    /// won), the call fails with `InvalidState` instead of resolving the
    /// next level.
    pub async fn approve_requisition(
        &self,
        actor: UserId,
        id: RequisitionId,
        level: u8,
        comment: Option<String>,
    ) -> AppResult<()> {
        self.require(actor, catalog::REQUISITION_APPROVE).await?;
        self.store.with(|state| {
            let head = requisition_head(state, id)?;
            let action = ApprovalService::approve(&head, level, actor, comment)?;
            self.routing
                .authorizes(actor, head.org_unit, level, head.amount)?;
            let updated = commit_action(state, &head, &action)?;
            write_requisition_head(state, id, updated);
            Ok(())
        })?;
        tracing::info!(%id, %actor, level, "requisition approved");
        Ok(())
    }

    /// Rejects a pending requisition at `level`, with the same stale-level
    /// guard as approval.
    pub async fn reject_requisition(
        &self,
        actor: UserId,
        id: RequisitionId,
        level: u8,
        reason: Option<String>,
    ) -> AppResult<()> {
        self.require(actor, catalog::REQUISITION_APPROVE).await?;
        self.store.with(|state| {
            let head = requisition_head(state, id)?;
            let action = ApprovalService::reject(&head, level, actor, reason)?;
            self.routing
                .authorizes(actor, head.org_unit, level, head.amount)?;
            let updated = commit_action(state, &head, &action)?;
            write_requisition_head(state, id, updated);
            Ok(())
        })?;
        tracing::info!(%id, %actor, level, "requisition rejected");
        Ok(())
    }

    /// Withdraws a draft or pending requisition.
    ///
    /// The requester may always withdraw their own document; anyone holding
    /// `workflow:cancel:any` may withdraw any document.
    pub async fn cancel_requisition(&self, actor: UserId, id: RequisitionId) -> AppResult<()> {
        let principal = self.directory.principal(actor).await?;
        let admin_override = self
            .roles
            .has_permission(&principal.role, catalog::WORKFLOW_CANCEL_ANY);
        self.store.with(|state| {
            let head = requisition_head(state, id)?;
            let action = ApprovalService::cancel(&head, actor, admin_override)?;
            let updated = commit_action(state, &head, &action)?;
            write_requisition_head(state, id, updated);
            Ok(())
        })?;
        tracing::info!(%id, %actor, admin_override, "requisition cancelled");
        Ok(())
    }

    /// Returns a rejected requisition to draft for another round.
    pub async fn resubmit_requisition(&self, actor: UserId, id: RequisitionId) -> AppResult<()> {
        self.require(actor, catalog::REQUISITION_SUBMIT).await?;
        self.store.with(|state| {
            let head = requisition_head(state, id)?;
            let action = ApprovalService::resubmit(&head, actor)?;
            let updated = commit_action(state, &head, &action)?;
            write_requisition_head(state, id, updated);
            Ok(())
        })?;
        tracing::info!(%id, %actor, "requisition returned to draft");
        Ok(())
    }

    /// Reads a requisition.
    pub fn requisition(&self, id: RequisitionId) -> AppResult<Requisition> {
        self.store.with(|state| {
            state
                .requisitions
                .get(&id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("requisition {id}")))
        })
    }

    // ------------------------------------------------------------------
    // Payment requests
    // ------------------------------------------------------------------

    /// Creates a draft payment request owned by the actor.
    pub async fn create_payment_request(
        &self,
        actor: UserId,
        payee: &str,
        amount: Money,
    ) -> AppResult<PaymentRequestId> {
        let principal = self.require(actor, catalog::PAYMENT_CREATE).await?;
        let id = PaymentRequestId::new();
        self.store.with(|state| {
            let seq = state.next_sequence(DocumentKind::PaymentRequest);
            let head = DocumentHead::draft(
                DocumentKind::PaymentRequest,
                id.into_inner(),
                format!("PR-{seq:06}"),
                principal.org_unit,
                actor,
                amount,
            );
            state.requests.insert(
                id,
                PaymentRequest {
                    id,
                    head,
                    payee: payee.to_string(),
                    phase: PaymentRequestStatus::Draft,
                },
            );
            Ok(())
        })?;
        tracing::info!(%id, %actor, "payment request created");
        Ok(id)
    }

    /// Submits a draft payment request into its approval chain.
    pub async fn submit_payment_request(
        &self,
        actor: UserId,
        id: PaymentRequestId,
    ) -> AppResult<()> {
        self.require(actor, catalog::PAYMENT_SUBMIT).await?;
        self.store.with(|state| {
            let head = request_head(state, id)?;
            let max_level = self.routing.max_level(head.org_unit)?;
            let action = ApprovalService::submit(&head, actor, max_level)?;
            let updated = commit_action(state, &head, &action)?;
            write_request_head(state, id, updated);
            Ok(())
        })?;
        tracing::info!(%id, %actor, "payment request submitted");
        Ok(())
    }

    /// Approves a pending payment request at `level`, with the same
    /// stale-level guard as [`Self::approve_requisition`].
    pub async fn approve_payment_request(
        &self,
        actor: UserId,
        id: PaymentRequestId,
        level: u8,
        comment: Option<String>,
    ) -> AppResult<()> {
        self.require(actor, catalog::PAYMENT_APPROVE).await?;
        self.store.with(|state| {
            let head = request_head(state, id)?;
            let action = ApprovalService::approve(&head, level, actor, comment)?;
            self.routing
                .authorizes(actor, head.org_unit, level, head.amount)?;
            let updated = commit_action(state, &head, &action)?;
            write_request_head(state, id, updated);
            Ok(())
        })?;
        tracing::info!(%id, %actor, level, "payment request approved");
        Ok(())
    }

    /// Rejects a pending payment request at `level`.
    pub async fn reject_payment_request(
        &self,
        actor: UserId,
        id: PaymentRequestId,
        level: u8,
        reason: Option<String>,
    ) -> AppResult<()> {
        self.require(actor, catalog::PAYMENT_APPROVE).await?;
        self.store.with(|state| {
            let head = request_head(state, id)?;
            let action = ApprovalService::reject(&head, level, actor, reason)?;
            self.routing
                .authorizes(actor, head.org_unit, level, head.amount)?;
            let updated = commit_action(state, &head, &action)?;
            write_request_head(state, id, updated);
            Ok(())
        })?;
        tracing::info!(%id, %actor, level, "payment request rejected");
        Ok(())
    }

    /// Withdraws a draft or pending payment request.
    pub async fn cancel_payment_request(
        &self,
        actor: UserId,
        id: PaymentRequestId,
    ) -> AppResult<()> {
        let principal = self.directory.principal(actor).await?;
        let admin_override = self
            .roles
            .has_permission(&principal.role, catalog::WORKFLOW_CANCEL_ANY);
        self.store.with(|state| {
            let head = request_head(state, id)?;
            let action = ApprovalService::cancel(&head, actor, admin_override)?;
            let updated = commit_action(state, &head, &action)?;
            write_request_head(state, id, updated);
            Ok(())
        })?;
        tracing::info!(%id, %actor, admin_override, "payment request cancelled");
        Ok(())
    }

    /// Returns a rejected payment request to draft for another round.
    pub async fn resubmit_payment_request(
        &self,
        actor: UserId,
        id: PaymentRequestId,
    ) -> AppResult<()> {
        self.require(actor, catalog::PAYMENT_SUBMIT).await?;
        self.store.with(|state| {
            let head = request_head(state, id)?;
            let action = ApprovalService::resubmit(&head, actor)?;
            let updated = commit_action(state, &head, &action)?;
            write_request_head(state, id, updated);
            Ok(())
        })?;
        tracing::info!(%id, %actor, "payment request returned to draft");
        Ok(())
    }

    /// Reads a payment request.
    pub fn payment_request(&self, id: PaymentRequestId) -> AppResult<PaymentRequest> {
        self.store.with(|state| {
            state
                .requests
                .get(&id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("payment request {id}")))
        })
    }

    // ------------------------------------------------------------------
    // Voucher / instrument pipeline
    // ------------------------------------------------------------------

    /// Generates a payment voucher from a fully approved payment request.
    ///
    /// A second attempt on the same request fails with `ALREADY_EXISTS`
    /// unless the earlier chain ended in a voided instrument. The request
    /// advances to `VoucherGenerated` and the new voucher opens its own
    /// ledger stream, all in the same transaction.
    pub async fn generate_voucher(
        &self,
        actor: UserId,
        request_id: PaymentRequestId,
    ) -> AppResult<VoucherId> {
        self.require(actor, catalog::VOUCHER_GENERATE).await?;
        let voucher_id = self.store.with(|state| {
            let request = state
                .requests
                .get(&request_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("payment request {request_id}")))?;
            if let Some(existing) = live_voucher_for(state, request_id) {
                return Err(AppError::AlreadyExists(format!(
                    "payment request {request_id} already has voucher {existing}"
                )));
            }
            match self.pipeline.generate_voucher(request.phase, actor)? {
                PipelineAction::GenerateVoucher {
                    request_status,
                    generated_by,
                    generated_at,
                } => {
                    let voucher_id = VoucherId::new();
                    let seq = state.next_sequence(DocumentKind::PaymentVoucher);
                    state.vouchers.insert(
                        voucher_id,
                        PaymentVoucher {
                            id: voucher_id,
                            number: InstrumentPipeline::voucher_number(seq),
                            request_id,
                            org_unit: request.head.org_unit,
                            payee: request.payee.clone(),
                            amount: request.head.amount,
                            status: VoucherStatus::Pending,
                            generated_by,
                            generated_at,
                        },
                    );
                    state.voucher_by_request.insert(request_id, voucher_id);
                    state.ledger.push(LedgerEntry::submission(
                        DocumentKind::PaymentVoucher,
                        voucher_id.into_inner(),
                        generated_by,
                        generated_at,
                    ));
                    set_request_phase(state, request_id, request_status);
                    Ok(voucher_id)
                }
                _ => Err(mismatched_action("generate_voucher")),
            }
        })?;
        tracing::info!(%voucher_id, %request_id, %actor, "voucher generated");
        Ok(voucher_id)
    }

    /// Verifies a pending voucher (first internal approval step).
    pub async fn verify_voucher(&self, actor: UserId, id: VoucherId) -> AppResult<()> {
        self.require(actor, catalog::VOUCHER_VERIFY).await?;
        self.store.with(|state| {
            let voucher = voucher_ref(state, id)?.clone();
            match self.pipeline.verify_voucher(&voucher, actor)? {
                PipelineAction::VerifyVoucher { new_status, .. } => {
                    voucher_ref(state, id)?.status = new_status;
                    Ok(())
                }
                _ => Err(mismatched_action("verify_voucher")),
            }
        })?;
        tracing::info!(%id, %actor, "voucher verified");
        Ok(())
    }

    /// Approves a verified voucher (second internal approval step).
    pub async fn approve_voucher(
        &self,
        actor: UserId,
        id: VoucherId,
        comment: Option<String>,
    ) -> AppResult<()> {
        self.require(actor, catalog::VOUCHER_APPROVE).await?;
        self.store.with(|state| {
            let voucher = voucher_ref(state, id)?.clone();
            match self.pipeline.approve_voucher(&voucher, actor, comment)? {
                PipelineAction::ApproveVoucher { new_status, .. } => {
                    voucher_ref(state, id)?.status = new_status;
                    Ok(())
                }
                _ => Err(mismatched_action("approve_voucher")),
            }
        })?;
        tracing::info!(%id, %actor, "voucher approved");
        Ok(())
    }

    /// Issues a disbursement instrument from an approved voucher.
    ///
    /// A voucher issues at most one instrument, ever. The voucher moves to
    /// `Issued`, the ancestral payment request to `InstrumentIssued`, and
    /// the new instrument opens its own ledger stream, all in the same
    /// transaction.
    pub async fn issue_instrument(&self, actor: UserId, voucher_id: VoucherId) -> AppResult<InstrumentId> {
        self.require(actor, catalog::INSTRUMENT_ISSUE).await?;
        let instrument_id = self.store.with(|state| {
            let voucher = voucher_ref(state, voucher_id)?.clone();
            if let Some(existing) = state.instrument_by_voucher.get(&voucher_id) {
                return Err(AppError::AlreadyExists(format!(
                    "voucher {voucher_id} already issued instrument {existing}"
                )));
            }
            match self.pipeline.issue_instrument(&voucher, actor)? {
                PipelineAction::IssueInstrument {
                    voucher_status,
                    request_status,
                    issued_by,
                    issued_at,
                } => {
                    let instrument_id = InstrumentId::new();
                    let seq = state.next_sequence(DocumentKind::DisbursementInstrument);
                    state.instruments.insert(
                        instrument_id,
                        DisbursementInstrument {
                            id: instrument_id,
                            number: InstrumentPipeline::instrument_number(seq),
                            voucher_id,
                            request_id: voucher.request_id,
                            org_unit: voucher.org_unit,
                            payee: voucher.payee.clone(),
                            amount: voucher.amount,
                            status: InstrumentStatus::Issued,
                            issued_by,
                            issued_at,
                            settled_at: None,
                            void_reason: None,
                        },
                    );
                    state.instrument_by_voucher.insert(voucher_id, instrument_id);
                    state.ledger.push(LedgerEntry::submission(
                        DocumentKind::DisbursementInstrument,
                        instrument_id.into_inner(),
                        issued_by,
                        issued_at,
                    ));
                    voucher_ref(state, voucher_id)?.status = voucher_status;
                    set_request_phase(state, voucher.request_id, request_status);
                    Ok(instrument_id)
                }
                _ => Err(mismatched_action("issue_instrument")),
            }
        })?;
        tracing::info!(%instrument_id, %voucher_id, %actor, "instrument issued");
        Ok(instrument_id)
    }

    /// Marks an issued instrument as cleared.
    ///
    /// Settles the ancestral payment request as `Disbursed` and records the
    /// settlement in the request's ledger stream, in the same transaction.
    pub async fn clear_instrument(&self, actor: UserId, id: InstrumentId) -> AppResult<()> {
        self.require(actor, catalog::INSTRUMENT_CLEAR).await?;
        self.store.with(|state| {
            let instrument = instrument_ref(state, id)?.clone();
            match self.pipeline.clear_instrument(&instrument, actor)? {
                PipelineAction::ClearInstrument {
                    instrument_status,
                    request_status,
                    cleared_by,
                    cleared_at,
                } => {
                    let stored = instrument_ref(state, id)?;
                    stored.status = instrument_status;
                    stored.settled_at = Some(cleared_at);
                    let head = request_head(state, instrument.request_id)?;
                    let mut entry =
                        LedgerEntry::pending(head.kind, head.id, head.current_level, cleared_at);
                    entry.resolve_approved(
                        cleared_by,
                        Some(format!("instrument {} cleared", instrument.number)),
                        cleared_at,
                    )?;
                    state.ledger.push(entry);
                    set_request_phase(state, instrument.request_id, request_status);
                    Ok(())
                }
                _ => Err(mismatched_action("clear_instrument")),
            }
        })?;
        tracing::info!(%id, %actor, "instrument cleared");
        Ok(())
    }

    /// Voids an issued instrument, giving a reason.
    ///
    /// The ancestral payment request falls back to `Rejected` with the void
    /// reason on its ledger stream, in the same transaction; from there it
    /// may be reworked and resubmitted.
    pub async fn void_instrument(
        &self,
        actor: UserId,
        id: InstrumentId,
        reason: &str,
    ) -> AppResult<()> {
        self.require(actor, catalog::INSTRUMENT_VOID).await?;
        self.store.with(|state| {
            let instrument = instrument_ref(state, id)?.clone();
            match self.pipeline.void_instrument(&instrument, actor, reason)? {
                PipelineAction::VoidInstrument {
                    instrument_status,
                    request_status,
                    voided_by,
                    voided_at,
                    reason,
                } => {
                    let stored = instrument_ref(state, id)?;
                    stored.status = instrument_status;
                    stored.settled_at = Some(voided_at);
                    stored.void_reason = Some(reason.clone());
                    let head = request_head(state, instrument.request_id)?;
                    let mut entry =
                        LedgerEntry::pending(head.kind, head.id, head.current_level, voided_at);
                    entry.resolve_rejected(voided_by, Some(reason), voided_at)?;
                    state.ledger.push(entry);
                    set_request_phase(state, instrument.request_id, request_status);
                    Ok(())
                }
                _ => Err(mismatched_action("void_instrument")),
            }
        })?;
        tracing::info!(%id, %actor, reason, "instrument voided");
        Ok(())
    }

    /// Reads a voucher.
    pub fn voucher(&self, id: VoucherId) -> AppResult<PaymentVoucher> {
        self.store.with(|state| {
            state
                .vouchers
                .get(&id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("voucher {id}")))
        })
    }

    /// Reads a disbursement instrument.
    pub fn instrument(&self, id: InstrumentId) -> AppResult<DisbursementInstrument> {
        self.store.with(|state| {
            state
                .instruments
                .get(&id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("instrument {id}")))
        })
    }

    /// Reads a document's approval ledger, chronologically ordered.
    pub async fn ledger(&self, actor: UserId, document_id: Uuid) -> AppResult<Vec<LedgerEntry>> {
        self.require(actor, catalog::LEDGER_READ).await?;
        self.store
            .with(|state| Ok(chronological(&state.entries_for(document_id))))
    }

    /// Reads a document's approval ledger grouped by level.
    pub async fn ledger_by_level(
        &self,
        actor: UserId,
        document_id: Uuid,
    ) -> AppResult<Vec<LedgerEntry>> {
        self.require(actor, catalog::LEDGER_READ).await?;
        self.store
            .with(|state| Ok(by_level(&state.entries_for(document_id))))
    }

    /// Resolves the actor and checks that their role grants `permission`.
    ///
    /// A missing permission is `Unauthorized`; `Forbidden` is reserved for
    /// identity mismatches (acting on someone else's document).
    async fn require(&self, actor: UserId, permission: &str) -> AppResult<Principal> {
        let principal = self.directory.principal(actor).await?;
        if !self.roles.has_permission(&principal.role, permission) {
            return Err(AppError::Unauthorized(format!(
                "role '{}' lacks {permission}",
                principal.role
            )));
        }
        Ok(principal)
    }
}

/// Stages a validated action against a copy of the document's ledger slice,
/// verifies the resulting projection, then commits head and ledger together.
///
/// Validation runs entirely on the staged copy, so a failure leaves the
/// store untouched.
fn commit_action(
    state: &mut State,
    head: &DocumentHead,
    action: &ApprovalAction,
) -> AppResult<DocumentHead> {
    let mut staged = state.entries_for(head.id);
    let new_entries = stage_entries(&mut staged, head, action)?;
    let updated = ApprovalService::apply(head, action);
    check_consistency(&updated, &staged)?;

    match action {
        ApprovalAction::Approve {
            level,
            approved_by,
            approved_at,
            comment,
            ..
        } => {
            if let Some(idx) = pending_index(&state.ledger, head.id, *level) {
                state.ledger[idx].resolve_approved(*approved_by, comment.clone(), *approved_at)?;
            }
        }
        ApprovalAction::Reject {
            level,
            rejected_by,
            rejected_at,
            reason,
        } => {
            if let Some(idx) = pending_index(&state.ledger, head.id, *level) {
                state.ledger[idx].resolve_rejected(*rejected_by, reason.clone(), *rejected_at)?;
            }
        }
        ApprovalAction::Submit { .. }
        | ApprovalAction::Cancel { .. }
        | ApprovalAction::Resubmit { .. } => {}
    }
    state.ledger.extend(new_entries);
    Ok(updated)
}

/// Applies an action's ledger writes to a staged entry list, returning the
/// brand-new entries that must also be appended to the global ledger.
fn stage_entries(
    staged: &mut Vec<LedgerEntry>,
    head: &DocumentHead,
    action: &ApprovalAction,
) -> AppResult<Vec<LedgerEntry>> {
    let mut new_entries = Vec::new();
    match action {
        ApprovalAction::Submit {
            pending_levels,
            submitted_by,
            submitted_at,
            ..
        } => {
            new_entries.push(LedgerEntry::submission(
                head.kind,
                head.id,
                *submitted_by,
                *submitted_at,
            ));
            for level in pending_levels {
                new_entries.push(LedgerEntry::pending(head.kind, head.id, *level, *submitted_at));
            }
            staged.extend(new_entries.iter().cloned());
        }
        ApprovalAction::Approve {
            level,
            approved_by,
            approved_at,
            comment,
            ..
        } => match pending_at(staged, *level) {
            Some(idx) => {
                staged[idx].resolve_approved(*approved_by, comment.clone(), *approved_at)?;
            }
            None => {
                // The pending entry went missing; recreate it resolved so the
                // decision is still recorded.
                let mut entry = LedgerEntry::pending(head.kind, head.id, *level, *approved_at);
                entry.resolve_approved(*approved_by, comment.clone(), *approved_at)?;
                staged.push(entry.clone());
                new_entries.push(entry);
            }
        },
        ApprovalAction::Reject {
            level,
            rejected_by,
            rejected_at,
            reason,
        } => match pending_at(staged, *level) {
            Some(idx) => {
                staged[idx].resolve_rejected(*rejected_by, reason.clone(), *rejected_at)?;
            }
            None => {
                let mut entry = LedgerEntry::pending(head.kind, head.id, *level, *rejected_at);
                entry.resolve_rejected(*rejected_by, reason.clone(), *rejected_at)?;
                staged.push(entry.clone());
                new_entries.push(entry);
            }
        },
        ApprovalAction::Cancel {
            cancelled_by,
            cancelled_at,
        } => {
            let entry = LedgerEntry::cancellation(head.kind, head.id, *cancelled_by, *cancelled_at);
            staged.push(entry.clone());
            new_entries.push(entry);
        }
        // Resubmission writes nothing; the next submission opens a new stream.
        ApprovalAction::Resubmit { .. } => {}
    }
    Ok(new_entries)
}

/// Index into the global ledger of the latest pending entry for the document
/// at the given level.
fn pending_index(ledger: &[LedgerEntry], document_id: Uuid, level: u8) -> Option<usize> {
    ledger
        .iter()
        .rposition(|e| e.document_id == document_id && e.level == i16::from(level) && e.is_pending())
}

fn requisition_head(state: &State, id: RequisitionId) -> AppResult<DocumentHead> {
    state
        .requisitions
        .get(&id)
        .map(|r| r.head.clone())
        .ok_or_else(|| AppError::NotFound(format!("requisition {id}")))
}

fn write_requisition_head(state: &mut State, id: RequisitionId, head: DocumentHead) {
    if let Some(requisition) = state.requisitions.get_mut(&id) {
        requisition.head = head;
    }
}

fn request_head(state: &State, id: PaymentRequestId) -> AppResult<DocumentHead> {
    state
        .requests
        .get(&id)
        .map(|r| r.head.clone())
        .ok_or_else(|| AppError::NotFound(format!("payment request {id}")))
}

/// Writes back a payment request head, keeping the pipeline phase in sync
/// while the document is inside the approval chain.
fn write_request_head(state: &mut State, id: PaymentRequestId, head: DocumentHead) {
    if let Some(request) = state.requests.get_mut(&id) {
        request.phase = PaymentRequestStatus::from_approval(head.status);
        request.head = head;
    }
}

/// Moves a payment request into a pipeline phase, back-propagating terminal
/// phases to the approval head.
fn set_request_phase(state: &mut State, id: PaymentRequestId, phase: PaymentRequestStatus) {
    if let Some(request) = state.requests.get_mut(&id) {
        request.phase = phase;
        if phase == PaymentRequestStatus::Rejected {
            request.head.status = ApprovalStatus::Rejected;
        }
    }
}

/// The request's current voucher, if any chain derived from it is still live.
///
/// A chain ended by a cancelled voucher or a voided instrument no longer
/// blocks regeneration; anything else does.
fn live_voucher_for(state: &State, request_id: PaymentRequestId) -> Option<VoucherId> {
    let voucher_id = state.voucher_by_request.get(&request_id).copied()?;
    let voucher = state.vouchers.get(&voucher_id)?;
    if voucher.status == VoucherStatus::Cancelled {
        return None;
    }
    let voided = state
        .instrument_by_voucher
        .get(&voucher_id)
        .and_then(|instrument_id| state.instruments.get(instrument_id))
        .is_some_and(|i| i.status == InstrumentStatus::Voided);
    if voided {
        None
    } else {
        Some(voucher_id)
    }
}

fn voucher_ref(state: &mut State, id: VoucherId) -> AppResult<&mut PaymentVoucher> {
    state
        .vouchers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("voucher {id}")))
}

fn instrument_ref(state: &mut State, id: InstrumentId) -> AppResult<&mut DisbursementInstrument> {
    state
        .instruments
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("instrument {id}")))
}

fn mismatched_action(operation: &str) -> AppError {
    AppError::Storage(format!("pipeline returned a mismatched action for {operation}"))
}
