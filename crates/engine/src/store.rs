//! In-memory document store.
//!
//! All engine operations run under a single store lock: an operation reads,
//! validates, and writes as one unit, so concurrent actors serialize and the
//! loser of a race sees the winner's committed state. Engine code stages its
//! mutations after validation succeeds; a failed operation leaves the store
//! untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use trezo_core::ledger::LedgerEntry;
use trezo_core::pipeline::{DisbursementInstrument, PaymentRequestStatus, PaymentVoucher};
use trezo_core::workflow::types::{DocumentHead, DocumentKind};
use trezo_shared::types::{InstrumentId, PaymentRequestId, RequisitionId, VoucherId};
use trezo_shared::AppResult;

/// A purchase/service requisition: approval head plus payload.
#[derive(Debug, Clone)]
pub struct Requisition {
    /// Requisition identifier.
    pub id: RequisitionId,
    /// Approval state shared with the workflow machine.
    pub head: DocumentHead,
    /// What is being requested.
    pub description: String,
}

/// A payment request: approval head, payload, and pipeline phase.
///
/// `phase` carries the full lifecycle including the post-approval pipeline;
/// while the document is inside the approval chain it always projects to
/// `head.status`.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Payment request identifier.
    pub id: PaymentRequestId,
    /// Approval state shared with the workflow machine.
    pub head: DocumentHead,
    /// Who gets paid.
    pub payee: String,
    /// Full lifecycle phase.
    pub phase: PaymentRequestStatus,
}

/// Everything the engine persists, guarded by one lock.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) requisitions: HashMap<RequisitionId, Requisition>,
    pub(crate) requests: HashMap<PaymentRequestId, PaymentRequest>,
    pub(crate) vouchers: HashMap<VoucherId, PaymentVoucher>,
    pub(crate) voucher_by_request: HashMap<PaymentRequestId, VoucherId>,
    pub(crate) instruments: HashMap<InstrumentId, DisbursementInstrument>,
    pub(crate) instrument_by_voucher: HashMap<VoucherId, InstrumentId>,
    pub(crate) ledger: Vec<LedgerEntry>,
    sequences: HashMap<DocumentKind, u64>,
}

impl State {
    /// Next value of the per-kind document number sequence.
    pub(crate) fn next_sequence(&mut self, kind: DocumentKind) -> u64 {
        let seq = self.sequences.entry(kind).or_insert(0);
        *seq += 1;
        *seq
    }

    /// All ledger entries for one document, in insertion order.
    pub(crate) fn entries_for(&self, document_id: Uuid) -> Vec<LedgerEntry> {
        self.ledger
            .iter()
            .filter(|e| e.document_id == document_id)
            .cloned()
            .collect()
    }
}

/// Shared handle to the store; clones point at the same state.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStore {
    inner: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with exclusive access to the state.
    pub(crate) fn with<T>(&self, f: impl FnOnce(&mut State) -> AppResult<T>) -> AppResult<T> {
        // A poisoned lock means a panic mid-operation; the state is still the
        // best record available, so recover it rather than propagate.
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}
