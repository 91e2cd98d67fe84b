//! Approval lifecycle state machine.
//!
//! One generic machine governs every approvable document kind. The machine is
//! pure: it validates a requested transition against a document head and
//! returns an [`ApprovalAction`] describing the mutation and ledger writes
//! the caller must apply atomically.
//!
//! # Modules
//!
//! - `types` - Document kinds, statuses, heads, and actions
//! - `service` - State transition logic
//! - `error` - Workflow-specific error types

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::WorkflowError;
pub use service::ApprovalService;
pub use types::{ApprovalAction, ApprovalStatus, ApproveOutcome, DocumentHead, DocumentKind};
