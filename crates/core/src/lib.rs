//! Core approval & authorization logic for Trezo.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, state-machine rules, and authorization checks live here.
//!
//! # Modules
//!
//! - `rbac` - Permission catalog and role inheritance resolution
//! - `routing` - Organization-aware approval routing
//! - `workflow` - Approval lifecycle state machine
//! - `ledger` - Append-only approval ledger
//! - `pipeline` - Payment voucher and disbursement instrument derivation

pub mod ledger;
pub mod pipeline;
pub mod rbac;
pub mod routing;
pub mod workflow;
