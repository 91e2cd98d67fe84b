//! Payment voucher and disbursement instrument derivation.
//!
//! The derivation chain is strictly one-way: an approved payment request
//! yields at most one voucher; a voucher that has passed its own two-step
//! approval (verify, then approve) yields at most one instrument. Clearing
//! or voiding an instrument propagates a terminal status back to the
//! originating payment request in the same transaction.
//!
//! # Modules
//!
//! - `types` - Voucher/instrument entities and their status enums
//! - `service` - Derivation and settlement rules
//! - `error` - Pipeline-specific error types

pub mod error;
pub mod service;
pub mod types;

pub use error::PipelineError;
pub use service::InstrumentPipeline;
pub use types::{
    DisbursementInstrument, InstrumentStatus, PaymentRequestStatus, PaymentVoucher, PipelineAction,
    VoucherStatus,
};
