//! Append-only approval ledger.
//!
//! The ledger is the source of truth for "who approved what, when"; a
//! document's status and level are a cached projection of its latest ledger
//! state. Entries are never deleted or overwritten once a document leaves
//! Draft: later actions append new entries or resolve an existing pending
//! entry exactly once.
//!
//! # Modules
//!
//! - `entry` - Ledger entries, ordering, and the consistency check
//! - `error` - Ledger-specific error types

pub mod entry;
pub mod error;

pub use entry::{
    by_level, check_consistency, chronological, pending_at, LedgerEntry, LEVEL_CANCELLATION,
    LEVEL_SUBMISSION,
};
pub use error::LedgerError;
