//! Trezo approval engine.
//!
//! Glues the pure decision services from `trezo-core` (role graph, routing
//! resolver, workflow machine, ledger rules, instrument pipeline) to a
//! directory of users and a document store, and applies every state change
//! atomically. The transport layer (HTTP, CLI) sits above this crate; the
//! pure rules sit below it.
//!
//! # Modules
//!
//! - `engine` - The orchestrating [`ApprovalEngine`]
//! - `directory` - User identity port and in-memory implementation
//! - `store` - Document entities and the in-memory store

pub mod directory;
pub mod engine;
pub mod store;

pub use directory::{Directory, InMemoryDirectory, Principal};
pub use engine::ApprovalEngine;
pub use store::{PaymentRequest, Requisition};
