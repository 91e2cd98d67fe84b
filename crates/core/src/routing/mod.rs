//! Organization-aware approval routing.
//!
//! Approval authority is bound to organizational units, not to individual
//! documents: an approver covers a unit (or the whole organization), so a
//! reorganization changes routing without touching historical documents.
//!
//! # Modules
//!
//! - `types` - Organizational units and approver assignments
//! - `resolver` - Approver lookup and level computation
//! - `error` - Routing-specific error types

pub mod error;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod resolver_props;

pub use error::RoutingError;
pub use resolver::RoutingResolver;
pub use types::{Approver, OrgUnit};
