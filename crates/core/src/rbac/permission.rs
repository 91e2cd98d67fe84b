//! Permission tokens and the closed permission catalog.
//!
//! A permission is an opaque `resource:action:scope` token. Equality is the
//! only behavioral operation; categories exist for presentation grouping and
//! have no effect on authorization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque permission token of the form `resource:action:scope`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    /// Creates a permission from a token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the presentation category derived from the resource segment.
    #[must_use]
    pub fn category(&self) -> PermissionCategory {
        match self.0.split(':').next() {
            Some("requisition") => PermissionCategory::Requisition,
            Some("payment") => PermissionCategory::Payment,
            Some("voucher") => PermissionCategory::Voucher,
            Some("instrument") => PermissionCategory::Instrument,
            _ => PermissionCategory::Administration,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Permission {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Presentation grouping for permissions. No behavioral effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionCategory {
    /// Purchase/service requisitions.
    Requisition,
    /// Payment requests.
    Payment,
    /// Payment vouchers.
    Voucher,
    /// Disbursement instruments.
    Instrument,
    /// Everything else (ledger access, workflow overrides).
    Administration,
}

/// The closed set of permission tokens known to the system.
pub mod catalog {
    /// Create a requisition in the actor's own name.
    pub const REQUISITION_CREATE: &str = "requisition:create:own";
    /// Submit one's own requisition into the approval chain.
    pub const REQUISITION_SUBMIT: &str = "requisition:submit:own";
    /// Approve requisitions routed to the actor's unit.
    pub const REQUISITION_APPROVE: &str = "requisition:approve:unit";
    /// Create a payment request in the actor's own name.
    pub const PAYMENT_CREATE: &str = "payment:create:own";
    /// Submit one's own payment request into the approval chain.
    pub const PAYMENT_SUBMIT: &str = "payment:submit:own";
    /// Approve payment requests routed to the actor's unit.
    pub const PAYMENT_APPROVE: &str = "payment:approve:unit";
    /// Generate a payment voucher from an approved payment request.
    pub const VOUCHER_GENERATE: &str = "voucher:generate:unit";
    /// Verify a payment voucher (first step of voucher approval).
    pub const VOUCHER_VERIFY: &str = "voucher:verify:unit";
    /// Approve a verified payment voucher (second step).
    pub const VOUCHER_APPROVE: &str = "voucher:approve:unit";
    /// Issue a disbursement instrument from an approved voucher.
    pub const INSTRUMENT_ISSUE: &str = "instrument:issue:unit";
    /// Mark a disbursement instrument as cleared.
    pub const INSTRUMENT_CLEAR: &str = "instrument:clear:unit";
    /// Void an issued disbursement instrument.
    pub const INSTRUMENT_VOID: &str = "instrument:void:unit";
    /// Read approval ledgers within the actor's unit.
    pub const LEDGER_READ: &str = "ledger:read:unit";
    /// Cancel any in-flight document (administrative override).
    pub const WORKFLOW_CANCEL_ANY: &str = "workflow:cancel:any";

    /// Every token in the catalog, for validation and presentation.
    pub const ALL: &[&str] = &[
        REQUISITION_CREATE,
        REQUISITION_SUBMIT,
        REQUISITION_APPROVE,
        PAYMENT_CREATE,
        PAYMENT_SUBMIT,
        PAYMENT_APPROVE,
        VOUCHER_GENERATE,
        VOUCHER_VERIFY,
        VOUCHER_APPROVE,
        INSTRUMENT_ISSUE,
        INSTRUMENT_CLEAR,
        INSTRUMENT_VOID,
        LEDGER_READ,
        WORKFLOW_CANCEL_ANY,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_equality() {
        assert_eq!(
            Permission::from(catalog::REQUISITION_CREATE),
            Permission::new("requisition:create:own")
        );
        assert_ne!(
            Permission::from(catalog::REQUISITION_CREATE),
            Permission::from(catalog::REQUISITION_SUBMIT)
        );
    }

    #[test]
    fn test_permission_display() {
        let perm = Permission::from(catalog::VOUCHER_VERIFY);
        assert_eq!(perm.to_string(), "voucher:verify:unit");
        assert_eq!(perm.as_str(), "voucher:verify:unit");
    }

    #[test]
    fn test_categories_cover_catalog() {
        assert_eq!(
            Permission::from(catalog::REQUISITION_APPROVE).category(),
            PermissionCategory::Requisition
        );
        assert_eq!(
            Permission::from(catalog::PAYMENT_APPROVE).category(),
            PermissionCategory::Payment
        );
        assert_eq!(
            Permission::from(catalog::VOUCHER_GENERATE).category(),
            PermissionCategory::Voucher
        );
        assert_eq!(
            Permission::from(catalog::INSTRUMENT_CLEAR).category(),
            PermissionCategory::Instrument
        );
        assert_eq!(
            Permission::from(catalog::LEDGER_READ).category(),
            PermissionCategory::Administration
        );
        assert_eq!(
            Permission::from(catalog::WORKFLOW_CANCEL_ANY).category(),
            PermissionCategory::Administration
        );
    }

    #[test]
    fn test_catalog_tokens_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for token in catalog::ALL {
            assert!(seen.insert(*token), "duplicate catalog token: {token}");
        }
    }

    #[test]
    fn test_catalog_tokens_are_well_formed() {
        for token in catalog::ALL {
            assert_eq!(
                token.split(':').count(),
                3,
                "token {token} is not resource:action:scope"
            );
        }
    }
}
