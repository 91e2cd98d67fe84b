//! Organizational units and approver assignments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use trezo_shared::types::{ApproverId, OrgUnitId, UserId};

/// A business unit or department.
///
/// Departments point at their business unit through `parent`; routing falls
/// back to the parent when a department has no approver of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
    /// Unit identifier.
    pub id: OrgUnitId,
    /// Display name.
    pub name: String,
    /// Owning business unit, `None` for top-level units.
    pub parent: Option<OrgUnitId>,
}

impl OrgUnit {
    /// Creates a top-level business unit.
    #[must_use]
    pub fn business_unit(id: OrgUnitId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
        }
    }

    /// Creates a department under a business unit.
    #[must_use]
    pub fn department(id: OrgUnitId, name: impl Into<String>, parent: OrgUnitId) -> Self {
        Self {
            id,
            name: name.into(),
            parent: Some(parent),
        }
    }
}

/// A (user, unit, level) binding granting approval authority.
///
/// `unit = None` means organization-wide (top-level) authority. The ceiling,
/// when set, caps the document amount the approver may act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approver {
    /// Assignment identifier.
    pub id: ApproverId,
    /// The user holding the authority.
    pub user_id: UserId,
    /// Unit scope; `None` for organization-wide authority.
    pub unit: Option<OrgUnitId>,
    /// Approval level, 1 = lowest, evaluated first.
    pub level: u8,
    /// Maximum amount approvable, `None` for no ceiling.
    pub ceiling: Option<Decimal>,
    /// Tie-break within a precedence class; lower wins.
    pub priority: i16,
    /// Inactive assignments are ignored by routing.
    pub active: bool,
    /// When the assignment was created; second tie-break, earliest wins.
    pub created_at: DateTime<Utc>,
}

impl Approver {
    /// Creates an active assignment with default priority and no ceiling.
    #[must_use]
    pub fn new(user_id: UserId, unit: Option<OrgUnitId>, level: u8) -> Self {
        Self {
            id: ApproverId::new(),
            user_id,
            unit,
            level,
            ceiling: None,
            priority: 0,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Sets the approval ceiling.
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: Decimal) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    /// Sets the precedence priority (lower wins).
    #[must_use]
    pub fn with_priority(mut self, priority: i16) -> Self {
        self.priority = priority;
        self
    }

    /// Deactivates the assignment.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns true for organization-wide (top-level) authority.
    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.unit.is_none()
    }
}
