//! Approver lookup and approval-level computation.
//!
//! # Precedence
//!
//! When several approvers match a (unit, level) pair, the winner is chosen
//! by a fixed, documented order:
//!
//! 1. match class: exact-unit, then parent-unit, then organization-wide;
//! 2. ascending `priority` (lower wins);
//! 3. ascending `created_at` (earliest assignment wins);
//! 4. ascending assignment id (total order, UUIDv7 so time-ordered anyway).
//!
//! The order is deterministic by construction and covered by tests; callers
//! must never rely on configuration insertion order.

use std::collections::{BTreeSet, HashMap};

use trezo_shared::types::{Money, OrgUnitId, UserId};

use crate::routing::error::RoutingError;
use crate::routing::types::{Approver, OrgUnit};

/// How an approver's scope relates to the target unit. Order matters:
/// derived `Ord` gives exact < parent < global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchClass {
    Exact,
    Parent,
    Global,
}

/// Resolves approval routing for organizational units.
///
/// Holds the administrative configuration (units and approver assignments),
/// validated once at construction.
#[derive(Debug, Clone)]
pub struct RoutingResolver {
    units: HashMap<OrgUnitId, OrgUnit>,
    approvers: Vec<Approver>,
    default_level: u8,
}

impl RoutingResolver {
    /// Builds a resolver, validating unit references and approver levels.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::InvalidLevel` for a level below 1 and
    /// `RoutingError::UnknownUnit` when an approver or unit references a
    /// unit that is not configured. Both are fatal at startup.
    pub fn new(units: Vec<OrgUnit>, approvers: Vec<Approver>) -> Result<Self, RoutingError> {
        let unit_map: HashMap<OrgUnitId, OrgUnit> =
            units.into_iter().map(|u| (u.id, u)).collect();

        for unit in unit_map.values() {
            if let Some(parent) = unit.parent {
                if !unit_map.contains_key(&parent) {
                    return Err(RoutingError::UnknownUnit(parent));
                }
            }
        }
        for approver in &approvers {
            if approver.level < 1 {
                return Err(RoutingError::InvalidLevel(approver.level));
            }
            if let Some(unit) = approver.unit {
                if !unit_map.contains_key(&unit) {
                    return Err(RoutingError::UnknownUnit(unit));
                }
            }
        }

        Ok(Self {
            units: unit_map,
            approvers,
            default_level: 1,
        })
    }

    /// Overrides the level count used for units with no configured approver.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::InvalidLevel` for a level below 1.
    pub fn with_default_level(mut self, level: u8) -> Result<Self, RoutingError> {
        if level < 1 {
            return Err(RoutingError::InvalidLevel(level));
        }
        self.default_level = level;
        Ok(self)
    }

    /// Looks up a unit.
    #[must_use]
    pub fn unit(&self, id: OrgUnitId) -> Option<&OrgUnit> {
        self.units.get(&id)
    }

    /// Finds the approver who must act at `level` for documents of `unit`.
    ///
    /// Matching approvers are active assignments at that level whose scope is
    /// the unit itself or the unit's parent; organization-wide assignments
    /// match only at the unit's top level. The winner follows the
    /// module-level precedence.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::UnknownUnit` for an unconfigured unit.
    pub fn find_approver(
        &self,
        unit: OrgUnitId,
        level: u8,
    ) -> Result<Option<&Approver>, RoutingError> {
        let mut candidates = self.candidates(unit, level)?;
        candidates.sort_by(|(ca, a), (cb, b)| {
            ca.cmp(cb)
                .then(a.priority.cmp(&b.priority))
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(candidates.into_iter().map(|(_, a)| a).next())
    }

    /// Number of sequential approval levels a document of `unit` must pass.
    ///
    /// Counts the distinct levels among active approvers reachable from the
    /// unit (unit-exact, parent-unit, and organization-wide). Falls back to
    /// the default level count (1 unless overridden through
    /// [`Self::with_default_level`]) when no approver is configured for the
    /// unit. Levels are assumed contiguous from 1;
    /// gaps are an administrative defect surfaced when no approver resolves
    /// for the missing level.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::UnknownUnit` for an unconfigured unit.
    pub fn max_level(&self, unit: OrgUnitId) -> Result<u8, RoutingError> {
        let parent = self.parent_of(unit)?;
        let levels: BTreeSet<u8> = self
            .approvers
            .iter()
            .filter(|a| a.active && self.match_class(a, unit, parent).is_some())
            .map(|a| a.level)
            .collect();

        // u8 cast is safe: distinct u8 levels cannot exceed u8::MAX.
        #[allow(clippy::cast_possible_truncation)]
        Ok(if levels.is_empty() {
            self.default_level
        } else {
            levels.len() as u8
        })
    }

    /// Checks that `user_id` may approve at `level` for `unit` with the
    /// given document amount.
    ///
    /// A matching unit-scoped or parent-scoped assignment at the exact level
    /// authorizes the user; so does organization-wide (top-level) authority
    /// at any level. The ceiling of the matched assignment, when set, caps
    /// the amount.
    ///
    /// # Errors
    ///
    /// `RoutingError::NotAuthorized` when no assignment matches;
    /// `RoutingError::CeilingExceeded` when one matches but the amount is
    /// above its ceiling; `RoutingError::UnknownUnit` for a bad unit.
    pub fn authorizes(
        &self,
        user_id: UserId,
        unit: OrgUnitId,
        level: u8,
        amount: Money,
    ) -> Result<(), RoutingError> {
        let parent = self.parent_of(unit)?;

        let matched = self
            .approvers
            .iter()
            .filter(|a| a.active && a.user_id == user_id)
            .find(|a| {
                // Global authority is not level-bound.
                a.is_global()
                    || (a.level == level && self.match_class(a, unit, parent).is_some())
            });

        let Some(approver) = matched else {
            return Err(RoutingError::NotAuthorized { user_id, level });
        };

        if let Some(ceiling) = approver.ceiling {
            if amount.exceeds(ceiling) {
                return Err(RoutingError::CeilingExceeded {
                    amount: amount.amount,
                    ceiling,
                });
            }
        }
        Ok(())
    }

    fn parent_of(&self, unit: OrgUnitId) -> Result<Option<OrgUnitId>, RoutingError> {
        self.units
            .get(&unit)
            .map(|u| u.parent)
            .ok_or(RoutingError::UnknownUnit(unit))
    }

    /// Classifies an approver's scope relative to the target unit.
    fn match_class(
        &self,
        approver: &Approver,
        unit: OrgUnitId,
        parent: Option<OrgUnitId>,
    ) -> Option<MatchClass> {
        match approver.unit {
            None => Some(MatchClass::Global),
            Some(scope) if scope == unit => Some(MatchClass::Exact),
            Some(scope) if Some(scope) == parent => Some(MatchClass::Parent),
            Some(_) => None,
        }
    }

    fn candidates(
        &self,
        unit: OrgUnitId,
        level: u8,
    ) -> Result<Vec<(MatchClass, &Approver)>, RoutingError> {
        let parent = self.parent_of(unit)?;
        // Organization-wide assignments only cover the final escalation step.
        let top = self.max_level(unit)?;
        Ok(self
            .approvers
            .iter()
            .filter(|a| a.active && a.level == level)
            .filter_map(|a| self.match_class(a, unit, parent).map(|c| (c, a)))
            .filter(|(class, _)| *class != MatchClass::Global || level == top)
            .collect())
    }
}
