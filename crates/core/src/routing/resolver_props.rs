//! Property-based tests for routing resolution.
//!
//! The headline property: the chosen approver never depends on the order the
//! assignments were loaded in, only on the documented precedence.

use chrono::{Duration, Utc};
use proptest::prelude::*;

use trezo_shared::types::{OrgUnitId, UserId};

use crate::routing::resolver::RoutingResolver;
use crate::routing::types::{Approver, OrgUnit};

#[derive(Debug, Clone)]
struct RawApprover {
    scope: u8, // 0 = exact unit, 1 = parent unit, 2 = global
    level: u8,
    priority: i16,
    age_days: i64,
    active: bool,
}

fn arb_approver() -> impl Strategy<Value = RawApprover> {
    (0u8..3, 1u8..4, -5i16..5, 0i64..1000, prop::bool::ANY).prop_map(
        |(scope, level, priority, age_days, active)| RawApprover {
            scope,
            level,
            priority,
            age_days,
            active,
        },
    )
}

fn build(
    raws: &[RawApprover],
    department: OrgUnitId,
    business_unit: OrgUnitId,
) -> Vec<Approver> {
    raws.iter()
        .map(|raw| {
            let unit = match raw.scope {
                0 => Some(department),
                1 => Some(business_unit),
                _ => None,
            };
            let mut approver = Approver::new(UserId::new(), unit, raw.level)
                .with_priority(raw.priority);
            approver.created_at = Utc::now() - Duration::days(raw.age_days);
            approver.active = raw.active;
            approver
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The winner is invariant under load order.
    #[test]
    fn prop_find_approver_order_independent(
        raws in prop::collection::vec(arb_approver(), 0..10),
        level in 1u8..4,
    ) {
        let business_unit = OrgUnitId::new();
        let department = OrgUnitId::new();
        let units = vec![
            OrgUnit::business_unit(business_unit, "BU"),
            OrgUnit::department(department, "Dept", business_unit),
        ];

        let approvers = build(&raws, department, business_unit);
        let mut reversed = approvers.clone();
        reversed.reverse();

        let forward = RoutingResolver::new(units.clone(), approvers).unwrap();
        let backward = RoutingResolver::new(units, reversed).unwrap();

        let a = forward.find_approver(department, level).unwrap().map(|x| x.id);
        let b = backward.find_approver(department, level).unwrap().map(|x| x.id);
        prop_assert_eq!(a, b);
    }

    /// An inactive-only configuration never resolves an approver, and
    /// max_level falls back to 1.
    #[test]
    fn prop_inactive_assignments_invisible(
        raws in prop::collection::vec(arb_approver(), 0..10),
        level in 1u8..4,
    ) {
        let business_unit = OrgUnitId::new();
        let department = OrgUnitId::new();
        let units = vec![
            OrgUnit::business_unit(business_unit, "BU"),
            OrgUnit::department(department, "Dept", business_unit),
        ];

        let approvers: Vec<Approver> = build(&raws, department, business_unit)
            .into_iter()
            .map(Approver::deactivated)
            .collect();
        let resolver = RoutingResolver::new(units, approvers).unwrap();

        prop_assert!(resolver.find_approver(department, level).unwrap().is_none());
        prop_assert_eq!(resolver.max_level(department).unwrap(), 1);
    }

    /// max_level never exceeds the number of active assignments and is at
    /// least 1.
    #[test]
    fn prop_max_level_bounds(raws in prop::collection::vec(arb_approver(), 0..10)) {
        let business_unit = OrgUnitId::new();
        let department = OrgUnitId::new();
        let units = vec![
            OrgUnit::business_unit(business_unit, "BU"),
            OrgUnit::department(department, "Dept", business_unit),
        ];

        let approvers = build(&raws, department, business_unit);
        let active = approvers.iter().filter(|a| a.active).count();
        let resolver = RoutingResolver::new(units, approvers).unwrap();

        let max = resolver.max_level(department).unwrap();
        prop_assert!(max >= 1);
        prop_assert!(usize::from(max) <= active.max(1));
    }
}
