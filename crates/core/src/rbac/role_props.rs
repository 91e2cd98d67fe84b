//! Property-based tests for role permission resolution.
//!
//! Random DAGs are generated by only allowing parent edges toward
//! lower-indexed roles, which guarantees acyclicity by construction.

use proptest::prelude::*;
use std::collections::HashSet;

use crate::rbac::permission::Permission;
use crate::rbac::role::{Role, RoleGraph};

/// A generated role: own permission tokens plus parent indices.
type RawRole = (Vec<String>, Vec<usize>);

fn arb_token() -> impl Strategy<Value = String> {
    "[a-z]{3,8}:[a-z]{3,8}:(own|unit|any)"
}

/// Generates between 1 and 12 roles; role `i` may only name parents `< i`.
fn arb_dag() -> impl Strategy<Value = Vec<RawRole>> {
    prop::collection::vec(
        (
            prop::collection::vec(arb_token(), 0..4),
            prop::collection::vec(any::<prop::sample::Index>(), 0..3),
        ),
        1..12,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (perms, parent_picks))| {
                let parents: Vec<usize> = if i == 0 {
                    vec![]
                } else {
                    let mut p: Vec<usize> =
                        parent_picks.iter().map(|idx| idx.index(i)).collect();
                    p.sort_unstable();
                    p.dedup();
                    p
                };
                (perms, parents)
            })
            .collect()
    })
}

fn build_graph(raw: &[RawRole]) -> RoleGraph {
    let roles = raw
        .iter()
        .enumerate()
        .map(|(i, (perms, parents))| {
            let perm_refs: Vec<&str> = perms.iter().map(String::as_str).collect();
            let parent_names: Vec<String> = parents.iter().map(|p| format!("r{p}")).collect();
            let parent_refs: Vec<&str> = parent_names.iter().map(String::as_str).collect();
            Role::new(&format!("r{i}"), &perm_refs, &parent_refs)
        })
        .collect();
    RoleGraph::new(roles).expect("generated DAG must validate")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// resolve_permissions(R) is always a superset of R's own permissions.
    #[test]
    fn prop_resolution_superset_of_own(raw in arb_dag()) {
        let graph = build_graph(&raw);
        for (i, (perms, _)) in raw.iter().enumerate() {
            let resolved = graph.resolve_permissions(&format!("r{i}")).unwrap();
            for token in perms {
                prop_assert!(resolved.contains(&Permission::new(token.clone())));
            }
        }
    }

    /// A role's resolved set contains every parent's resolved set.
    #[test]
    fn prop_resolution_superset_of_parents(raw in arb_dag()) {
        let graph = build_graph(&raw);
        for (i, (_, parents)) in raw.iter().enumerate() {
            let resolved = graph.resolve_permissions(&format!("r{i}")).unwrap();
            for p in parents {
                let parent_set = graph.resolve_permissions(&format!("r{p}")).unwrap();
                prop_assert!(parent_set.is_subset(&resolved));
            }
        }
    }

    /// Resolution is idempotent: resolving twice yields the same set.
    #[test]
    fn prop_resolution_idempotent(raw in arb_dag()) {
        let graph = build_graph(&raw);
        for i in 0..raw.len() {
            let name = format!("r{i}");
            let a = graph.resolve_permissions(&name).unwrap();
            let b = graph.resolve_permissions(&name).unwrap();
            prop_assert_eq!(a, b);
        }
    }

    /// has_permission agrees with membership in the resolved set.
    #[test]
    fn prop_has_permission_consistent(raw in arb_dag(), token in arb_token()) {
        let graph = build_graph(&raw);
        for i in 0..raw.len() {
            let name = format!("r{i}");
            let resolved: HashSet<Permission> = graph.resolve_permissions(&name).unwrap();
            prop_assert_eq!(
                graph.has_permission(&name, &token),
                resolved.contains(&Permission::new(token.clone()))
            );
        }
    }
}
