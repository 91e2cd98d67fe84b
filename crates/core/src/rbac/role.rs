//! Role graph construction and permission resolution.
//!
//! Inheritance is a DAG, not a chain: a role may have several parents, and
//! parallel branches (a department-scoped role next to the finance escalation
//! chain) are expected. Resolution is a work-list reachability computation
//! with a visited set, so diamond inheritance terminates and resolves each
//! ancestor once.

use std::collections::{BTreeMap, HashMap, HashSet};

use trezo_shared::config::RoleConfig;

use crate::rbac::error::RbacError;
use crate::rbac::permission::{catalog, Permission};

/// A named role with its own permissions and parent roles.
#[derive(Debug, Clone)]
pub struct Role {
    /// Role name, unique within the graph.
    pub name: String,
    /// Permissions granted directly to this role.
    pub permissions: HashSet<Permission>,
    /// Parent role names whose resolved permissions this role inherits.
    pub parents: Vec<String>,
}

impl Role {
    /// Creates a role from a name, own permission tokens, and parent names.
    #[must_use]
    pub fn new(name: &str, permissions: &[&str], parents: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            permissions: permissions.iter().map(|p| Permission::from(*p)).collect(),
            parents: parents.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Immutable role inheritance graph, validated acyclic at construction.
#[derive(Debug, Clone)]
pub struct RoleGraph {
    roles: HashMap<String, Role>,
}

impl RoleGraph {
    /// Builds a graph from explicit roles, validating parents and acyclicity.
    ///
    /// # Errors
    ///
    /// Returns `RbacError::UnknownParent` if a role inherits from a role not
    /// in the set, or `RbacError::CycleDetected` if the inheritance edges
    /// contain a cycle. Both are fatal configuration errors.
    pub fn new(roles: Vec<Role>) -> Result<Self, RbacError> {
        let graph = Self {
            roles: roles.into_iter().map(|r| (r.name.clone(), r)).collect(),
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Builds a graph from loaded configuration.
    ///
    /// # Errors
    ///
    /// Same validation as [`RoleGraph::new`].
    pub fn from_config(config: &BTreeMap<String, RoleConfig>) -> Result<Self, RbacError> {
        let roles = config
            .iter()
            .map(|(name, rc)| Role {
                name: name.clone(),
                permissions: rc.permissions.iter().map(Permission::new).collect(),
                parents: rc.parents.clone(),
            })
            .collect();
        Self::new(roles)
    }

    /// The default corporate role graph.
    ///
    /// The finance escalation chain is staff → bookkeeper → finance_officer →
    /// treasurer → executive. `department_head` is a parallel, department-
    /// scoped branch off staff: it can approve requisitions for its unit but
    /// does not inherit anything from the finance chain. `auditor` stands
    /// alone. `executive` joins both branches, which makes `staff` a diamond
    /// ancestor.
    #[must_use]
    pub fn builtin() -> Self {
        let roles = vec![
            Role::new(
                "staff",
                &[
                    catalog::REQUISITION_CREATE,
                    catalog::REQUISITION_SUBMIT,
                    catalog::PAYMENT_CREATE,
                    catalog::PAYMENT_SUBMIT,
                ],
                &[],
            ),
            Role::new("bookkeeper", &[catalog::VOUCHER_GENERATE], &["staff"]),
            Role::new(
                "department_head",
                &[catalog::REQUISITION_APPROVE],
                &["staff"],
            ),
            Role::new(
                "auditor",
                &[catalog::LEDGER_READ, catalog::VOUCHER_VERIFY],
                &[],
            ),
            Role::new(
                "finance_officer",
                &[catalog::PAYMENT_APPROVE, catalog::VOUCHER_APPROVE],
                &["bookkeeper"],
            ),
            Role::new(
                "treasurer",
                &[
                    catalog::INSTRUMENT_ISSUE,
                    catalog::INSTRUMENT_CLEAR,
                    catalog::INSTRUMENT_VOID,
                ],
                &["finance_officer", "auditor"],
            ),
            Role::new(
                "executive",
                &[catalog::WORKFLOW_CANCEL_ANY],
                &["treasurer", "department_head"],
            ),
        ];

        // The built-in graph is a constant; a validation failure here is a
        // programming error, not runtime input.
        Self::new(roles).unwrap_or_else(|e| unreachable!("builtin role graph invalid: {e}"))
    }

    /// Looks up a role by name.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Returns the names of all configured roles.
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Resolves the transitive permission set for a role.
    ///
    /// Work-list traversal over the parent edges; the visited set makes
    /// diamond inheritance resolve each ancestor exactly once.
    ///
    /// # Errors
    ///
    /// Returns `RbacError::UnknownRole` if the role is not configured.
    pub fn resolve_permissions(&self, role: &str) -> Result<HashSet<Permission>, RbacError> {
        if !self.roles.contains_key(role) {
            return Err(RbacError::UnknownRole(role.to_string()));
        }

        let mut resolved = HashSet::new();
        let mut visited = HashSet::new();
        let mut work = vec![role];

        while let Some(name) = work.pop() {
            if !visited.insert(name) {
                continue;
            }
            // Parents were validated at construction, so the lookup holds.
            if let Some(r) = self.roles.get(name) {
                resolved.extend(r.permissions.iter().cloned());
                work.extend(r.parents.iter().map(String::as_str));
            }
        }

        Ok(resolved)
    }

    /// Returns true if the role's resolved set contains the permission.
    #[must_use]
    pub fn has_permission(&self, role: &str, permission: &str) -> bool {
        self.resolve_permissions(role)
            .is_ok_and(|set| set.contains(&Permission::new(permission)))
    }

    /// Returns true if the role holds at least one of the permissions.
    #[must_use]
    pub fn has_any(&self, role: &str, permissions: &[&str]) -> bool {
        self.resolve_permissions(role).is_ok_and(|set| {
            permissions
                .iter()
                .any(|p| set.contains(&Permission::new(*p)))
        })
    }

    /// Returns true if the role holds every one of the permissions.
    #[must_use]
    pub fn has_all(&self, role: &str, permissions: &[&str]) -> bool {
        self.resolve_permissions(role).is_ok_and(|set| {
            permissions
                .iter()
                .all(|p| set.contains(&Permission::new(*p)))
        })
    }

    /// Validates parent references and acyclicity.
    fn validate(&self) -> Result<(), RbacError> {
        for role in self.roles.values() {
            for parent in &role.parents {
                if !self.roles.contains_key(parent) {
                    return Err(RbacError::UnknownParent {
                        role: role.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        // Iterative DFS with an on-path set; a back edge is a cycle.
        let mut done: HashSet<&str> = HashSet::new();
        for start in self.roles.keys() {
            if done.contains(start.as_str()) {
                continue;
            }
            self.check_cycles_from(start, &mut done)?;
        }
        Ok(())
    }

    fn check_cycles_from<'a>(
        &'a self,
        start: &'a str,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), RbacError> {
        enum Step<'s> {
            Enter(&'s str),
            Leave(&'s str),
        }

        let mut on_path: HashSet<&str> = HashSet::new();
        let mut stack = vec![Step::Enter(start)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(name) => {
                    if on_path.contains(name) {
                        return Err(RbacError::CycleDetected(name.to_string()));
                    }
                    if done.contains(name) {
                        continue;
                    }
                    on_path.insert(name);
                    stack.push(Step::Leave(name));
                    if let Some(role) = self.roles.get(name) {
                        for parent in &role.parents {
                            stack.push(Step::Enter(parent.as_str()));
                        }
                    }
                }
                Step::Leave(name) => {
                    on_path.remove(name);
                    done.insert(name);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_graph_is_valid() {
        let graph = RoleGraph::builtin();
        assert!(graph.role("staff").is_some());
        assert!(graph.role("executive").is_some());
        assert!(graph.role("nobody").is_none());
    }

    #[test]
    fn test_resolution_includes_own_permissions() {
        let graph = RoleGraph::builtin();
        let perms = graph.resolve_permissions("auditor").unwrap();
        assert!(perms.contains(&Permission::from(catalog::VOUCHER_VERIFY)));
        assert!(perms.contains(&Permission::from(catalog::LEDGER_READ)));
    }

    #[test]
    fn test_resolution_includes_inherited_permissions() {
        let graph = RoleGraph::builtin();
        // finance_officer → bookkeeper → staff
        assert!(graph.has_permission("finance_officer", catalog::VOUCHER_GENERATE));
        assert!(graph.has_permission("finance_officer", catalog::REQUISITION_CREATE));
    }

    #[test]
    fn test_diamond_inheritance_resolves() {
        let graph = RoleGraph::builtin();
        // executive reaches staff along two paths (treasurer chain and
        // department_head). Resolution must terminate and include staff's
        // permissions once.
        let perms = graph.resolve_permissions("executive").unwrap();
        assert!(perms.contains(&Permission::from(catalog::REQUISITION_CREATE)));
        assert!(perms.contains(&Permission::from(catalog::REQUISITION_APPROVE)));
        assert!(perms.contains(&Permission::from(catalog::INSTRUMENT_ISSUE)));
        assert!(perms.contains(&Permission::from(catalog::WORKFLOW_CANCEL_ANY)));
    }

    #[test]
    fn test_department_branch_does_not_reach_finance_chain() {
        let graph = RoleGraph::builtin();
        // department_head sits on a parallel branch: it never inherits the
        // escalation chain's top permissions.
        assert!(graph.has_permission("department_head", catalog::REQUISITION_APPROVE));
        assert!(!graph.has_permission("department_head", catalog::WORKFLOW_CANCEL_ANY));
        assert!(!graph.has_permission("department_head", catalog::INSTRUMENT_ISSUE));
        assert!(!graph.has_permission("department_head", catalog::PAYMENT_APPROVE));
    }

    #[test]
    fn test_has_any_and_has_all() {
        let graph = RoleGraph::builtin();
        assert!(graph.has_any(
            "treasurer",
            &[catalog::WORKFLOW_CANCEL_ANY, catalog::INSTRUMENT_CLEAR]
        ));
        assert!(graph.has_all(
            "treasurer",
            &[catalog::INSTRUMENT_ISSUE, catalog::VOUCHER_VERIFY]
        ));
        assert!(!graph.has_all(
            "treasurer",
            &[catalog::INSTRUMENT_ISSUE, catalog::WORKFLOW_CANCEL_ANY]
        ));
        assert!(!graph.has_any("staff", &[catalog::INSTRUMENT_ISSUE]));
    }

    #[test]
    fn test_unknown_role_fails_resolution() {
        let graph = RoleGraph::builtin();
        assert!(matches!(
            graph.resolve_permissions("intern"),
            Err(RbacError::UnknownRole(_))
        ));
        assert!(!graph.has_permission("intern", catalog::REQUISITION_CREATE));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let result = RoleGraph::new(vec![Role::new("a", &[], &["ghost"])]);
        assert!(matches!(result, Err(RbacError::UnknownParent { .. })));
    }

    #[test]
    fn test_self_cycle_rejected() {
        let result = RoleGraph::new(vec![Role::new("a", &[], &["a"])]);
        assert!(matches!(result, Err(RbacError::CycleDetected(_))));
    }

    #[test]
    fn test_long_cycle_rejected() {
        let result = RoleGraph::new(vec![
            Role::new("a", &[], &["b"]),
            Role::new("b", &[], &["c"]),
            Role::new("c", &[], &["a"]),
        ]);
        assert!(matches!(result, Err(RbacError::CycleDetected(_))));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let result = RoleGraph::new(vec![
            Role::new("base", &["x:read:own"], &[]),
            Role::new("left", &[], &["base"]),
            Role::new("right", &[], &["base"]),
            Role::new("top", &[], &["left", "right"]),
        ]);
        let graph = result.unwrap();
        assert!(graph.has_permission("top", "x:read:own"));
    }

    #[test]
    fn test_from_config_roundtrip() {
        use trezo_shared::config::RoleConfig;

        let mut config = BTreeMap::new();
        config.insert(
            "clerk".to_string(),
            RoleConfig {
                permissions: vec![catalog::REQUISITION_CREATE.to_string()],
                parents: vec![],
            },
        );
        config.insert(
            "supervisor".to_string(),
            RoleConfig {
                permissions: vec![catalog::REQUISITION_APPROVE.to_string()],
                parents: vec!["clerk".to_string()],
            },
        );

        let graph = RoleGraph::from_config(&config).unwrap();
        assert!(graph.has_all(
            "supervisor",
            &[catalog::REQUISITION_CREATE, catalog::REQUISITION_APPROVE]
        ));
    }

    #[test]
    fn test_from_config_cycle_is_fatal() {
        use trezo_shared::config::RoleConfig;

        let mut config = BTreeMap::new();
        config.insert(
            "a".to_string(),
            RoleConfig {
                permissions: vec![],
                parents: vec!["b".to_string()],
            },
        );
        config.insert(
            "b".to_string(),
            RoleConfig {
                permissions: vec![],
                parents: vec!["a".to_string()],
            },
        );

        let err = RoleGraph::from_config(&config).unwrap_err();
        let app: trezo_shared::AppError = err.into();
        assert!(app.is_fatal());
    }
}
