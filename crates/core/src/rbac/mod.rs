//! Role-based access control for Trezo.
//!
//! Roles form a directed acyclic graph: a role grants its own permissions
//! plus everything reachable through its parent roles. The graph is loaded
//! once at process start and validated there; resolution at request time is
//! a pure reachability query.
//!
//! # Modules
//!
//! - `permission` - Permission tokens and the closed catalog
//! - `role` - Role graph construction and permission resolution
//! - `error` - RBAC-specific error types

pub mod error;
pub mod permission;
pub mod role;

#[cfg(test)]
mod role_props;

pub use error::RbacError;
pub use permission::{catalog, Permission, PermissionCategory};
pub use role::{Role, RoleGraph};
