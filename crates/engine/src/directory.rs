//! User directory port.
//!
//! The engine does not own user accounts; it asks a [`Directory`] who a user
//! is. Identity providers (HR systems, SSO) implement the trait; the
//! in-memory variant serves tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;

use trezo_shared::types::{OrgUnitId, UserId};
use trezo_shared::{AppError, AppResult};

/// A resolved user identity: role name and home organizational unit.
#[derive(Debug, Clone)]
pub struct Principal {
    /// The user's identifier.
    pub user_id: UserId,
    /// The user's role in the role graph.
    pub role: String,
    /// The organizational unit the user belongs to.
    pub org_unit: OrgUnitId,
}

/// Resolves user identifiers to principals.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolves a user to their role and organizational unit.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` for an unknown user.
    async fn principal(&self, user_id: UserId) -> AppResult<Principal>;
}

/// Directory backed by a static map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: HashMap<UserId, Principal>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user with the given role and unit.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId, role: &str, org_unit: OrgUnitId) -> Self {
        self.users.insert(
            user_id,
            Principal {
                user_id,
                role: role.to_string(),
                org_unit,
            },
        );
        self
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn principal(&self, user_id: UserId) -> AppResult<Principal> {
        self.users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup() {
        let user = UserId::new();
        let unit = OrgUnitId::new();
        let directory = InMemoryDirectory::new().with_user(user, "staff", unit);

        let principal = directory.principal(user).await.unwrap();
        assert_eq!(principal.role, "staff");
        assert_eq!(principal.org_unit, unit);

        let err = directory.principal(UserId::new()).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
