//! Async wrapper around the authorization system.
//!
//! [`TenantAuthz`] itself is synchronous and internally thread-safe for
//! reads; mutations take `&mut self`. [`AsyncTenantAuthz`] wraps it in a
//! `tokio::sync::RwLock` so request handlers can share one instance across
//! tasks, taking the write lock only for role mutations.

use crate::{
    context::TenantContext,
    core::{AccessDecision, AuthzConfig, TenantAuthz},
    error::Result,
    metrics::MetricsSummary,
    permission::Permission,
    principal::Principal,
    resource::ResourceTenancy,
    role::{Grant, Role},
    scope::Scope,
    storage::{MemoryRoleStore, RoleStore},
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shareable async facade over [`TenantAuthz`].
pub struct AsyncTenantAuthz<S: RoleStore = MemoryRoleStore> {
    inner: Arc<RwLock<TenantAuthz<S>>>,
}

impl<S: RoleStore> Clone for AsyncTenantAuthz<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl AsyncTenantAuthz<MemoryRoleStore> {
    /// Create an in-memory system with default configuration.
    pub fn new() -> Result<Self> {
        Ok(Self::from_sync(TenantAuthz::new()?))
    }

    /// Create an in-memory system with the given configuration.
    pub fn with_config(config: AuthzConfig) -> Result<Self> {
        Ok(Self::from_sync(TenantAuthz::with_config(config)?))
    }
}

impl<S: RoleStore> AsyncTenantAuthz<S> {
    /// Wrap an existing synchronous system.
    pub fn from_sync(inner: TenantAuthz<S>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Resolve a principal into its per-request tenant context.
    pub async fn resolve_context(&self, principal: &Principal) -> Result<TenantContext> {
        self.inner.read().await.resolve_context(principal)
    }

    /// Run one authorization check for a principal.
    pub async fn authorize(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
        required_scope: Scope,
        contextual: Option<&ResourceTenancy>,
    ) -> Result<AccessDecision> {
        self.inner
            .read()
            .await
            .authorize(principal, resource, action, required_scope, contextual)
    }

    /// Run several type-level checks for one principal.
    pub async fn authorize_many(
        &self,
        principal: &Principal,
        checks: &[(&str, &str, Scope)],
    ) -> Result<Vec<AccessDecision>> {
        self.inner.read().await.authorize_many(principal, checks)
    }

    /// Register a new role definition.
    pub async fn register_role(&self, role: Role, actor: &str) -> Result<()> {
        self.inner.write().await.register_role(role, actor)
    }

    /// Clone an existing role into a new custom role for an organization.
    pub async fn clone_role(
        &self,
        source_organization_id: Option<&str>,
        source_name: &str,
        new_name: &str,
        organization_id: &str,
        actor: &str,
    ) -> Result<Role> {
        self.inner.write().await.clone_role(
            source_organization_id,
            source_name,
            new_name,
            organization_id,
            actor,
        )
    }

    /// Add a grant to a role.
    pub async fn grant(
        &self,
        organization_id: Option<&str>,
        role_name: &str,
        grant: Grant,
        actor: &str,
    ) -> Result<()> {
        self.inner
            .write()
            .await
            .grant(organization_id, role_name, grant, actor)
    }

    /// Remove all grants for a permission from a role.
    pub async fn revoke(
        &self,
        organization_id: Option<&str>,
        role_name: &str,
        permission: &Permission,
        actor: &str,
    ) -> Result<usize> {
        self.inner
            .write()
            .await
            .revoke(organization_id, role_name, permission, actor)
    }

    /// Delete a custom role.
    pub async fn delete_role(&self, organization_id: &str, name: &str, actor: &str) -> Result<()> {
        self.inner.write().await.delete_role(organization_id, name, actor)
    }

    /// Get a role definition.
    pub async fn get_role(&self, organization_id: Option<&str>, name: &str) -> Result<Option<Role>> {
        self.inner.read().await.get_role(organization_id, name)
    }

    /// List role names within a scope.
    pub async fn list_roles(&self, organization_id: Option<&str>) -> Result<Vec<String>> {
        self.inner.read().await.list_roles(organization_id)
    }

    /// Drop all cached decisions for one user.
    pub async fn invalidate_user(&self, user_id: &str) {
        self.inner.read().await.invalidate_user(user_id)
    }

    /// Snapshot of the current metrics.
    pub async fn metrics_summary(&self) -> MetricsSummary {
        self.inner.read().await.metrics_summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::SystemRole;

    #[tokio::test]
    async fn test_async_authorize_round_trip() {
        let authz = AsyncTenantAuthz::new().unwrap();
        let staff = Principal::new("staff-1", SystemRole::Staff, "org-1");
        let record = ResourceTenancy::organization("org-1").with_owner("staff-1");

        let decision = authz
            .authorize(&staff, "users", "read", Scope::Own, Some(&record))
            .await
            .unwrap();
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn test_async_shared_across_tasks() {
        let authz = AsyncTenantAuthz::new().unwrap();
        authz
            .register_role(
                Role::custom("night-auditor", "org-1").add_grant(Grant::new(Permission::new(
                    "payroll",
                    "read",
                    Scope::Property,
                ))),
                "admin-1",
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..4 {
            let authz = authz.clone();
            handles.push(tokio::spawn(async move {
                let staff = Principal::new(format!("staff-{i}"), SystemRole::Staff, "org-1")
                    .with_custom_role("night-auditor");
                authz
                    .authorize(&staff, "payroll", "read", Scope::Property, None)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_allowed());
        }
    }
}
