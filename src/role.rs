//! Role and grant definitions.
//!
//! A role is a named, ordered set of grants. System roles are the fixed
//! hierarchy definitions seeded at startup (no organization id); custom roles
//! are organization-scoped and may be cloned from another role, with lineage
//! tracked.

use crate::{
    condition::Condition,
    error::{Error, Result},
    permission::Permission,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Association of a role with a permission, optionally conditioned and
/// time-limited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    permission: Permission,
    condition: Option<Condition>,
    expires_at: Option<DateTime<Utc>>,
}

impl Grant {
    /// Create an unconditional, non-expiring grant.
    pub fn new(permission: Permission) -> Self {
        Self {
            permission,
            condition: None,
            expires_at: None,
        }
    }

    /// Attach a condition predicate.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set an expiry timestamp.
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Get the granted permission.
    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    /// Get the attached condition, if any.
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Get the expiry, if any.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Check whether the grant has expired at the given instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => now >= expiry,
            None => false,
        }
    }
}

/// A named set of permission grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier for the role.
    id: String,
    /// Role name, unique within its scope (system-wide or per organization).
    name: String,
    /// Optional description.
    description: Option<String>,
    /// `None` for seeded system roles; the owning organization for custom roles.
    organization_id: Option<String>,
    /// Ordered grants.
    grants: Vec<Grant>,
    /// Name of the role this one was cloned from, when applicable.
    cloned_from: Option<String>,
    /// Whether this role is active. Inactive roles grant nothing.
    active: bool,
}

impl Role {
    /// Create a new system role definition.
    pub fn system(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            organization_id: None,
            grants: Vec::new(),
            cloned_from: None,
            active: true,
        }
    }

    /// Create a new custom role owned by an organization.
    pub fn custom(name: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            organization_id: Some(organization_id.into()),
            grants: Vec::new(),
            cloned_from: None,
            active: true,
        }
    }

    /// Clone another role's grants into a new custom role, tracking lineage.
    pub fn cloned_from(source: &Role, name: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: source.description.clone(),
            organization_id: Some(organization_id.into()),
            grants: source.grants.clone(),
            cloned_from: Some(source.name.clone()),
            active: true,
        }
    }

    /// Get the role's unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the role's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the role's description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Get the role's description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Get the owning organization; `None` for system roles.
    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    /// Whether this is a seeded system role.
    pub fn is_system(&self) -> bool {
        self.organization_id.is_none()
    }

    /// Get the name of the role this one was cloned from.
    pub fn lineage(&self) -> Option<&str> {
        self.cloned_from.as_deref()
    }

    /// Add a grant to this role.
    pub fn add_grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }

    /// Add multiple grants to this role.
    pub fn add_grants(mut self, grants: impl IntoIterator<Item = Grant>) -> Self {
        self.grants.extend(grants);
        self
    }

    /// Remove all grants for a permission. Returns how many were removed.
    pub fn revoke(&mut self, permission: &Permission) -> usize {
        let before = self.grants.len();
        self.grants.retain(|g| g.permission() != permission);
        before - self.grants.len()
    }

    /// All grants, in grant order. Empty when the role is inactive.
    pub fn grants(&self) -> &[Grant] {
        if self.active {
            &self.grants
        } else {
            &[]
        }
    }

    /// Grants matching a (resource, action) pair, in grant order.
    pub fn matching_grants<'a>(
        &'a self,
        resource: &'a str,
        action: &'a str,
    ) -> impl Iterator<Item = &'a Grant> {
        self.grants()
            .iter()
            .filter(move |g| g.permission().matches(resource, action))
    }

    /// Set whether this role is active.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Check if this role is active.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Builder for creating roles with a fluent API.
#[derive(Debug, Default)]
pub struct RoleBuilder {
    name: Option<String>,
    description: Option<String>,
    organization_id: Option<String>,
    grants: Vec<Grant>,
    active: bool,
}

impl RoleBuilder {
    /// Create a new role builder.
    pub fn new() -> Self {
        Self {
            active: true,
            ..Default::default()
        }
    }

    /// Set the role name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the role description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Scope the role to an organization (custom role).
    pub fn organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    /// Add a grant.
    pub fn grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }

    /// Add a bare permission grant.
    pub fn permission(mut self, permission: Permission) -> Self {
        self.grants.push(Grant::new(permission));
        self
    }

    /// Set whether the role is active.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Build the role.
    pub fn build(self) -> Result<Role> {
        let name = self
            .name
            .ok_or_else(|| Error::InvalidConfiguration("Role name is required".to_string()))?;

        let mut role = match self.organization_id {
            Some(org) => Role::custom(name, org),
            None => Role::system(name),
        };
        if let Some(description) = self.description {
            role = role.with_description(description);
        }
        role = role.add_grants(self.grants);
        role.set_active(self.active);
        Ok(role)
    }
}
