//! Verified principal claims.
//!
//! A [`Principal`] is the set of claims extracted from an already-verified
//! token by the external authentication layer. This crate trusts those claims
//! as authenticated facts and derives everything else (context, decisions)
//! from them; token verification itself is out of scope.

use crate::scope::SystemRole;
use serde::{Deserialize, Serialize};

/// An authenticated actor's verified claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique user identifier.
    user_id: String,
    /// Assigned system role.
    role: SystemRole,
    /// Names of custom roles assigned to this user.
    custom_roles: Vec<String>,
    /// The one organization this principal belongs to. Absent only for
    /// platform-level principals.
    organization_id: Option<String>,
    /// Property assignment, when the principal is property-scoped.
    property_id: Option<String>,
    /// Department assignment, when the principal is department-scoped.
    department_id: Option<String>,
    /// Impersonation override carried by platform principals.
    act_as: Option<ActAsOverride>,
}

/// An explicit, separately-authorized impersonation claim.
///
/// Platform principals may carry one to act within a specific tenant; the
/// override must be authorized upstream and its use is audit-logged during
/// context resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActAsOverride {
    /// Target organization.
    pub organization_id: String,
    /// Target property, when impersonating below organization level.
    pub property_id: Option<String>,
    /// Target department.
    pub department_id: Option<String>,
    /// Whether the override itself was authorized upstream.
    pub authorized: bool,
}

impl Principal {
    /// Create a tenant-scoped principal.
    pub fn new(
        user_id: impl Into<String>,
        role: SystemRole,
        organization_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            custom_roles: Vec::new(),
            organization_id: Some(organization_id.into()),
            property_id: None,
            department_id: None,
            act_as: None,
        }
    }

    /// Create a platform-level principal with no tenant assignment.
    pub fn platform(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: SystemRole::PlatformAdmin,
            custom_roles: Vec::new(),
            organization_id: None,
            property_id: None,
            department_id: None,
            act_as: None,
        }
    }

    /// Set the property assignment.
    pub fn with_property(mut self, property_id: impl Into<String>) -> Self {
        self.property_id = Some(property_id.into());
        self
    }

    /// Set the department assignment.
    pub fn with_department(mut self, department_id: impl Into<String>) -> Self {
        self.department_id = Some(department_id.into());
        self
    }

    /// Add a custom role reference.
    pub fn with_custom_role(mut self, role_name: impl Into<String>) -> Self {
        self.custom_roles.push(role_name.into());
        self
    }

    /// Attach an act-as override.
    pub fn with_act_as(mut self, act_as: ActAsOverride) -> Self {
        self.act_as = Some(act_as);
        self
    }

    /// Get the user id.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Get the system role.
    pub fn role(&self) -> SystemRole {
        self.role
    }

    /// Get the custom role names.
    pub fn custom_roles(&self) -> &[String] {
        &self.custom_roles
    }

    /// Get the organization id, absent only for platform principals.
    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    /// Get the property assignment.
    pub fn property_id(&self) -> Option<&str> {
        self.property_id.as_deref()
    }

    /// Get the department assignment.
    pub fn department_id(&self) -> Option<&str> {
        self.department_id.as_deref()
    }

    /// Get the act-as override, if carried.
    pub fn act_as(&self) -> Option<&ActAsOverride> {
        self.act_as.as_ref()
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.organization_id {
            Some(org) => write!(f, "{}@{} ({})", self.user_id, org, self.role),
            None => write!(f, "{} ({})", self.user_id, self.role),
        }
    }
}
