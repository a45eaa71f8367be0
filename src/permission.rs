//! Permission definitions and the seeded catalog.
//!
//! A permission is an immutable `(resource, action, scope)` triple. The
//! catalog is seeded once at initialization and never mutated in place;
//! changes supersede the catalog under a new version number.

use crate::{
    error::{Error, Result},
    scope::Scope,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An action that can be performed on a resource type, bounded by a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// The resource type this permission applies to (e.g. "users", "payroll").
    resource: String,
    /// The action being performed (e.g. "read", "update", "delete").
    action: String,
    /// The maximal breadth at which the permission applies.
    scope: Scope,
}

impl Permission {
    /// Create a new permission.
    ///
    /// # Panics
    ///
    /// Panics if the resource or action is empty or contains null characters,
    /// matching the validation applied by [`Permission::parse`].
    pub fn new(resource: impl Into<String>, action: impl Into<String>, scope: Scope) -> Self {
        let resource = resource.into();
        let action = action.into();

        if resource.trim().is_empty() || action.trim().is_empty() {
            panic!("Resource and action cannot be empty");
        }
        if resource.contains('\0') || action.contains('\0') {
            panic!("Resource and action cannot contain null characters");
        }

        Self {
            resource,
            action,
            scope,
        }
    }

    /// Get the resource type.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Get the action.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Get the maximal scope breadth.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Check if this permission matches the given resource and action tags.
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.action == action
    }

    /// Parse a permission from the `action:resource@scope` string form.
    pub fn parse(permission_str: &str) -> Result<Self> {
        let (head, scope_str) = permission_str.split_once('@').ok_or_else(|| {
            Error::InvalidPermission(format!(
                "Permission must be in format 'action:resource@scope', got: '{permission_str}'"
            ))
        })?;
        let (action, resource) = head.split_once(':').ok_or_else(|| {
            Error::InvalidPermission(format!(
                "Permission must be in format 'action:resource@scope', got: '{permission_str}'"
            ))
        })?;

        let action = action.trim();
        let resource = resource.trim();
        if action.is_empty() || resource.is_empty() {
            return Err(Error::InvalidPermission(format!(
                "Action and resource cannot be empty: '{permission_str}'"
            )));
        }
        if action.contains('\0') || resource.contains('\0') {
            return Err(Error::InvalidPermission(format!(
                "Action and resource cannot contain null characters: '{permission_str}'"
            )));
        }

        let scope: Scope = scope_str.trim().parse()?;
        Ok(Self::new(resource, action, scope))
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.action, self.resource, self.scope)
    }
}

impl std::str::FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// The seeded catalog of all permissions the platform knows about.
///
/// Evaluation only considers grants whose permission exists in the catalog,
/// so retiring a permission is a catalog supersede rather than a sweep over
/// every role definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionCatalog {
    version: u32,
    // (resource, action, scope) -> permission; the same resource/action pair
    // is seeded at every scope it may be granted at
    entries: HashMap<(String, String, Scope), Permission>,
}

impl PermissionCatalog {
    /// Create an empty catalog at version 1.
    pub fn empty() -> Self {
        Self {
            version: 1,
            entries: HashMap::new(),
        }
    }

    /// Build the hotel-operations catalog shipped with the platform.
    ///
    /// CRUD on each tenant-scoped resource is seeded at every breadth from
    /// `own` up to `organization`, so a role definition can pick the exact
    /// breadth it grants.
    pub fn hotel_operations() -> Self {
        let mut catalog = Self::empty();

        let crud = ["create", "read", "update", "delete"];
        let tenant_scopes = [
            Scope::Own,
            Scope::Department,
            Scope::Property,
            Scope::Organization,
        ];
        let resources = [
            "users",
            "departments",
            "payroll",
            "documents",
            "training_sessions",
            "shifts",
            "vendors",
            "concierge_objects",
        ];

        for resource in resources {
            for action in crud {
                for scope in tenant_scopes {
                    catalog.seed(Permission::new(resource, action, scope));
                }
            }
        }

        // Administrative permissions.
        for action in crud {
            catalog.seed(Permission::new("roles", action, Scope::Organization));
        }
        catalog.seed(Permission::new("audit_log", "read", Scope::Organization));
        catalog.seed(Permission::new("audit_log", "delete", Scope::Platform));
        catalog.seed(Permission::new("organization", "update", Scope::Organization));
        catalog.seed(Permission::new("organization", "delete", Scope::Platform));
        catalog.seed(Permission::new("payroll_run", "execute", Scope::Property));
        catalog.seed(Permission::new("payroll_run", "purge", Scope::Platform));

        catalog
    }

    /// Get the catalog version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of seeded permissions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a permission triple.
    pub fn lookup(&self, resource: &str, action: &str, scope: Scope) -> Option<&Permission> {
        self.entries
            .get(&(resource.to_string(), action.to_string(), scope))
    }

    /// Check whether a permission triple is known to the catalog.
    pub fn contains(&self, permission: &Permission) -> bool {
        self.lookup(permission.resource(), permission.action(), permission.scope())
            .is_some()
    }

    /// Whether any scope of a (resource, action) pair is seeded.
    pub fn knows_operation(&self, resource: &str, action: &str) -> bool {
        self.entries
            .keys()
            .any(|(r, a, _)| r == resource && a == action)
    }

    /// Replace this catalog with a new permission set under the next version.
    pub fn supersede(&self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        let mut next = Self {
            version: self.version + 1,
            entries: HashMap::new(),
        };
        for permission in permissions {
            next.seed(permission);
        }
        next
    }

    /// Iterate over all seeded permissions.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.entries.values()
    }

    fn seed(&mut self, permission: Permission) {
        self.entries.insert(
            (
                permission.resource().to_string(),
                permission.action().to_string(),
                permission.scope(),
            ),
            permission,
        );
    }
}
