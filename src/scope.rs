//! Scope breadth and system role orderings.
//!
//! Both orderings are encoded as explicit enums with derived `Ord` so that
//! every breadth comparison in the crate goes through one well-tested
//! function instead of being inferred from naming or array position.

use serde::{Deserialize, Serialize};

/// How widely a permission applies.
///
/// The ordering is the breadth ordering: `Own < Department < Property <
/// Organization < Platform`. A grant held at a wider scope satisfies any
/// check at a narrower scope, never the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Applies only to resources the principal owns.
    Own,
    /// Applies within the principal's department.
    Department,
    /// Applies within the principal's property.
    Property,
    /// Applies within the principal's organization.
    Organization,
    /// Applies platform-wide, across organizations.
    Platform,
}

impl Scope {
    /// Check whether a grant held at this scope satisfies a check requiring
    /// `required`. Wider satisfies narrower.
    pub fn satisfies(self, required: Scope) -> bool {
        self >= required
    }

    /// String tag used in serialized permissions and audit records.
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Own => "own",
            Scope::Department => "department",
            Scope::Property => "property",
            Scope::Organization => "organization",
            Scope::Platform => "platform",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "own" => Ok(Scope::Own),
            "department" => Ok(Scope::Department),
            "property" => Ok(Scope::Property),
            "organization" => Ok(Scope::Organization),
            "platform" => Ok(Scope::Platform),
            other => Err(crate::error::Error::InvalidPermission(format!(
                "unknown scope '{other}'"
            ))),
        }
    }
}

/// The fixed hierarchy of system roles.
///
/// The ordering governs scope-breadth checks only: a higher role implicitly
/// satisfies any breadth check a lower role would satisfy, but it does not
/// inherit the lower role's explicit permission list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemRole {
    /// Line staff; sees only records they own.
    Staff,
    /// Administers a single department within a property.
    DepartmentAdmin,
    /// Manages a single property within an organization.
    PropertyManager,
    /// Administers an organization.
    OrganizationAdmin,
    /// Owns an organization.
    OrganizationOwner,
    /// Platform operator; unscoped unless acting as a tenant.
    PlatformAdmin,
}

impl SystemRole {
    /// The widest scope this role can ever satisfy.
    pub fn max_scope(self) -> Scope {
        match self {
            SystemRole::Staff => Scope::Own,
            SystemRole::DepartmentAdmin => Scope::Department,
            SystemRole::PropertyManager => Scope::Property,
            SystemRole::OrganizationAdmin | SystemRole::OrganizationOwner => Scope::Organization,
            SystemRole::PlatformAdmin => Scope::Platform,
        }
    }

    /// Whether context resolution must find a property assignment for this role.
    pub fn requires_property(self) -> bool {
        matches!(
            self,
            SystemRole::PropertyManager | SystemRole::DepartmentAdmin
        )
    }

    /// Whether context resolution must find a department assignment for this role.
    pub fn requires_department(self) -> bool {
        matches!(self, SystemRole::DepartmentAdmin)
    }

    /// Whether this role operates at platform level.
    pub fn is_platform(self) -> bool {
        matches!(self, SystemRole::PlatformAdmin)
    }

    /// Well-known role name, as stored in the role registry.
    pub fn name(self) -> &'static str {
        match self {
            SystemRole::Staff => "staff",
            SystemRole::DepartmentAdmin => "department-admin",
            SystemRole::PropertyManager => "property-manager",
            SystemRole::OrganizationAdmin => "organization-admin",
            SystemRole::OrganizationOwner => "organization-owner",
            SystemRole::PlatformAdmin => "platform-admin",
        }
    }

    /// All system roles, narrowest first.
    pub fn all() -> [SystemRole; 6] {
        [
            SystemRole::Staff,
            SystemRole::DepartmentAdmin,
            SystemRole::PropertyManager,
            SystemRole::OrganizationAdmin,
            SystemRole::OrganizationOwner,
            SystemRole::PlatformAdmin,
        ]
    }
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for SystemRole {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(SystemRole::Staff),
            "department-admin" => Ok(SystemRole::DepartmentAdmin),
            "property-manager" => Ok(SystemRole::PropertyManager),
            "organization-admin" => Ok(SystemRole::OrganizationAdmin),
            "organization-owner" => Ok(SystemRole::OrganizationOwner),
            "platform-admin" => Ok(SystemRole::PlatformAdmin),
            other => Err(crate::error::Error::ValidationError {
                field: "role".to_string(),
                reason: "unknown system role".to_string(),
                invalid_value: Some(other.to_string()),
            }),
        }
    }
}
