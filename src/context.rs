//! Per-request tenant context and its resolver.
//!
//! The platform this crate grew out of kept a process-wide "current tenant";
//! here the tenant scope is an explicit [`TenantContext`] value built once per
//! request from the verified principal and passed as an argument everywhere it
//! is needed. Nothing in this crate stores a context beyond the request that
//! created it, which is what makes concurrent request handling safe.

use crate::{
    audit::{AuditLogEntry, AuditSink},
    error::{Error, Result},
    principal::Principal,
    scope::SystemRole,
};
use std::sync::Arc;

/// The effective tenant scope of one request. Immutable once constructed.
///
/// An absent organization id means the context is unrestricted: downstream
/// filtering applies no tenant predicates. Only platform principals without an
/// act-as override resolve to an unrestricted context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    organization_id: Option<String>,
    property_id: Option<String>,
    department_id: Option<String>,
    user_id: String,
    role: SystemRole,
}

impl TenantContext {
    /// Build a tenant-scoped context.
    pub fn scoped(
        organization_id: impl Into<String>,
        property_id: Option<impl Into<String>>,
        department_id: Option<impl Into<String>>,
        user_id: impl Into<String>,
        role: SystemRole,
    ) -> Self {
        Self {
            organization_id: Some(organization_id.into()),
            property_id: property_id.map(Into::into),
            department_id: department_id.map(Into::into),
            user_id: user_id.into(),
            role,
        }
    }

    /// Build an unrestricted platform context.
    pub fn unrestricted(user_id: impl Into<String>) -> Self {
        Self {
            organization_id: None,
            property_id: None,
            department_id: None,
            user_id: user_id.into(),
            role: SystemRole::PlatformAdmin,
        }
    }

    /// Organization scope; `None` means unrestricted.
    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    /// Property scope, when assigned.
    pub fn property_id(&self) -> Option<&str> {
        self.property_id.as_deref()
    }

    /// Department scope, when assigned.
    pub fn department_id(&self) -> Option<&str> {
        self.department_id.as_deref()
    }

    /// The requesting user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The effective role this context was resolved under.
    pub fn role(&self) -> SystemRole {
        self.role
    }

    /// Whether downstream filtering applies no tenant predicates.
    pub fn is_unrestricted(&self) -> bool {
        self.organization_id.is_none()
    }

    /// Stable fingerprint of the tenant fields, used in cache keys so that
    /// a decision cached under one context is never served to another.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.organization_id.as_deref().unwrap_or("*"),
            self.property_id.as_deref().unwrap_or("-"),
            self.department_id.as_deref().unwrap_or("-"),
            self.user_id,
            self.role
        )
    }
}

/// Resolves verified principals into per-request tenant contexts.
pub struct TenantContextResolver {
    audit: Arc<dyn AuditSink>,
}

impl TenantContextResolver {
    /// Create a resolver that logs act-as use to the given sink.
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self { audit }
    }

    /// Derive the effective tenant context for a request.
    ///
    /// Fails with [`Error::MissingTenantAssignment`] when the principal's role
    /// requires a tenant assignment the claims do not carry; the request is
    /// rejected before any business logic runs rather than silently defaulted.
    pub fn resolve(&self, principal: &Principal) -> Result<TenantContext> {
        if principal.role().is_platform() {
            return self.resolve_platform(principal);
        }

        let organization_id = principal.organization_id().ok_or_else(|| {
            Error::MissingTenantAssignment(format!(
                "role '{}' requires an organization assignment",
                principal.role()
            ))
        })?;

        if principal.role().requires_property() && principal.property_id().is_none() {
            return Err(Error::MissingTenantAssignment(format!(
                "role '{}' requires a property assignment",
                principal.role()
            )));
        }
        if principal.role().requires_department() && principal.department_id().is_none() {
            return Err(Error::MissingTenantAssignment(format!(
                "role '{}' requires a department assignment",
                principal.role()
            )));
        }

        Ok(TenantContext::scoped(
            organization_id,
            principal.property_id(),
            principal.department_id(),
            principal.user_id(),
            principal.role(),
        ))
    }

    fn resolve_platform(&self, principal: &Principal) -> Result<TenantContext> {
        let Some(act_as) = principal.act_as() else {
            return Ok(TenantContext::unrestricted(principal.user_id()));
        };

        if !act_as.authorized {
            return Err(Error::ValidationError {
                field: "act_as".to_string(),
                reason: "act-as override was not authorized".to_string(),
                invalid_value: Some(act_as.organization_id.clone()),
            });
        }

        self.audit.record(
            AuditLogEntry::new(
                principal.user_id(),
                "context.act_as",
                "organization",
                &act_as.organization_id,
            )
            .in_organization(&act_as.organization_id),
        );

        Ok(TenantContext::scoped(
            &act_as.organization_id,
            act_as.property_id.as_deref(),
            act_as.department_id.as_deref(),
            principal.user_id(),
            SystemRole::PlatformAdmin,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::principal::ActAsOverride;

    fn resolver() -> (TenantContextResolver, Arc<MemoryAuditSink>) {
        let sink = Arc::new(MemoryAuditSink::new());
        (TenantContextResolver::new(sink.clone()), sink)
    }

    #[test]
    fn test_resolves_scoped_context() {
        let (resolver, _) = resolver();
        let principal = Principal::new("user-1", SystemRole::DepartmentAdmin, "org-1")
            .with_property("prop-1")
            .with_department("dept-1");

        let ctx = resolver.resolve(&principal).unwrap();
        assert_eq!(ctx.organization_id(), Some("org-1"));
        assert_eq!(ctx.property_id(), Some("prop-1"));
        assert_eq!(ctx.department_id(), Some("dept-1"));
        assert_eq!(ctx.role(), SystemRole::DepartmentAdmin);
        assert!(!ctx.is_unrestricted());
    }

    #[test]
    fn test_missing_department_rejected() {
        let (resolver, _) = resolver();
        let principal =
            Principal::new("user-1", SystemRole::DepartmentAdmin, "org-1").with_property("prop-1");
        assert!(matches!(
            resolver.resolve(&principal),
            Err(Error::MissingTenantAssignment(_))
        ));
    }

    #[test]
    fn test_missing_property_rejected() {
        let (resolver, _) = resolver();
        let principal = Principal::new("user-1", SystemRole::PropertyManager, "org-1");
        assert!(matches!(
            resolver.resolve(&principal),
            Err(Error::MissingTenantAssignment(_))
        ));
    }

    #[test]
    fn test_org_admin_resolves_without_property() {
        let (resolver, _) = resolver();
        let principal = Principal::new("user-1", SystemRole::OrganizationAdmin, "org-1");
        let ctx = resolver.resolve(&principal).unwrap();
        assert_eq!(ctx.organization_id(), Some("org-1"));
        assert_eq!(ctx.property_id(), None);
    }

    #[test]
    fn test_platform_without_act_as_is_unrestricted() {
        let (resolver, sink) = resolver();
        let ctx = resolver.resolve(&Principal::platform("ops-1")).unwrap();
        assert!(ctx.is_unrestricted());
        assert_eq!(sink.entry_count(), 0);
    }

    #[test]
    fn test_authorized_act_as_is_scoped_and_audited() {
        let (resolver, sink) = resolver();
        let principal = Principal::platform("ops-1").with_act_as(ActAsOverride {
            organization_id: "org-7".to_string(),
            property_id: Some("prop-2".to_string()),
            department_id: None,
            authorized: true,
        });

        let ctx = resolver.resolve(&principal).unwrap();
        assert_eq!(ctx.organization_id(), Some("org-7"));
        assert_eq!(ctx.property_id(), Some("prop-2"));
        assert!(!ctx.is_unrestricted());
        assert_eq!(sink.entry_count(), 1);
        assert_eq!(sink.entries()[0].action, "context.act_as");
    }

    #[test]
    fn test_unauthorized_act_as_rejected() {
        let (resolver, sink) = resolver();
        let principal = Principal::platform("ops-1").with_act_as(ActAsOverride {
            organization_id: "org-7".to_string(),
            property_id: None,
            department_id: None,
            authorized: false,
        });

        assert!(resolver.resolve(&principal).is_err());
        assert_eq!(sink.entry_count(), 0);
    }

    #[test]
    fn test_fingerprint_distinguishes_contexts() {
        let a = TenantContext::scoped(
            "org-1",
            Some("prop-1"),
            None::<&str>,
            "user-1",
            SystemRole::PropertyManager,
        );
        let b = TenantContext::scoped(
            "org-2",
            Some("prop-1"),
            None::<&str>,
            "user-1",
            SystemRole::PropertyManager,
        );
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(
            a.fingerprint(),
            TenantContext::unrestricted("user-1").fingerprint()
        );
    }
}
