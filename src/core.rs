//! The authorization system facade and permission evaluator.
//!
//! [`TenantAuthz`] ties the catalog, role registry, decision cache, audit
//! sink, and metrics together behind one API. Evaluation is pure with respect
//! to its inputs: the same principal, check, and contextual resource always
//! produce the same decision, which is what makes the decision cache safe.

use crate::{
    audit::{AuditLogEntry, AuditSink, MemoryAuditSink},
    cache::{CacheStats, DecisionCache, DecisionKey},
    context::{TenantContext, TenantContextResolver},
    error::{Error, Result},
    filter::TenantFilter,
    metrics::{AuthzMetrics, MetricsSummary},
    permission::{Permission, PermissionCatalog},
    principal::Principal,
    resource::ResourceTenancy,
    role::{Grant, Role},
    scope::{Scope, SystemRole},
    storage::{MemoryRoleStore, RoleStore},
};
use chrono::Utc;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// The outcome of one authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The check passed.
    Allow,
    /// The check failed, with the internal reason.
    Deny(DenyReason),
}

impl AccessDecision {
    /// Whether the check passed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    /// The deny reason, when denied.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::Deny(reason) => Some(*reason),
        }
    }

    /// The message callers may surface to end users. Deliberately uniform:
    /// deny reasons are for audit and debugging, not for responses.
    pub fn public_message(&self) -> &'static str {
        match self {
            AccessDecision::Allow => "allowed",
            AccessDecision::Deny(_) => "forbidden",
        }
    }
}

/// Why a check was denied. Internal detail, never sent to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No grant matched the resource, action, and required scope.
    NoMatchingPermission,
    /// A matching grant's condition evaluated false.
    ConditionFailed,
    /// A matching grant was usable but the contextual resource lies outside
    /// the principal's tenant boundary.
    TenantBoundaryViolation,
    /// Every matching grant had expired.
    Expired,
}

impl DenyReason {
    /// Stable tag used in metrics and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::NoMatchingPermission => "no-matching-permission",
            DenyReason::ConditionFailed => "condition-failed",
            DenyReason::TenantBoundaryViolation => "tenant-boundary-violation",
            DenyReason::Expired => "expired",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for the authorization system.
#[derive(Debug, Clone)]
pub struct AuthzConfig {
    /// Whether to memoize decisions. Disabling never changes a decision.
    pub enable_caching: bool,
    /// Decision cache TTL in seconds.
    pub cache_ttl_seconds: u64,
    /// (resource, action) pairs the platform short-circuit does not cover.
    /// Platform principals need an explicit grant for these.
    pub non_bypassable: HashSet<(String, String)>,
}

impl AuthzConfig {
    /// The operations platform principals may never perform implicitly.
    pub fn default_non_bypassable() -> HashSet<(String, String)> {
        [
            ("organization", "delete"),
            ("audit_log", "delete"),
            ("payroll_run", "purge"),
        ]
        .into_iter()
        .map(|(r, a)| (r.to_string(), a.to_string()))
        .collect()
    }

    fn is_non_bypassable(&self, resource: &str, action: &str) -> bool {
        self.non_bypassable
            .iter()
            .any(|(r, a)| r == resource && a == action)
    }
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            enable_caching: true,
            cache_ttl_seconds: 300,
            non_bypassable: Self::default_non_bypassable(),
        }
    }
}

/// The tenant-scoped authorization system.
pub struct TenantAuthz<S: RoleStore = MemoryRoleStore> {
    catalog: PermissionCatalog,
    storage: S,
    cache: DecisionCache,
    resolver: TenantContextResolver,
    audit: Arc<dyn AuditSink>,
    metrics: Arc<AuthzMetrics>,
    config: AuthzConfig,
}

impl TenantAuthz<MemoryRoleStore> {
    /// Create a system with in-memory storage, an in-memory audit sink, and
    /// default configuration. System roles are seeded on construction.
    pub fn new() -> Result<Self> {
        Self::with_config(AuthzConfig::default())
    }

    /// Create an in-memory system with the given configuration.
    pub fn with_config(config: AuthzConfig) -> Result<Self> {
        Self::with_parts(
            MemoryRoleStore::new(),
            Arc::new(MemoryAuditSink::new()),
            config,
        )
    }
}

impl<S: RoleStore> TenantAuthz<S> {
    /// Create a system from explicit parts. System role definitions are
    /// seeded into the store unless already present.
    pub fn with_parts(mut storage: S, audit: Arc<dyn AuditSink>, config: AuthzConfig) -> Result<Self> {
        for role in SystemRole::all() {
            if !storage.role_exists(None, role.name())? {
                storage.store_role(system_role_definition(role))?;
            }
        }

        let metrics = Arc::new(AuthzMetrics::new());
        let cache = DecisionCache::new(config.enable_caching, config.cache_ttl_seconds, metrics.clone());
        Ok(Self {
            catalog: PermissionCatalog::hotel_operations(),
            storage,
            cache,
            resolver: TenantContextResolver::new(audit.clone()),
            audit,
            metrics,
            config,
        })
    }

    /// The seeded permission catalog.
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    /// Metrics counters for this system.
    pub fn metrics(&self) -> &AuthzMetrics {
        &self.metrics
    }

    /// Snapshot of the current metrics.
    pub fn metrics_summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    /// Decision cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Sweep expired decisions from the cache.
    pub fn cleanup_expired_decisions(&self) {
        self.cache.cleanup_expired()
    }

    /// Drop all cached decisions for one user.
    pub fn invalidate_user(&self, user_id: &str) {
        self.cache.invalidate_user(user_id)
    }

    /// The tenant query filter wired to this system's audit sink and metrics.
    pub fn query_filter(&self) -> TenantFilter {
        TenantFilter::new(self.audit.clone(), self.metrics.clone())
    }

    /// Resolve a principal into its per-request tenant context.
    pub fn resolve_context(&self, principal: &Principal) -> Result<TenantContext> {
        self.resolver.resolve(principal)
    }

    /// Register a new role definition. Every grant must reference a catalog
    /// permission.
    pub fn register_role(&mut self, role: Role, actor: &str) -> Result<()> {
        if self.storage.role_exists(role.organization_id(), role.name())? {
            return Err(Error::RoleAlreadyExists(role.name().to_string()));
        }
        self.validate_grants(role.grants())?;

        let mut entry = AuditLogEntry::new(actor, "role.register", "role", role.name())
            .with_after(serde_json::to_value(&role)?);
        if let Some(org) = role.organization_id() {
            entry = entry.in_organization(org);
        }
        self.audit.record(entry);
        self.storage.store_role(role)?;
        self.cache.clear();
        Ok(())
    }

    /// Clone an existing role into a new custom role for an organization,
    /// tracking lineage. The clone diverges independently afterwards.
    pub fn clone_role(
        &mut self,
        source_organization_id: Option<&str>,
        source_name: &str,
        new_name: &str,
        organization_id: &str,
        actor: &str,
    ) -> Result<Role> {
        let source = self
            .storage
            .get_role(source_organization_id, source_name)?
            .ok_or_else(|| Error::RoleNotFound(source_name.to_string()))?;
        if self.storage.role_exists(Some(organization_id), new_name)? {
            return Err(Error::RoleAlreadyExists(new_name.to_string()));
        }

        let clone = Role::cloned_from(&source, new_name, organization_id);
        self.audit.record(
            AuditLogEntry::new(actor, "role.clone", "role", new_name)
                .in_organization(organization_id)
                .with_after(serde_json::to_value(&clone)?),
        );
        self.storage.store_role(clone.clone())?;
        Ok(clone)
    }

    /// Delete a custom role. System roles cannot be deleted.
    pub fn delete_role(&mut self, organization_id: &str, name: &str, actor: &str) -> Result<()> {
        if !self.storage.delete_role(Some(organization_id), name)? {
            return Err(Error::RoleNotFound(name.to_string()));
        }
        self.audit.record(
            AuditLogEntry::new(actor, "role.delete", "role", name).in_organization(organization_id),
        );
        self.cache.clear();
        Ok(())
    }

    /// Get a role definition.
    pub fn get_role(&self, organization_id: Option<&str>, name: &str) -> Result<Option<Role>> {
        self.storage.get_role(organization_id, name)
    }

    /// List role names within a scope, sorted.
    pub fn list_roles(&self, organization_id: Option<&str>) -> Result<Vec<String>> {
        self.storage.list_roles(organization_id)
    }

    /// Add a grant to a role. The permission must exist in the catalog.
    pub fn grant(
        &mut self,
        organization_id: Option<&str>,
        role_name: &str,
        grant: Grant,
        actor: &str,
    ) -> Result<()> {
        self.validate_grants(std::slice::from_ref(&grant))?;
        let role = self
            .storage
            .get_role(organization_id, role_name)?
            .ok_or_else(|| Error::RoleNotFound(role_name.to_string()))?;

        let before = role.grants().len();
        let updated = role.add_grant(grant.clone());

        let mut entry = AuditLogEntry::new(actor, "role.grant", "role", role_name)
            .with_before(serde_json::json!({ "grants": before }))
            .with_after(serde_json::to_value(&grant)?);
        if let Some(org) = organization_id {
            entry = entry.in_organization(org);
        }
        self.audit.record(entry);

        self.storage.update_role(updated)?;
        self.metrics.record_grant();
        // Role definitions are shared across users; drop all memoized decisions.
        self.cache.clear();
        Ok(())
    }

    /// Remove all grants for a permission from a role. Returns how many were
    /// removed.
    pub fn revoke(
        &mut self,
        organization_id: Option<&str>,
        role_name: &str,
        permission: &Permission,
        actor: &str,
    ) -> Result<usize> {
        let mut role = self
            .storage
            .get_role(organization_id, role_name)?
            .ok_or_else(|| Error::RoleNotFound(role_name.to_string()))?;

        let removed = role.revoke(permission);
        let mut entry = AuditLogEntry::new(actor, "role.revoke", "role", role_name)
            .with_before(serde_json::json!({ "permission": permission.to_string() }))
            .with_after(serde_json::json!({ "removed": removed }));
        if let Some(org) = organization_id {
            entry = entry.in_organization(org);
        }
        self.audit.record(entry);

        self.storage.update_role(role)?;
        self.metrics.record_revoke();
        self.cache.clear();
        Ok(removed)
    }

    /// Activate or deactivate a role. Inactive roles grant nothing.
    pub fn set_role_active(
        &mut self,
        organization_id: Option<&str>,
        role_name: &str,
        active: bool,
        actor: &str,
    ) -> Result<()> {
        let mut role = self
            .storage
            .get_role(organization_id, role_name)?
            .ok_or_else(|| Error::RoleNotFound(role_name.to_string()))?;
        role.set_active(active);

        let mut entry = AuditLogEntry::new(actor, "role.set_active", "role", role_name)
            .with_after(serde_json::json!({ "active": active }));
        if let Some(org) = organization_id {
            entry = entry.in_organization(org);
        }
        self.audit.record(entry);

        self.storage.update_role(role)?;
        self.cache.clear();
        Ok(())
    }

    /// Run one authorization check for a principal.
    ///
    /// Resolves the tenant context first, so a principal with an incomplete
    /// tenant assignment is rejected before any evaluation happens. Pass the
    /// contextual resource whenever a concrete record is being acted on; a
    /// type-level check (`None`) skips the tenant boundary comparison.
    pub fn authorize(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
        required_scope: Scope,
        contextual: Option<&ResourceTenancy>,
    ) -> Result<AccessDecision> {
        let ctx = self.resolver.resolve(principal)?;
        self.authorize_in_context(
            &ctx,
            principal.custom_roles(),
            resource,
            action,
            required_scope,
            contextual,
        )
    }

    /// Run several type-level checks for one principal, resolving the tenant
    /// context once. Used by UI layers that render whole permission sets.
    pub fn authorize_many(
        &self,
        principal: &Principal,
        checks: &[(&str, &str, Scope)],
    ) -> Result<Vec<AccessDecision>> {
        let ctx = self.resolver.resolve(principal)?;
        checks
            .iter()
            .map(|(resource, action, scope)| {
                self.authorize_in_context(
                    &ctx,
                    principal.custom_roles(),
                    resource,
                    action,
                    *scope,
                    None,
                )
            })
            .collect()
    }

    /// Run one check against an already-resolved tenant context.
    pub fn authorize_in_context(
        &self,
        ctx: &TenantContext,
        custom_roles: &[String],
        resource: &str,
        action: &str,
        required_scope: Scope,
        contextual: Option<&ResourceTenancy>,
    ) -> Result<AccessDecision> {
        self.metrics.record_check();

        // Platform short-circuit: allow everything except the configured
        // non-bypassable operations, which need an explicit grant like any
        // other check. An act-as context is still held to the tenant boundary.
        if ctx.role().is_platform() && !self.config.is_non_bypassable(resource, action) {
            let decision = if tenant_boundary_ok(required_scope, contextual, ctx) {
                AccessDecision::Allow
            } else {
                AccessDecision::Deny(DenyReason::TenantBoundaryViolation)
            };
            self.finish_decision(ctx, resource, action, &decision);
            return Ok(decision);
        }

        let key = DecisionKey {
            user_id: ctx.user_id().to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            scope: required_scope,
            fingerprint: decision_fingerprint(ctx, custom_roles, contextual),
        };
        if let Some(decision) = self.cache.get(&key) {
            // A cached denial is still a denial: metrics and logs see it.
            self.finish_decision(ctx, resource, action, &decision);
            return Ok(decision);
        }

        let decision = self.evaluate(ctx, custom_roles, resource, action, required_scope, contextual)?;
        self.finish_decision(ctx, resource, action, &decision);
        self.cache.insert(key, decision.clone());
        Ok(decision)
    }

    fn evaluate(
        &self,
        ctx: &TenantContext,
        custom_roles: &[String],
        resource: &str,
        action: &str,
        required_scope: Scope,
        contextual: Option<&ResourceTenancy>,
    ) -> Result<AccessDecision> {
        let now = Utc::now();
        let mut saw_expired = false;
        let mut saw_condition_failure = false;

        for role in self.effective_roles(ctx, custom_roles)? {
            for grant in role.matching_grants(resource, action) {
                if !grant.permission().scope().satisfies(required_scope) {
                    continue;
                }
                if grant.is_expired(now) {
                    saw_expired = true;
                    continue;
                }
                if let Some(condition) = grant.condition() {
                    if !condition.evaluate(contextual, ctx, now) {
                        saw_condition_failure = true;
                        continue;
                    }
                }
                // A usable grant exists; the decision now rests entirely on
                // the tenant boundary.
                return Ok(if tenant_boundary_ok(required_scope, contextual, ctx) {
                    AccessDecision::Allow
                } else {
                    AccessDecision::Deny(DenyReason::TenantBoundaryViolation)
                });
            }
        }

        let reason = if saw_condition_failure {
            DenyReason::ConditionFailed
        } else if saw_expired {
            DenyReason::Expired
        } else {
            DenyReason::NoMatchingPermission
        };
        Ok(AccessDecision::Deny(reason))
    }

    /// The role definitions contributing grants to a context: the system role
    /// plus any custom roles of the context's organization.
    fn effective_roles(&self, ctx: &TenantContext, custom_roles: &[String]) -> Result<Vec<Role>> {
        let mut roles = Vec::with_capacity(1 + custom_roles.len());
        if let Some(system) = self.storage.get_role(None, ctx.role().name())? {
            roles.push(system);
        }
        if let Some(org) = ctx.organization_id() {
            for name in custom_roles {
                match self.storage.get_role(Some(org), name)? {
                    Some(role) => roles.push(role),
                    None => warn!(
                        "principal {} references unknown custom role '{}' in {}",
                        ctx.user_id(),
                        name,
                        org
                    ),
                }
            }
        }
        Ok(roles)
    }

    fn validate_grants(&self, grants: &[Grant]) -> Result<()> {
        for grant in grants {
            if !self.catalog.contains(grant.permission()) {
                return Err(Error::UnknownPermission(grant.permission().to_string()));
            }
        }
        Ok(())
    }

    fn finish_decision(
        &self,
        ctx: &TenantContext,
        resource: &str,
        action: &str,
        decision: &AccessDecision,
    ) {
        match decision {
            AccessDecision::Allow => {
                debug!("allow {}:{} for {}", action, resource, ctx.user_id())
            }
            AccessDecision::Deny(reason) => {
                self.metrics.record_denial(reason.as_str());
                if *reason == DenyReason::TenantBoundaryViolation {
                    warn!(
                        "deny {}:{} for {}: {} (org {:?})",
                        action,
                        resource,
                        ctx.user_id(),
                        reason,
                        ctx.organization_id()
                    );
                } else {
                    debug!("deny {}:{} for {}: {}", action, resource, ctx.user_id(), reason);
                }
            }
        }
    }
}

/// Compare a contextual resource's tenant fields against the context at the
/// required breadth. Each level only binds when the context carries it, so a
/// broader principal (say an organization admin with no property assignment)
/// passes property-level comparisons anywhere inside its organization.
fn tenant_boundary_ok(
    required: Scope,
    contextual: Option<&ResourceTenancy>,
    ctx: &TenantContext,
) -> bool {
    let Some(resource) = contextual else {
        // Type-level check: nothing concrete to compare.
        return true;
    };

    let org_ok = match ctx.organization_id() {
        Some(org) => resource.organization_id() == org,
        None => true,
    };
    let property_ok = org_ok
        && match ctx.property_id() {
            Some(property) => resource.property_id() == Some(property),
            None => true,
        };
    let department_ok = property_ok
        && match ctx.department_id() {
            Some(department) => resource.department_id() == Some(department),
            None => true,
        };

    match required {
        Scope::Platform => true,
        Scope::Organization => org_ok,
        Scope::Property => property_ok,
        Scope::Department => department_ok,
        // Ownership never reaches across the organization boundary.
        Scope::Own => org_ok && resource.owner_id() == Some(ctx.user_id()),
    }
}

/// Cache fingerprint covering every evaluation input beyond the key's own
/// fields: tenant context, custom role set, and contextual resource tenancy.
fn decision_fingerprint(
    ctx: &TenantContext,
    custom_roles: &[String],
    contextual: Option<&ResourceTenancy>,
) -> String {
    let mut roles: Vec<&str> = custom_roles.iter().map(String::as_str).collect();
    roles.sort_unstable();
    let tenancy = match contextual {
        Some(res) => format!(
            "{}/{}/{}/{}",
            res.organization_id(),
            res.property_id().unwrap_or("-"),
            res.department_id().unwrap_or("-"),
            res.owner_id().unwrap_or("-"),
        ),
        None => "-".to_string(),
    };
    format!("{}|{}|{}", ctx.fingerprint(), roles.join(","), tenancy)
}

/// The grant set seeded for one system role.
///
/// The hierarchy governs scope breadth only; each role's reach is its
/// explicit grant list, so these definitions name every permission a role
/// carries rather than inheriting from the role below.
fn system_role_definition(role: SystemRole) -> Role {
    let grant = |resource: &str, action: &str, scope: Scope| {
        Grant::new(Permission::new(resource, action, scope))
    };
    let crud = |resource: &'static str, scope: Scope| {
        ["create", "read", "update", "delete"]
            .into_iter()
            .map(move |action| grant(resource, action, scope))
    };

    match role {
        SystemRole::Staff => Role::system(role.name())
            .with_description("Line staff: own records only")
            .add_grant(grant("users", "read", Scope::Own))
            .add_grant(grant("users", "update", Scope::Own))
            .add_grant(grant("shifts", "read", Scope::Own))
            .add_grant(grant("payroll", "read", Scope::Own))
            .add_grant(grant("documents", "read", Scope::Own))
            .add_grant(grant("training_sessions", "read", Scope::Own)),
        SystemRole::DepartmentAdmin => Role::system(role.name())
            .with_description("Administers one department")
            .add_grant(grant("users", "read", Scope::Property))
            .add_grants(crud("shifts", Scope::Department))
            .add_grant(grant("training_sessions", "create", Scope::Department))
            .add_grant(grant("training_sessions", "read", Scope::Department))
            .add_grant(grant("training_sessions", "update", Scope::Department))
            .add_grant(grant("documents", "read", Scope::Department))
            .add_grant(grant("payroll", "read", Scope::Own)),
        SystemRole::PropertyManager => Role::system(role.name())
            .with_description("Manages one property")
            .add_grant(grant("users", "read", Scope::Property))
            .add_grant(grant("users", "update", Scope::Property))
            .add_grants(crud("departments", Scope::Property))
            .add_grants(crud("shifts", Scope::Property))
            .add_grants(crud("vendors", Scope::Property))
            .add_grants(crud("training_sessions", Scope::Property))
            .add_grants(crud("concierge_objects", Scope::Property))
            .add_grant(grant("documents", "read", Scope::Property))
            .add_grant(grant("payroll", "read", Scope::Property))
            .add_grant(grant("payroll_run", "execute", Scope::Property)),
        SystemRole::OrganizationAdmin => Role::system(role.name())
            .with_description("Administers an organization")
            .add_grants(crud("users", Scope::Organization))
            .add_grants(crud("departments", Scope::Organization))
            .add_grants(crud("documents", Scope::Organization))
            .add_grants(crud("vendors", Scope::Organization))
            .add_grants(crud("training_sessions", Scope::Organization))
            .add_grants(crud("concierge_objects", Scope::Organization))
            .add_grants(crud("shifts", Scope::Organization))
            .add_grant(grant("payroll", "read", Scope::Organization))
            .add_grants(crud("roles", Scope::Organization))
            .add_grant(grant("audit_log", "read", Scope::Organization)),
        SystemRole::OrganizationOwner => Role::system(role.name())
            .with_description("Owns an organization")
            .add_grants(crud("users", Scope::Organization))
            .add_grants(crud("departments", Scope::Organization))
            .add_grants(crud("documents", Scope::Organization))
            .add_grants(crud("vendors", Scope::Organization))
            .add_grants(crud("training_sessions", Scope::Organization))
            .add_grants(crud("concierge_objects", Scope::Organization))
            .add_grants(crud("shifts", Scope::Organization))
            .add_grants(crud("payroll", Scope::Organization))
            .add_grants(crud("roles", Scope::Organization))
            .add_grant(grant("audit_log", "read", Scope::Organization))
            .add_grant(grant("organization", "update", Scope::Organization)),
        // The platform short-circuit covers everything except non-bypassable
        // operations, which must be granted explicitly.
        SystemRole::PlatformAdmin => {
            Role::system(role.name()).with_description("Platform operator")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use chrono::Duration;

    fn system() -> TenantAuthz {
        TenantAuthz::new().unwrap()
    }

    fn dept_admin(user: &str, org: &str, property: &str, department: &str) -> Principal {
        Principal::new(user, SystemRole::DepartmentAdmin, org)
            .with_property(property)
            .with_department(department)
    }

    #[test]
    fn test_department_admin_cannot_cross_departments() {
        let authz = system();
        let admin = dept_admin("admin-1", "org-1", "prop-1", "dept-1");
        let other_dept_user = ResourceTenancy::organization("org-1")
            .with_property("prop-1")
            .with_department("dept-2");

        let decision = authz
            .authorize(&admin, "users", "read", Scope::Department, Some(&other_dept_user))
            .unwrap();
        assert_eq!(
            decision,
            AccessDecision::Deny(DenyReason::TenantBoundaryViolation)
        );
    }

    #[test]
    fn test_department_admin_reads_across_property() {
        let authz = system();
        let admin = dept_admin("admin-1", "org-1", "prop-1", "dept-1");
        let other_dept_user = ResourceTenancy::organization("org-1")
            .with_property("prop-1")
            .with_department("dept-2");

        // The same record at property breadth is within reach: the seeded
        // department-admin definition carries users:read at property scope.
        let decision = authz
            .authorize(&admin, "users", "read", Scope::Property, Some(&other_dept_user))
            .unwrap();
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn test_staff_own_grant_does_not_reach_others() {
        let authz = system();
        let staff = Principal::new("staff-1", SystemRole::Staff, "org-1");

        let decision = authz
            .authorize(&staff, "users", "read", Scope::Organization, None)
            .unwrap();
        assert_eq!(
            decision,
            AccessDecision::Deny(DenyReason::NoMatchingPermission)
        );

        let own_record = ResourceTenancy::organization("org-1").with_owner("staff-1");
        let decision = authz
            .authorize(&staff, "users", "read", Scope::Own, Some(&own_record))
            .unwrap();
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn test_platform_short_circuit_and_non_bypassable() {
        let mut authz = system();
        let ops = Principal::platform("ops-1");
        let record = ResourceTenancy::organization("org-9");

        assert_eq!(
            authz
                .authorize(&ops, "users", "delete", Scope::Organization, Some(&record))
                .unwrap(),
            AccessDecision::Allow
        );

        // Non-bypassable operations fall through to grant evaluation, and the
        // seeded platform-admin role carries no grants.
        assert_eq!(
            authz
                .authorize(&ops, "organization", "delete", Scope::Platform, None)
                .unwrap(),
            AccessDecision::Deny(DenyReason::NoMatchingPermission)
        );

        // An explicit grant restores access.
        authz
            .grant(
                None,
                "platform-admin",
                Grant::new(Permission::new("organization", "delete", Scope::Platform)),
                "root",
            )
            .unwrap();
        assert_eq!(
            authz
                .authorize(&ops, "organization", "delete", Scope::Platform, None)
                .unwrap(),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_expired_grant_denies_with_expired() {
        let mut authz = system();
        let role = Role::custom("seasonal", "org-1").add_grant(
            Grant::new(Permission::new("vendors", "read", Scope::Organization))
                .expires_at(Utc::now() - Duration::hours(1)),
        );
        authz.register_role(role, "admin-1").unwrap();

        let staff =
            Principal::new("staff-1", SystemRole::Staff, "org-1").with_custom_role("seasonal");
        assert_eq!(
            authz
                .authorize(&staff, "vendors", "read", Scope::Organization, None)
                .unwrap(),
            AccessDecision::Deny(DenyReason::Expired)
        );
    }

    #[test]
    fn test_condition_failure_takes_precedence_over_expiry() {
        let mut authz = system();
        let past_window = Condition::TimeWindow {
            start: Utc::now() - Duration::hours(3),
            end: Utc::now() - Duration::hours(1),
        };
        let role = Role::custom("mixed", "org-1")
            .add_grant(
                Grant::new(Permission::new("vendors", "read", Scope::Organization))
                    .expires_at(Utc::now() - Duration::hours(1)),
            )
            .add_grant(
                Grant::new(Permission::new("vendors", "read", Scope::Organization))
                    .with_condition(past_window),
            );
        authz.register_role(role, "admin-1").unwrap();

        let staff =
            Principal::new("staff-1", SystemRole::Staff, "org-1").with_custom_role("mixed");
        assert_eq!(
            authz
                .authorize(&staff, "vendors", "read", Scope::Organization, None)
                .unwrap(),
            AccessDecision::Deny(DenyReason::ConditionFailed)
        );
    }

    #[test]
    fn test_custom_role_grants_union_with_system_role() {
        let mut authz = system();
        let role = Role::custom("night-auditor", "org-1")
            .add_grant(Grant::new(Permission::new("payroll", "read", Scope::Property)));
        authz.register_role(role, "admin-1").unwrap();

        let staff = Principal::new("staff-1", SystemRole::Staff, "org-1")
            .with_custom_role("night-auditor");
        let record = ResourceTenancy::organization("org-1").with_property("prop-1");

        assert_eq!(
            authz
                .authorize(&staff, "payroll", "read", Scope::Property, Some(&record))
                .unwrap(),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_custom_role_from_other_organization_is_ignored() {
        let mut authz = system();
        let role = Role::custom("auditor", "org-2")
            .add_grant(Grant::new(Permission::new("payroll", "read", Scope::Organization)));
        authz.register_role(role, "admin-2").unwrap();

        let staff =
            Principal::new("staff-1", SystemRole::Staff, "org-1").with_custom_role("auditor");
        assert_eq!(
            authz
                .authorize(&staff, "payroll", "read", Scope::Organization, None)
                .unwrap(),
            AccessDecision::Deny(DenyReason::NoMatchingPermission)
        );
    }

    #[test]
    fn test_revoke_invalidates_cached_allow() {
        let mut authz = system();
        let permission = Permission::new("vendors", "read", Scope::Organization);
        authz
            .register_role(
                Role::custom("vendor-reader", "org-1").add_grant(Grant::new(permission.clone())),
                "admin-1",
            )
            .unwrap();

        let staff = Principal::new("staff-1", SystemRole::Staff, "org-1")
            .with_custom_role("vendor-reader");
        assert!(authz
            .authorize(&staff, "vendors", "read", Scope::Organization, None)
            .unwrap()
            .is_allowed());

        let removed = authz
            .revoke(Some("org-1"), "vendor-reader", &permission, "admin-1")
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(
            authz
                .authorize(&staff, "vendors", "read", Scope::Organization, None)
                .unwrap(),
            AccessDecision::Deny(DenyReason::NoMatchingPermission)
        );
    }

    #[test]
    fn test_grant_requires_catalog_permission() {
        let mut authz = system();
        let result = authz.grant(
            None,
            "staff",
            Grant::new(Permission::new("spaceships", "launch", Scope::Own)),
            "root",
        );
        assert!(matches!(result, Err(Error::UnknownPermission(_))));
    }

    #[test]
    fn test_clone_role_tracks_lineage_and_diverges() {
        let mut authz = system();
        let clone = authz
            .clone_role(None, "property-manager", "assistant-manager", "org-1", "admin-1")
            .unwrap();
        assert_eq!(clone.lineage(), Some("property-manager"));

        // Mutating the clone leaves the source untouched.
        authz
            .revoke(
                Some("org-1"),
                "assistant-manager",
                &Permission::new("payroll_run", "execute", Scope::Property),
                "admin-1",
            )
            .unwrap();
        let source = authz.get_role(None, "property-manager").unwrap().unwrap();
        assert!(source
            .matching_grants("payroll_run", "execute")
            .next()
            .is_some());
    }

    #[test]
    fn test_register_duplicate_role_rejected() {
        let mut authz = system();
        authz
            .register_role(Role::custom("auditor", "org-1"), "admin-1")
            .unwrap();
        assert!(matches!(
            authz.register_role(Role::custom("auditor", "org-1"), "admin-1"),
            Err(Error::RoleAlreadyExists(_))
        ));
        // Same name in another organization is fine.
        authz
            .register_role(Role::custom("auditor", "org-2"), "admin-2")
            .unwrap();
    }

    #[test]
    fn test_inactive_role_grants_nothing() {
        let mut authz = system();
        authz
            .register_role(
                Role::custom("vendor-reader", "org-1").add_grant(Grant::new(Permission::new(
                    "vendors",
                    "read",
                    Scope::Organization,
                ))),
                "admin-1",
            )
            .unwrap();
        authz
            .set_role_active(Some("org-1"), "vendor-reader", false, "admin-1")
            .unwrap();

        let staff = Principal::new("staff-1", SystemRole::Staff, "org-1")
            .with_custom_role("vendor-reader");
        assert!(!authz
            .authorize(&staff, "vendors", "read", Scope::Organization, None)
            .unwrap()
            .is_allowed());
    }

    #[test]
    fn test_authorize_many_resolves_context_once() {
        let authz = system();
        let manager = Principal::new("mgr-1", SystemRole::PropertyManager, "org-1")
            .with_property("prop-1");

        let decisions = authz
            .authorize_many(
                &manager,
                &[
                    ("shifts", "update", Scope::Property),
                    ("payroll", "read", Scope::Property),
                    ("organization", "update", Scope::Organization),
                ],
            )
            .unwrap();
        assert!(decisions[0].is_allowed());
        assert!(decisions[1].is_allowed());
        assert!(!decisions[2].is_allowed());
    }

    #[test]
    fn test_missing_assignment_fails_before_evaluation() {
        let authz = system();
        let manager = Principal::new("mgr-1", SystemRole::PropertyManager, "org-1");
        assert!(matches!(
            authz.authorize(&manager, "shifts", "read", Scope::Property, None),
            Err(Error::MissingTenantAssignment(_))
        ));
    }

    #[test]
    fn test_decisions_are_cached_per_context() {
        let authz = system();
        let staff = Principal::new("staff-1", SystemRole::Staff, "org-1");
        let record = ResourceTenancy::organization("org-1").with_owner("staff-1");

        authz
            .authorize(&staff, "users", "read", Scope::Own, Some(&record))
            .unwrap();
        authz
            .authorize(&staff, "users", "read", Scope::Own, Some(&record))
            .unwrap();

        let summary = authz.metrics_summary();
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(authz.cache_stats().total_entries, 1);
    }

    #[test]
    fn test_cached_denials_still_count() {
        let authz = system();
        let staff = Principal::new("staff-1", SystemRole::Staff, "org-1");

        for _ in 0..2 {
            let decision = authz
                .authorize(&staff, "users", "read", Scope::Organization, None)
                .unwrap();
            assert!(!decision.is_allowed());
        }

        let summary = authz.metrics_summary();
        assert_eq!(summary.authorize_checks, 2);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(
            summary.denials.get("no-matching-permission").copied(),
            Some(2)
        );
    }

    #[test]
    fn test_disabled_cache_preserves_decisions() {
        let authz = TenantAuthz::with_config(AuthzConfig {
            enable_caching: false,
            ..AuthzConfig::default()
        })
        .unwrap();
        let staff = Principal::new("staff-1", SystemRole::Staff, "org-1");
        let record = ResourceTenancy::organization("org-1").with_owner("staff-1");

        for _ in 0..2 {
            assert!(authz
                .authorize(&staff, "users", "read", Scope::Own, Some(&record))
                .unwrap()
                .is_allowed());
        }
        assert_eq!(authz.metrics_summary().cache_hits, 0);
        assert_eq!(authz.cache_stats().total_entries, 0);
    }

    #[test]
    fn test_public_message_is_uniform() {
        assert_eq!(AccessDecision::Allow.public_message(), "allowed");
        for reason in [
            DenyReason::NoMatchingPermission,
            DenyReason::ConditionFailed,
            DenyReason::TenantBoundaryViolation,
            DenyReason::Expired,
        ] {
            assert_eq!(AccessDecision::Deny(reason).public_message(), "forbidden");
        }
    }
}
