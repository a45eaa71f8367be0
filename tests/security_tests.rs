//! Adversarial tests: every path by which data or access could leak across
//! the tenant boundary must stay shut.

use serde_json::json;
use std::sync::Arc;
use tenant_authz::{
    AccessDecision, ActAsOverride, AuthzConfig, AuthzMetrics, Condition, DenyReason,
    EntityDescriptor, Error, Grant, MemoryAuditSink, Permission, Principal, ResourceTenancy, Role,
    Scope, SystemRole, TenantAuthz, TenantContext, TenantFilter, TenantQuery,
};

#[test]
fn no_tenant_role_crosses_organizations() {
    let authz = TenantAuthz::new().unwrap();
    let foreign = ResourceTenancy::organization("org-2")
        .with_property("prop-1")
        .with_department("dept-1")
        .with_owner("user-1");

    for role in [
        SystemRole::Staff,
        SystemRole::DepartmentAdmin,
        SystemRole::PropertyManager,
        SystemRole::OrganizationAdmin,
        SystemRole::OrganizationOwner,
    ] {
        let mut principal = Principal::new("user-1", role, "org-1");
        if role.requires_property() {
            principal = principal.with_property("prop-1");
        }
        if role.requires_department() {
            principal = principal.with_department("dept-1");
        }
        for scope in [
            Scope::Own,
            Scope::Department,
            Scope::Property,
            Scope::Organization,
        ] {
            let decision = authz
                .authorize(&principal, "users", "read", scope, Some(&foreign))
                .unwrap();
            assert!(
                !decision.is_allowed(),
                "{role} crossed the boundary at {scope}"
            );
        }
    }
}

#[test]
fn role_hierarchy_does_not_union_permission_sets() {
    let authz = TenantAuthz::new().unwrap();
    // An organization admin outranks a property manager in breadth, but does
    // not inherit payroll_run:execute from the property-manager definition.
    let admin = Principal::new("admin-1", SystemRole::OrganizationAdmin, "org-1");
    assert_eq!(
        authz
            .authorize(&admin, "payroll_run", "execute", Scope::Property, None)
            .unwrap(),
        AccessDecision::Deny(DenyReason::NoMatchingPermission)
    );
}

#[test]
fn unauthorized_act_as_never_resolves() {
    let authz = TenantAuthz::new().unwrap();
    let ops = Principal::platform("ops-1").with_act_as(ActAsOverride {
        organization_id: "org-1".to_string(),
        property_id: None,
        department_id: None,
        authorized: false,
    });
    assert!(matches!(
        authz.authorize(&ops, "users", "read", Scope::Organization, None),
        Err(Error::ValidationError { .. })
    ));
}

#[test]
fn non_bypassable_operations_resist_the_short_circuit() {
    let authz = TenantAuthz::new().unwrap();
    let ops = Principal::platform("ops-1");

    for (resource, action) in [
        ("organization", "delete"),
        ("audit_log", "delete"),
        ("payroll_run", "purge"),
    ] {
        let decision = authz
            .authorize(&ops, resource, action, Scope::Platform, None)
            .unwrap();
        assert!(!decision.is_allowed(), "{action}:{resource} bypassed");
    }
}

#[test]
fn non_bypassable_set_is_configurable() {
    let mut config = AuthzConfig::default();
    config
        .non_bypassable
        .insert(("users".to_string(), "delete".to_string()));
    let authz = TenantAuthz::with_config(config).unwrap();
    let ops = Principal::platform("ops-1");

    assert!(!authz
        .authorize(&ops, "users", "delete", Scope::Organization, None)
        .unwrap()
        .is_allowed());
    assert!(authz
        .authorize(&ops, "users", "read", Scope::Organization, None)
        .unwrap()
        .is_allowed());
}

#[test]
fn custom_role_names_do_not_leak_across_organizations() {
    let mut authz = TenantAuthz::new().unwrap();
    authz
        .register_role(
            Role::custom("auditor", "org-2").add_grant(Grant::new(Permission::new(
                "payroll",
                "read",
                Scope::Organization,
            ))),
            "admin-2",
        )
        .unwrap();

    // A principal in org-1 claiming org-2's role name gets nothing.
    let impostor =
        Principal::new("user-1", SystemRole::Staff, "org-1").with_custom_role("auditor");
    assert_eq!(
        authz
            .authorize(&impostor, "payroll", "read", Scope::Organization, None)
            .unwrap(),
        AccessDecision::Deny(DenyReason::NoMatchingPermission)
    );
}

#[test]
fn malformed_condition_payloads_fail_closed() {
    let mut authz = TenantAuthz::new().unwrap();
    // A condition kind from a newer deployment, deserialized by this build.
    let condition: Condition =
        serde_json::from_value(json!({ "kind": "geo_fence", "radius_m": 250 })).unwrap();
    authz
        .register_role(
            Role::custom("fenced", "org-1").add_grant(
                Grant::new(Permission::new("vendors", "read", Scope::Organization))
                    .with_condition(condition),
            ),
            "admin-1",
        )
        .unwrap();

    let staff = Principal::new("staff-1", SystemRole::Staff, "org-1").with_custom_role("fenced");
    assert_eq!(
        authz
            .authorize(&staff, "vendors", "read", Scope::Organization, None)
            .unwrap(),
        AccessDecision::Deny(DenyReason::ConditionFailed)
    );
}

#[test]
fn inverted_time_window_grants_nothing() {
    let mut authz = TenantAuthz::new().unwrap();
    let inverted = Condition::TimeWindow {
        start: chrono::Utc::now() + chrono::Duration::hours(1),
        end: chrono::Utc::now() - chrono::Duration::hours(1),
    };
    authz
        .register_role(
            Role::custom("broken", "org-1").add_grant(
                Grant::new(Permission::new("vendors", "read", Scope::Organization))
                    .with_condition(inverted),
            ),
            "admin-1",
        )
        .unwrap();

    let staff = Principal::new("staff-1", SystemRole::Staff, "org-1").with_custom_role("broken");
    assert!(!authz
        .authorize(&staff, "vendors", "read", Scope::Organization, None)
        .unwrap()
        .is_allowed());
}

#[test]
fn leaked_rows_fail_the_whole_read_and_leave_a_trail() {
    let sink = Arc::new(MemoryAuditSink::new());
    let metrics = Arc::new(AuthzMetrics::new());
    let filter = TenantFilter::new(sink.clone(), metrics.clone());
    let ctx = TenantContext::scoped(
        "org-1",
        None::<&str>,
        None::<&str>,
        "admin-1",
        SystemRole::OrganizationAdmin,
    );
    let users = EntityDescriptor::conventional("users");

    let rows = vec![
        json!({"id": "u-1", "organization_id": "org-1"}),
        json!({"id": "u-9", "organization_id": "org-2"}),
        json!({"id": "u-10", "organization_id": "org-3"}),
    ];

    let result = filter.validate_rows(rows, &ctx, &users);
    assert!(matches!(result, Err(Error::SecurityViolation(2))));
    assert_eq!(sink.violation_count(), 2);
    assert_eq!(metrics.summary().security_violations, 2);
    let violation = &sink.violations()[0];
    assert_eq!(violation.context_organization_id.as_deref(), Some("org-1"));
    assert_eq!(violation.found_organization_id.as_deref(), Some("org-2"));
}

#[test]
fn lookups_cannot_probe_existence_across_tenants() {
    let filter = TenantFilter::new(
        Arc::new(MemoryAuditSink::new()),
        Arc::new(AuthzMetrics::new()),
    );
    let ctx = TenantContext::scoped(
        "org-1",
        None::<&str>,
        None::<&str>,
        "admin-1",
        SystemRole::OrganizationAdmin,
    );
    let users = EntityDescriptor::conventional("users");
    let rows = vec![json!({"id": "u-9", "organization_id": "org-2"})];

    let foreign = filter.find_one(&rows, &ctx, &users, "u-9");
    let missing = filter.find_one(&rows, &ctx, &users, "u-404");
    // Identical errors: no oracle for cross-tenant existence.
    assert_eq!(
        format!("{}", foreign.unwrap_err()),
        format!("{}", missing.unwrap_err())
    );
}

#[test]
fn spoofed_tenant_fields_are_overwritten_on_write() {
    let filter = TenantFilter::new(
        Arc::new(MemoryAuditSink::new()),
        Arc::new(AuthzMetrics::new()),
    );
    let ctx = TenantContext::scoped(
        "org-1",
        Some("prop-1"),
        Some("dept-1"),
        "admin-1",
        SystemRole::DepartmentAdmin,
    );
    let shifts = EntityDescriptor::conventional("shifts");

    let mut record = json!({
        "organization_id": "org-2",
        "property_id": "prop-9",
        "department_id": "dept-9",
    });
    filter.ensure_tenant_fields(&mut record, &ctx, &shifts).unwrap();
    assert_eq!(record["organization_id"], "org-1");
    assert_eq!(record["property_id"], "prop-1");
    assert_eq!(record["department_id"], "dept-1");
}

#[test]
fn cached_decisions_never_cross_contexts() {
    let authz = TenantAuthz::new().unwrap();

    // The same user id issued by two tenants: the decision cached under the
    // org-1 context must not answer for the org-2 context.
    let admin_in = |org: &str| Principal::new("admin-1", SystemRole::OrganizationAdmin, org);
    let record = ResourceTenancy::organization("org-1");

    assert!(authz
        .authorize(&admin_in("org-1"), "users", "read", Scope::Organization, Some(&record))
        .unwrap()
        .is_allowed());
    assert!(!authz
        .authorize(&admin_in("org-2"), "users", "read", Scope::Organization, Some(&record))
        .unwrap()
        .is_allowed());
    // Both misses plus repeats hitting their own entries only.
    assert!(authz
        .authorize(&admin_in("org-1"), "users", "read", Scope::Organization, Some(&record))
        .unwrap()
        .is_allowed());
}

#[test]
fn disabling_the_cache_changes_no_security_outcome() {
    let build = |caching: bool| {
        TenantAuthz::with_config(AuthzConfig {
            enable_caching: caching,
            ..AuthzConfig::default()
        })
        .unwrap()
    };
    let cached = build(true);
    let uncached = build(false);

    let admin = Principal::new("admin-1", SystemRole::DepartmentAdmin, "org-1")
        .with_property("prop-1")
        .with_department("dept-1");
    let foreign = ResourceTenancy::organization("org-2");

    for authz in [&cached, &uncached] {
        for _ in 0..2 {
            assert_eq!(
                authz
                    .authorize(&admin, "users", "read", Scope::Department, Some(&foreign))
                    .unwrap(),
                AccessDecision::Deny(DenyReason::TenantBoundaryViolation)
            );
        }
    }
}

#[test]
fn grants_cannot_reference_unseeded_permissions() {
    let mut authz = TenantAuthz::new().unwrap();
    // Registering a role with an out-of-catalog grant fails, so a tenant
    // cannot mint permissions the platform never defined.
    let result = authz.register_role(
        Role::custom("escalator", "org-1").add_grant(Grant::new(Permission::new(
            "platform_settings",
            "update",
            Scope::Platform,
        ))),
        "admin-1",
    );
    assert!(matches!(result, Err(Error::UnknownPermission(_))));
}

#[test]
fn scoped_query_cannot_be_widened_by_caller_predicates() {
    let filter = TenantFilter::new(
        Arc::new(MemoryAuditSink::new()),
        Arc::new(AuthzMetrics::new()),
    );
    let ctx = TenantContext::scoped(
        "org-1",
        None::<&str>,
        None::<&str>,
        "admin-1",
        SystemRole::OrganizationAdmin,
    );
    let users = EntityDescriptor::conventional("users");

    // A hostile caller pre-loads a predicate for another organization; the
    // conjunction with the tenant predicate can only produce nothing.
    let query = filter.scope_query(
        TenantQuery::over("users").and_where("organization_id", "org-2"),
        &ctx,
        &users,
    );
    let rows = vec![
        json!({"id": "u-1", "organization_id": "org-1"}),
        json!({"id": "u-9", "organization_id": "org-2"}),
    ];
    assert!(query.apply(&rows).is_empty());
}
