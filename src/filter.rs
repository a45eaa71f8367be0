//! Tenant query filtering and post-filter validation.
//!
//! Every list read is scoped by appending tenant predicates derived from the
//! request's [`TenantContext`]; every write is stamped with the context's
//! tenant fields, overwriting whatever the client supplied. Filtering is
//! belt-and-braces: even after predicates are applied, returned rows are
//! validated against the tenant boundary, and any row found outside it fails
//! the whole operation closed.
//!
//! The crate is storage-agnostic: a [`TenantQuery`] is a conjunction of
//! equality predicates that an integration renders into its own query
//! language, and the row-level helpers here operate on JSON records through
//! an [`EntityDescriptor`].

use crate::{
    audit::{AuditSink, SecurityViolation},
    context::TenantContext,
    error::{Error, Result},
    metrics::AuthzMetrics,
    resource::EntityDescriptor,
    scope::Scope,
};
use log::warn;
use serde_json::Value;
use std::sync::Arc;

/// One equality predicate. Tenant filtering is conjunctive only: predicates
/// are ANDed, never ORed, so scoping can only ever narrow a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Column name.
    pub field: String,
    /// Required value.
    pub value: String,
}

impl Predicate {
    /// Create an equality predicate.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a JSON record satisfies this predicate.
    pub fn matches(&self, record: &Value) -> bool {
        record
            .get(&self.field)
            .and_then(Value::as_str)
            .map(|v| v == self.value)
            .unwrap_or(false)
    }
}

/// A conjunctive query over one entity type.
#[derive(Debug, Clone)]
pub struct TenantQuery {
    entity_type: String,
    predicates: Vec<Predicate>,
}

impl TenantQuery {
    /// Start a query over an entity type.
    pub fn over(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            predicates: Vec::new(),
        }
    }

    /// Add an equality predicate.
    pub fn and_where(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::eq(field, value));
        self
    }

    /// The entity type being queried.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// All predicates, caller-supplied first, tenant predicates appended.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether a record satisfies every predicate.
    pub fn matches(&self, record: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    /// Run the query against in-memory rows.
    pub fn apply<'a>(&self, rows: &'a [Value]) -> Vec<&'a Value> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

/// Scopes queries and validates rows against a tenant context.
pub struct TenantFilter {
    audit: Arc<dyn AuditSink>,
    metrics: Arc<AuthzMetrics>,
}

impl TenantFilter {
    /// Create a filter reporting violations to the given sink.
    pub fn new(audit: Arc<dyn AuditSink>, metrics: Arc<AuthzMetrics>) -> Self {
        Self { audit, metrics }
    }

    /// Append the tenant predicates implied by a context to a query.
    ///
    /// A predicate is added for every tenant field the context carries, so a
    /// narrower context always yields a stricter query; own-scoped roles are
    /// additionally pinned to the records they own. An unrestricted context
    /// adds nothing.
    pub fn scope_query(
        &self,
        mut query: TenantQuery,
        ctx: &TenantContext,
        descriptor: &EntityDescriptor,
    ) -> TenantQuery {
        let Some(org) = ctx.organization_id() else {
            return query;
        };

        query = query.and_where(descriptor.organization_field(), org);
        if let (Some(field), Some(property)) = (descriptor.property_field(), ctx.property_id()) {
            query = query.and_where(field, property);
        }
        if let (Some(field), Some(department)) =
            (descriptor.department_field(), ctx.department_id())
        {
            query = query.and_where(field, department);
        }
        if ctx.role().max_scope() == Scope::Own {
            match descriptor.owner_field() {
                Some(field) => query = query.and_where(field, ctx.user_id()),
                None => warn!(
                    "own-scoped query on '{}' has no owner column; falling back to tenant fields",
                    descriptor.entity_type()
                ),
            }
        }
        query
    }

    /// Validate rows already read from storage against the tenant boundary.
    ///
    /// Every row is re-checked against the same predicate set a scoped query
    /// carries, so a leak from another property, department, or owner inside
    /// the organization is caught as surely as a cross-organization one.
    /// Correctly filtered queries never trip this; a failing row means some
    /// upstream path skipped filtering, so the whole read fails closed rather
    /// than returning the surviving rows.
    pub fn validate_rows(
        &self,
        rows: Vec<Value>,
        ctx: &TenantContext,
        descriptor: &EntityDescriptor,
    ) -> Result<Vec<Value>> {
        let Some(org) = ctx.organization_id() else {
            return Ok(rows);
        };
        let boundary = self.scope_query(
            TenantQuery::over(descriptor.entity_type()),
            ctx,
            descriptor,
        );

        let mut violations = 0usize;
        for row in &rows {
            // A row with unreadable tenant fields cannot be proven in-tenant.
            if boundary.matches(row) {
                continue;
            }
            violations += 1;
            self.metrics.record_security_violation();
            let mut violation = SecurityViolation::new(ctx.user_id(), descriptor.entity_type())
                .context_scoped_to(org);
            if let Some(tenancy) = descriptor.tenancy_of(row) {
                violation = violation.found_in(tenancy.organization_id());
            }
            if let Some(id) = row.get("id").and_then(Value::as_str) {
                violation = violation.with_record_id(id);
            }
            self.audit.security_violation(violation);
        }

        if violations > 0 {
            return Err(Error::SecurityViolation(violations));
        }
        Ok(rows)
    }

    /// Find one record by id within the tenant boundary.
    ///
    /// Returns [`Error::NotFound`] identically whether the record does not
    /// exist or exists in another tenant, so lookups cannot probe for
    /// existence across the boundary.
    pub fn find_one(
        &self,
        rows: &[Value],
        ctx: &TenantContext,
        descriptor: &EntityDescriptor,
        id: &str,
    ) -> Result<Value> {
        let query = self.scope_query(
            TenantQuery::over(descriptor.entity_type()).and_where("id", id),
            ctx,
            descriptor,
        );
        match query.apply(rows).first() {
            Some(row) => Ok((*row).clone()),
            None => Err(Error::NotFound),
        }
    }

    /// Stamp a record's tenant fields from the context before a write,
    /// overwriting any client-supplied values. The owner column is only
    /// filled when absent, since writes may act on records owned by others.
    pub fn ensure_tenant_fields(
        &self,
        record: &mut Value,
        ctx: &TenantContext,
        descriptor: &EntityDescriptor,
    ) -> Result<()> {
        let Some(org) = ctx.organization_id() else {
            return Ok(());
        };
        let Some(obj) = record.as_object_mut() else {
            return Err(Error::ValidationError {
                field: "record".to_string(),
                reason: "tenant fields can only be stamped on an object".to_string(),
                invalid_value: None,
            });
        };

        obj.insert(
            descriptor.organization_field().to_string(),
            Value::String(org.to_string()),
        );
        if let (Some(field), Some(property)) = (descriptor.property_field(), ctx.property_id()) {
            obj.insert(field.to_string(), Value::String(property.to_string()));
        }
        if let (Some(field), Some(department)) =
            (descriptor.department_field(), ctx.department_id())
        {
            obj.insert(field.to_string(), Value::String(department.to_string()));
        }
        if let Some(field) = descriptor.owner_field() {
            if obj.get(field).and_then(Value::as_str).is_none() {
                obj.insert(field.to_string(), Value::String(ctx.user_id().to_string()));
            }
        }
        Ok(())
    }
}
