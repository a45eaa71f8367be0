//! # Tenant Authz
//!
//! This crate provides the tenant-scoped authorization layer for a
//! multi-tenant hotel-operations platform: a hybrid RBAC/ABAC permission
//! engine plus query filtering that keeps every read and write inside the
//! caller's tenant boundary.
//!
//! ## Features
//!
//! - Seeded, versioned permission catalog of `(resource, action, scope)` triples
//! - Fixed system role hierarchy plus organization-scoped custom roles
//! - Role cloning with lineage tracking
//! - Conditional grants: time windows, recurring schedules, department match,
//!   ownership, logical composition
//! - Unknown or malformed conditions fail closed
//! - Scope-breadth evaluation with a mandatory tenant boundary check
//! - Platform short-circuit with configurable non-bypassable operations
//! - Per-request tenant contexts resolved from verified principal claims
//! - Audited act-as impersonation for platform operators
//! - Query scoping, post-filter validation, and write stamping
//! - TTL-bounded decision cache with per-user invalidation
//! - Append-only audit records and security violation reporting
//! - Thread-safe implementation, with an async facade behind the `async` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use tenant_authz::{
//!     Principal, ResourceTenancy, Scope, SystemRole, TenantAuthz,
//! };
//!
//! // Initialize the system; system roles and the catalog are seeded.
//! let authz = TenantAuthz::new()?;
//!
//! // A department admin, scoped by their verified claims.
//! let admin = Principal::new("admin-1", SystemRole::DepartmentAdmin, "org-1")
//!     .with_property("prop-1")
//!     .with_department("housekeeping");
//!
//! // A concrete record in another department of the same property.
//! let record = ResourceTenancy::organization("org-1")
//!     .with_property("prop-1")
//!     .with_department("front-desk");
//!
//! // Department-level access to it is denied at the tenant boundary...
//! let decision = authz.authorize(&admin, "users", "read", Scope::Department, Some(&record))?;
//! assert!(!decision.is_allowed());
//!
//! // ...while property-level access is within the admin's reach.
//! let decision = authz.authorize(&admin, "users", "read", Scope::Property, Some(&record))?;
//! assert!(decision.is_allowed());
//! # Ok::<(), tenant_authz::Error>(())
//! ```
//!
//! ## Query Filtering
//!
//! Reads list data through a [`TenantQuery`] scoped by the request's
//! [`TenantContext`]; writes are stamped with the context's tenant fields.
//! Post-filter validation re-checks every returned row and fails the whole
//! operation closed if anything outside the boundary slips through.
//!
//! ```rust
//! use tenant_authz::{
//!     EntityDescriptor, Principal, SystemRole, TenantAuthz, TenantQuery,
//! };
//!
//! let authz = TenantAuthz::new()?;
//! let manager = Principal::new("mgr-1", SystemRole::PropertyManager, "org-1")
//!     .with_property("prop-1");
//! let ctx = authz.resolve_context(&manager)?;
//!
//! let filter = authz.query_filter();
//! let shifts = EntityDescriptor::conventional("shifts");
//! let query = filter.scope_query(TenantQuery::over("shifts"), &ctx, &shifts);
//! assert_eq!(query.predicates().len(), 2); // organization + property
//! # Ok::<(), tenant_authz::Error>(())
//! ```
//!
//! ## Logging
//!
//! Security-relevant events (denials at the tenant boundary, act-as use,
//! post-filter violations, malformed conditions) are logged through the
//! standard logging facade:
//!
//! ```rust
//! use tenant_authz::init_audit_logger;
//!
//! // Initialize logging (must be called early in program execution).
//! init_audit_logger();
//!
//! // Configure log level through RUST_LOG environment variable:
//! // RUST_LOG=info,tenant_authz=debug
//! ```

/// Initialize the audit logger for the process.
pub fn init_audit_logger() {
    env_logger::init();
}

pub mod audit;
pub mod cache;
pub mod condition;
pub mod context;
pub mod core;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod permission;
pub mod principal;
pub mod resource;
pub mod role;
pub mod scope;
pub mod storage;

#[cfg(feature = "async")]
pub mod async_support;

pub use crate::{
    audit::{AuditLogEntry, AuditSink, MemoryAuditSink, SecurityViolation},
    cache::{CacheStats, DecisionCache},
    condition::Condition,
    context::{TenantContext, TenantContextResolver},
    core::{AccessDecision, AuthzConfig, DenyReason, TenantAuthz},
    error::{Error, Result},
    filter::{Predicate, TenantFilter, TenantQuery},
    metrics::{AuthzMetrics, MetricsSummary},
    permission::{Permission, PermissionCatalog},
    principal::{ActAsOverride, Principal},
    resource::{EntityDescriptor, ResourceTenancy},
    role::{Grant, Role, RoleBuilder},
    scope::{Scope, SystemRole},
    storage::{MemoryRoleStore, RoleStore},
};

#[cfg(feature = "async")]
pub use crate::async_support::AsyncTenantAuthz;
