//! Audit records and the sink boundary.
//!
//! Every sensitive mutation (grant, revoke, role change, act-as resolution)
//! produces an [`AuditLogEntry`]; post-filter validation failures produce a
//! [`SecurityViolation`]. Records are append-only: the sink exposes no update
//! or delete surface. The real platform forwards records to an external audit
//! store; [`MemoryAuditSink`] is the in-process implementation used in tests
//! and as a default.

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

/// An immutable record of a sensitive mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Unique entry id.
    pub id: String,
    /// The acting user.
    pub actor: String,
    /// What happened (e.g. "role.grant", "context.act_as").
    pub action: String,
    /// The kind of entity mutated.
    pub entity_type: String,
    /// The mutated entity's id.
    pub entity_id: String,
    /// Organization the mutation happened in, when scoped.
    pub organization_id: Option<String>,
    /// Property the mutation happened in, when scoped.
    pub property_id: Option<String>,
    /// State before the mutation, when capturable.
    pub before: Option<serde_json::Value>,
    /// State after the mutation, when capturable.
    pub after: Option<serde_json::Value>,
    /// When the mutation happened.
    pub timestamp: DateTime<Utc>,
    /// Which subsystem produced the entry.
    pub source: String,
}

impl AuditLogEntry {
    /// Create a new entry stamped with the current time.
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor: actor.into(),
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            organization_id: None,
            property_id: None,
            before: None,
            after: None,
            timestamp: Utc::now(),
            source: "tenant-authz".to_string(),
        }
    }

    /// Set the organization scope.
    pub fn in_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    /// Set the property scope.
    pub fn in_property(mut self, property_id: impl Into<String>) -> Self {
        self.property_id = Some(property_id.into());
        self
    }

    /// Attach the before-state.
    pub fn with_before(mut self, before: serde_json::Value) -> Self {
        self.before = Some(before);
        self
    }

    /// Attach the after-state.
    pub fn with_after(mut self, after: serde_json::Value) -> Self {
        self.after = Some(after);
        self
    }
}

/// A record that post-filter validation caught out-of-tenant data.
///
/// Never produced in correct operation; a firing means some code path upstream
/// failed to filter and must be treated as a defect, not an access denial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityViolation {
    /// Unique violation id.
    pub id: String,
    /// The user whose request surfaced the leaked record.
    pub user_id: String,
    /// The entity type that leaked.
    pub entity_type: String,
    /// The leaked record's id, when identifiable.
    pub record_id: Option<String>,
    /// Organization the record actually belongs to, when identifiable.
    pub found_organization_id: Option<String>,
    /// Organization the requesting context was scoped to.
    pub context_organization_id: Option<String>,
    /// When the violation was caught.
    pub timestamp: DateTime<Utc>,
}

impl SecurityViolation {
    /// Create a violation record stamped with the current time.
    pub fn new(user_id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            entity_type: entity_type.into(),
            record_id: None,
            found_organization_id: None,
            context_organization_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Identify the leaked record.
    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    /// Record which organization the leaked row belongs to.
    pub fn found_in(mut self, organization_id: impl Into<String>) -> Self {
        self.found_organization_id = Some(organization_id.into());
        self
    }

    /// Record which organization the context was scoped to.
    pub fn context_scoped_to(mut self, organization_id: impl Into<String>) -> Self {
        self.context_organization_id = Some(organization_id.into());
        self
    }
}

/// Destination for audit records and security violations.
pub trait AuditSink: Send + Sync {
    /// Append an audit entry.
    fn record(&self, entry: AuditLogEntry);

    /// Report a caught tenant-boundary leak.
    fn security_violation(&self, violation: SecurityViolation);
}

/// In-memory append-only sink.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: RwLock<Vec<AuditLogEntry>>,
    violations: RwLock<Vec<SecurityViolation>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded entries.
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.read().unwrap().clone()
    }

    /// Snapshot of all recorded violations.
    pub fn violations(&self) -> Vec<SecurityViolation> {
        self.violations.read().unwrap().clone()
    }

    /// Number of recorded entries.
    pub fn entry_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Number of recorded violations.
    pub fn violation_count(&self) -> usize {
        self.violations.read().unwrap().len()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditLogEntry) {
        info!(
            "audit: {} {} {}/{} by {}",
            entry.action, entry.source, entry.entity_type, entry.entity_id, entry.actor
        );
        self.entries.write().unwrap().push(entry);
    }

    fn security_violation(&self, violation: SecurityViolation) {
        error!(
            "SECURITY VIOLATION: out-of-tenant {} record surfaced for user {} (found org {:?}, context org {:?})",
            violation.entity_type,
            violation.user_id,
            violation.found_organization_id,
            violation.context_organization_id
        );
        self.violations.write().unwrap().push(violation);
    }
}
