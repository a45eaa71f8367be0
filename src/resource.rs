//! Tenant-scoped resource descriptions.
//!
//! Two views of a resource cross the library boundary: [`ResourceTenancy`],
//! the concrete tenant fields of one resource instance (used by the
//! evaluator's boundary check and the condition engine), and
//! [`EntityDescriptor`], the schema-level mapping naming which columns of an
//! entity type carry the tenant scope (used by the query filter). Both are
//! produced by the surrounding ORM/schema layer.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The tenant fields of a concrete resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTenancy {
    organization_id: String,
    property_id: Option<String>,
    department_id: Option<String>,
    owner_id: Option<String>,
}

impl ResourceTenancy {
    /// Create a tenancy rooted at an organization.
    pub fn organization(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            property_id: None,
            department_id: None,
            owner_id: None,
        }
    }

    /// Set the property this resource belongs to.
    pub fn with_property(mut self, property_id: impl Into<String>) -> Self {
        self.property_id = Some(property_id.into());
        self
    }

    /// Set the department this resource belongs to.
    pub fn with_department(mut self, department_id: impl Into<String>) -> Self {
        self.department_id = Some(department_id.into());
        self
    }

    /// Set the owning user of this resource.
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Get the organization id.
    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    /// Get the property id, if the resource is property-scoped.
    pub fn property_id(&self) -> Option<&str> {
        self.property_id.as_deref()
    }

    /// Get the department id, if the resource is department-scoped.
    pub fn department_id(&self) -> Option<&str> {
        self.department_id.as_deref()
    }

    /// Get the owning user id, if the resource has one.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }
}

/// Names the tenant-scope columns of an entity type.
///
/// Property, department, and owner columns are optional: an organization-level
/// entity (e.g. an organization settings row) has no property column, and
/// entities without per-user ownership have no owner column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    entity_type: String,
    organization_field: String,
    property_field: Option<String>,
    department_field: Option<String>,
    owner_field: Option<String>,
}

impl EntityDescriptor {
    /// Create a descriptor with validation of the entity type tag.
    pub fn new(
        entity_type: impl Into<String>,
        organization_field: impl Into<String>,
    ) -> Result<Self> {
        let entity_type = entity_type.into();
        if entity_type.trim().is_empty() || entity_type.contains('\0') {
            return Err(Error::ValidationError {
                field: "entity_type".to_string(),
                reason: "Entity type cannot be empty or contain null characters".to_string(),
                invalid_value: Some(entity_type),
            });
        }
        Ok(Self {
            entity_type,
            organization_field: organization_field.into(),
            property_field: None,
            department_field: None,
            owner_field: None,
        })
    }

    /// Descriptor with the conventional column names used across the platform
    /// schema (`organization_id`, `property_id`, `department_id`, `owner_id`).
    pub fn conventional(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            organization_field: "organization_id".to_string(),
            property_field: Some("property_id".to_string()),
            department_field: Some("department_id".to_string()),
            owner_field: Some("owner_id".to_string()),
        }
    }

    /// Name the property column.
    pub fn with_property_field(mut self, field: impl Into<String>) -> Self {
        self.property_field = Some(field.into());
        self
    }

    /// Name the department column.
    pub fn with_department_field(mut self, field: impl Into<String>) -> Self {
        self.department_field = Some(field.into());
        self
    }

    /// Name the owner column.
    pub fn with_owner_field(mut self, field: impl Into<String>) -> Self {
        self.owner_field = Some(field.into());
        self
    }

    /// Remove the property column (organization-level entity).
    pub fn without_property_field(mut self) -> Self {
        self.property_field = None;
        self
    }

    /// Remove the department column.
    pub fn without_department_field(mut self) -> Self {
        self.department_field = None;
        self
    }

    /// Remove the owner column.
    pub fn without_owner_field(mut self) -> Self {
        self.owner_field = None;
        self
    }

    /// Get the entity type tag.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Get the organization column name.
    pub fn organization_field(&self) -> &str {
        &self.organization_field
    }

    /// Get the property column name, if any.
    pub fn property_field(&self) -> Option<&str> {
        self.property_field.as_deref()
    }

    /// Get the department column name, if any.
    pub fn department_field(&self) -> Option<&str> {
        self.department_field.as_deref()
    }

    /// Get the owner column name, if any.
    pub fn owner_field(&self) -> Option<&str> {
        self.owner_field.as_deref()
    }

    /// Read the tenancy of a JSON record through this descriptor.
    ///
    /// Returns `None` when the organization column is missing or not a
    /// string, since a record without a tenant root cannot be validated.
    pub fn tenancy_of(&self, record: &serde_json::Value) -> Option<ResourceTenancy> {
        let obj = record.as_object()?;
        let organization_id = obj.get(&self.organization_field)?.as_str()?;
        let mut tenancy = ResourceTenancy::organization(organization_id);
        if let Some(field) = &self.property_field {
            if let Some(value) = obj.get(field).and_then(|v| v.as_str()) {
                tenancy = tenancy.with_property(value);
            }
        }
        if let Some(field) = &self.department_field {
            if let Some(value) = obj.get(field).and_then(|v| v.as_str()) {
                tenancy = tenancy.with_department(value);
            }
        }
        if let Some(field) = &self.owner_field {
            if let Some(value) = obj.get(field).and_then(|v| v.as_str()) {
                tenancy = tenancy.with_owner(value);
            }
        }
        Some(tenancy)
    }
}
