//! Storage abstraction for role definitions.
//!
//! System roles live alongside custom roles; custom role names are unique
//! within their organization, system role names globally. The production
//! deployment backs this with the platform database; [`MemoryRoleStore`] is
//! the in-process implementation.

use crate::{error::Result, role::Role};
use dashmap::DashMap;
use std::sync::Arc;

/// Trait for storing and retrieving role definitions.
pub trait RoleStore: Send + Sync {
    /// Store a role definition.
    fn store_role(&mut self, role: Role) -> Result<()>;

    /// Get a role by scope and name. `organization_id = None` addresses
    /// system roles.
    fn get_role(&self, organization_id: Option<&str>, name: &str) -> Result<Option<Role>>;

    /// Check if a role exists.
    fn role_exists(&self, organization_id: Option<&str>, name: &str) -> Result<bool>;

    /// Delete a role. Returns whether a role was removed.
    fn delete_role(&mut self, organization_id: Option<&str>, name: &str) -> Result<bool>;

    /// List role names within a scope.
    fn list_roles(&self, organization_id: Option<&str>) -> Result<Vec<String>>;

    /// Replace an existing role definition.
    fn update_role(&mut self, role: Role) -> Result<()>;
}

/// In-memory store using DashMap for thread safety.
#[derive(Debug, Default, Clone)]
pub struct MemoryRoleStore {
    roles: Arc<DashMap<String, Role>>,
}

impl MemoryRoleStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            roles: Arc::new(DashMap::new()),
        }
    }

    /// Number of stored roles across all scopes.
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    fn key(organization_id: Option<&str>, name: &str) -> String {
        match organization_id {
            Some(org) => format!("{org}/{name}"),
            None => name.to_string(),
        }
    }
}

impl RoleStore for MemoryRoleStore {
    fn store_role(&mut self, role: Role) -> Result<()> {
        let key = Self::key(role.organization_id(), role.name());
        self.roles.insert(key, role);
        Ok(())
    }

    fn get_role(&self, organization_id: Option<&str>, name: &str) -> Result<Option<Role>> {
        Ok(self
            .roles
            .get(&Self::key(organization_id, name))
            .map(|r| r.clone()))
    }

    fn role_exists(&self, organization_id: Option<&str>, name: &str) -> Result<bool> {
        Ok(self.roles.contains_key(&Self::key(organization_id, name)))
    }

    fn delete_role(&mut self, organization_id: Option<&str>, name: &str) -> Result<bool> {
        Ok(self
            .roles
            .remove(&Self::key(organization_id, name))
            .is_some())
    }

    fn list_roles(&self, organization_id: Option<&str>) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .roles
            .iter()
            .filter(|entry| entry.value().organization_id() == organization_id)
            .map(|entry| entry.value().name().to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    fn update_role(&mut self, role: Role) -> Result<()> {
        let key = Self::key(role.organization_id(), role.name());
        self.roles.insert(key, role);
        Ok(())
    }
}
