//! Error types for the tenant authorization system.

use thiserror::Error;

/// The main error type for tenant authorization operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The principal's role requires a tenant assignment that is absent.
    /// The request is rejected before reaching business logic, never defaulted.
    #[error("Missing tenant assignment: {0}")]
    MissingTenantAssignment(String),

    /// A filtered lookup returned nothing. Used uniformly whether the record
    /// does not exist or exists outside the caller's tenant boundary, so
    /// existence never leaks across tenants.
    #[error("Not found")]
    NotFound,

    /// Post-filter validation caught a record outside the tenant boundary.
    /// This firing indicates a logic defect elsewhere; the operation fails closed.
    #[error("Security violation: {0} out-of-tenant record(s) caught by post-filter validation")]
    SecurityViolation(usize),

    /// Role with the given name already exists.
    #[error("Role '{0}' already exists")]
    RoleAlreadyExists(String),

    /// Role with the given name was not found.
    #[error("Role '{0}' not found")]
    RoleNotFound(String),

    /// Permission is not present in the catalog.
    #[error("Unknown permission '{0}'")]
    UnknownPermission(String),

    /// Invalid permission format.
    #[error("Invalid permission format: {0}")]
    InvalidPermission(String),

    /// A field failed validation.
    #[error("Validation failed for '{field}': {reason}")]
    ValidationError {
        field: String,
        reason: String,
        invalid_value: Option<String>,
    },

    /// Storage operation failed.
    #[error("Storage operation failed: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type alias for tenant authorization operations.
pub type Result<T> = std::result::Result<T, Error>;
