//! Error types for TCB Core

use tcb_config::{DocumentError, ValidationError};
use tcb_entity::{CrudError, MetadataError};

/// Persistence backend failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document stored for the tenant
    #[error("no configuration for tenant '{tenant}'")]
    NotFound {
        /// Requested tenant
        tenant: String,
    },

    /// Tenant id is not usable as a storage name
    #[error("invalid tenant id: '{0}'")]
    InvalidTenant(String),

    /// Document names a different tenant than the one it is saved under
    #[error("document belongs to tenant '{found}', not '{expected}'")]
    TenantMismatch {
        /// Tenant the save targets
        expected: String,
        /// Tenant named in the document
        found: String,
    },

    /// Filesystem failure
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored or submitted document is malformed
    #[error("malformed configuration: {0}")]
    Parse(#[from] DocumentError),
}

impl StoreError {
    /// Whether the tenant simply has no document
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Editor session failure
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Persistence backend failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Entity operation refused
    #[error(transparent)]
    Crud(#[from] CrudError),

    /// Edit payload touches fields it may not
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Metadata field is not client-editable
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl SessionError {
    /// The CRUD failure, if this is one
    #[must_use]
    pub fn as_crud(&self) -> Option<&CrudError> {
        match self {
            Self::Crud(e) => Some(e),
            _ => None,
        }
    }
}
