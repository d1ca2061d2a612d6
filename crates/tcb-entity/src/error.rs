//! Error types for entity CRUD

use tcb_deps::{DependencyReport, EntityKind};

/// CRUD failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrudError {
    /// Create with an id already in the store
    #[error("{kind} '{id}' already exists")]
    Conflict {
        /// Entity kind
        kind: EntityKind,
        /// Offending id
        id: String,
    },

    /// Update or delete of an absent id
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Entity kind
        kind: EntityKind,
        /// Missing id
        id: String,
    },

    /// Entity carries no usable id
    #[error("{kind} has no id")]
    MissingId {
        /// Entity kind
        kind: EntityKind,
    },

    /// Delete of a referenced entity without confirmation
    #[error("confirmation required: {}", .report.summary)]
    ConfirmationRequired {
        /// Who references the entity
        report: Box<DependencyReport>,
    },

    /// Confirm without a staged deletion
    #[error("no {kind} deletion awaiting confirmation")]
    NoPendingDeletion {
        /// Entity kind
        kind: EntityKind,
    },
}

impl CrudError {
    /// Whether the failure is a not-found condition
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure is an id conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
