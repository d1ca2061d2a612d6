//! CRUD notification events
//!
//! Controllers report every outcome as an event so a presentation layer can
//! turn them into toasts without catching anything.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tcb_deps::EntityKind;

/// Successful operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudAction {
    /// Entity inserted
    Created,
    /// Entity replaced
    Updated,
    /// Entity removed
    Deleted,
}

/// Operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudOperation {
    /// `create`
    Create,
    /// `update`
    Update,
    /// `delete` / `confirm_delete`
    Delete,
}

/// Event emitted by a controller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrudEvent {
    /// Operation succeeded
    Notification {
        /// What happened
        action: CrudAction,
        /// Kind of the entity
        entity_kind: EntityKind,
        /// Display name of the entity
        entity_name: String,
        /// When it happened
        at: DateTime<Utc>,
    },
    /// Operation failed
    Error {
        /// What was attempted
        operation: CrudOperation,
        /// Kind of the entity
        entity_kind: EntityKind,
        /// Failure reason, suitable for display
        reason: String,
        /// When it happened
        at: DateTime<Utc>,
    },
}

impl CrudEvent {
    /// Whether this is an error event
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Receiver of controller events
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Deliver one event
    fn emit(&self, event: CrudEvent);
}

/// In-memory, append-only event log
#[derive(Debug, Default)]
pub struct EventLog {
    inner: Mutex<Vec<CrudEvent>>,
}

impl EventLog {
    /// Create empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<CrudEvent> {
        self.inner.lock().clone()
    }

    /// Remove and return all events
    pub fn drain(&self) -> Vec<CrudEvent> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Most recent event
    pub fn last(&self) -> Option<CrudEvent> {
        self.inner.lock().last().cloned()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: CrudEvent) {
        self.inner.lock().push(event);
    }
}
