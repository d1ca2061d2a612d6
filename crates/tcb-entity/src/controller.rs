//! Generic CRUD controller
//!
//! One [`EntityCrudController`] per entity kind. The kind supplies the id
//! extractor and the store accessor; the shared [`DependencyResolver`]
//! supplies the reference declarations that gate deletion.
//!
//! # Semantics
//! - `create` never overwrites: an existing id is a conflict.
//! - `update` requires the id and replaces the entity wholesale.
//! - `delete` of a referenced entity needs explicit confirmation and never
//!   cascades: dangling references are left for downstream validation.
//!
//! Every outcome is also emitted to the [`EventSink`].

use crate::error::CrudError;
use crate::events::{CrudAction, CrudEvent, CrudOperation, EventSink};
use crate::state::EditorState;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tcb_deps::{display_name, DependencyReport, DependencyResolver, EntityKind};

/// Result of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing referenced the entity; it is gone
    Deleted(String),
    /// The entity is referenced; deletion is staged until confirmed
    NeedsConfirmation(DependencyReport),
}

/// Deletion staged behind a confirmation prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    /// Id to delete
    pub id: String,
    /// Who references it
    pub report: DependencyReport,
}

/// Transient editing state surfaced by a presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerUiState {
    /// A create form is open
    pub creating: bool,
    /// Id of the entity open for editing
    pub editing: Option<String>,
    /// Deletion awaiting confirmation
    pub pending_deletion: Option<PendingDeletion>,
}

/// CRUD state machine over one kind's entity store
#[derive(Debug, Clone)]
pub struct EntityCrudController {
    kind: EntityKind,
    resolver: Arc<DependencyResolver>,
    events: Arc<dyn EventSink>,
    ui: ControllerUiState,
}

impl EntityCrudController {
    /// Create controller for `kind`
    #[must_use]
    pub fn new(
        kind: EntityKind,
        resolver: Arc<DependencyResolver>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            kind,
            resolver,
            events,
            ui: ControllerUiState::default(),
        }
    }

    /// Entity kind handled
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Transient editing state
    #[inline]
    #[must_use]
    pub fn ui_state(&self) -> &ControllerUiState {
        &self.ui
    }

    /// Open the create form
    pub fn begin_create(&mut self) {
        self.ui.creating = true;
        self.ui.editing = None;
    }

    /// Open an existing entity for editing
    ///
    /// # Errors
    /// Returns [`CrudError::NotFound`] if `id` is not in the store.
    pub fn begin_edit(&mut self, state: &EditorState, id: &str) -> Result<(), CrudError> {
        if !state.entities(self.kind).contains_key(id) {
            return Err(self.not_found(id));
        }
        self.ui.creating = false;
        self.ui.editing = Some(id.to_string());
        Ok(())
    }

    /// Close any open create/edit form
    pub fn close_editor(&mut self) {
        self.ui.creating = false;
        self.ui.editing = None;
    }

    /// Insert a new entity under its own id
    ///
    /// # Errors
    /// - [`CrudError::MissingId`] if the entity has no id
    /// - [`CrudError::Conflict`] if the id already exists; the store is unchanged
    pub fn create(&mut self, state: &mut EditorState, entity: Value) -> Result<String, CrudError> {
        let result = self.try_create(state, entity);
        self.report(CrudOperation::Create, &result);
        result.map(|(id, _)| id)
    }

    fn try_create(
        &mut self,
        state: &mut EditorState,
        entity: Value,
    ) -> Result<(String, String), CrudError> {
        let id = self
            .kind
            .entity_id(&entity)
            .map(str::to_string)
            .ok_or(CrudError::MissingId { kind: self.kind })?;

        let store = state.store_mut(self.kind);
        if store.contains_key(&id) {
            return Err(CrudError::Conflict {
                kind: self.kind,
                id,
            });
        }

        let name = display_name(&entity, &id).to_string();
        store.insert(id.clone(), entity);
        self.ui.creating = false;
        tracing::debug!(kind = %self.kind, %id, "entity created");
        Ok((id, name))
    }

    /// Replace an existing entity wholesale
    ///
    /// # Errors
    /// Returns [`CrudError::NotFound`] if `id` is absent; the store is unchanged.
    pub fn update(
        &mut self,
        state: &mut EditorState,
        id: &str,
        entity: Value,
    ) -> Result<(), CrudError> {
        let result = match state.store_mut(self.kind).get_mut(id) {
            Some(slot) => {
                let name = display_name(&entity, id).to_string();
                *slot = entity;
                if self.ui.editing.as_deref() == Some(id) {
                    self.ui.editing = None;
                }
                tracing::debug!(kind = %self.kind, id, "entity updated");
                Ok((id.to_string(), name))
            }
            None => Err(self.not_found(id)),
        };
        self.report(CrudOperation::Update, &result);
        result.map(|_| ())
    }

    /// Delete an entity, honoring the confirmation rule
    ///
    /// With `confirmed = false`, deleting an entity that other entities
    /// reference fails with [`CrudError::ConfirmationRequired`].
    ///
    /// # Errors
    /// - [`CrudError::NotFound`] if `id` is absent
    /// - [`CrudError::ConfirmationRequired`] as above; the store is unchanged
    pub fn delete(
        &mut self,
        state: &mut EditorState,
        id: &str,
        confirmed: bool,
    ) -> Result<(), CrudError> {
        let result = self.try_delete(state, id, confirmed);
        self.report(CrudOperation::Delete, &result);
        result.map(|_| ())
    }

    fn try_delete(
        &mut self,
        state: &mut EditorState,
        id: &str,
        confirmed: bool,
    ) -> Result<(String, String), CrudError> {
        if !state.entities(self.kind).contains_key(id) {
            return Err(self.not_found(id));
        }
        if !confirmed {
            if let Some(report) = self.resolver.get_dependencies(&*state, self.kind.section(), id) {
                return Err(CrudError::ConfirmationRequired {
                    report: Box::new(report),
                });
            }
        }
        self.remove(state, id)
    }

    /// Start a delete: removes immediately when unreferenced, otherwise
    /// stages the deletion and returns the dependency report
    ///
    /// # Errors
    /// Returns [`CrudError::NotFound`] if `id` is absent.
    pub fn request_delete(
        &mut self,
        state: &mut EditorState,
        id: &str,
    ) -> Result<DeleteOutcome, CrudError> {
        match self.try_delete(state, id, false) {
            Ok((id, name)) => {
                self.report(CrudOperation::Delete, &Ok((id.clone(), name)));
                Ok(DeleteOutcome::Deleted(id))
            }
            Err(CrudError::ConfirmationRequired { report }) => {
                tracing::debug!(
                    kind = %self.kind,
                    id,
                    summary = %report.summary,
                    "deletion staged"
                );
                self.ui.pending_deletion = Some(PendingDeletion {
                    id: id.to_string(),
                    report: (*report).clone(),
                });
                Ok(DeleteOutcome::NeedsConfirmation(*report))
            }
            Err(err) => {
                self.report::<()>(CrudOperation::Delete, &Err(err.clone()));
                Err(err)
            }
        }
    }

    /// Carry out the staged deletion
    ///
    /// # Errors
    /// - [`CrudError::NoPendingDeletion`] if nothing is staged
    /// - [`CrudError::NotFound`] if the staged id vanished meanwhile
    pub fn confirm_delete(&mut self, state: &mut EditorState) -> Result<String, CrudError> {
        let result = match self.ui.pending_deletion.take() {
            Some(pending) => self.remove(state, &pending.id),
            None => Err(CrudError::NoPendingDeletion { kind: self.kind }),
        };
        self.report(CrudOperation::Delete, &result);
        result.map(|(id, _)| id)
    }

    /// Drop the staged deletion
    pub fn cancel_delete(&mut self) -> Option<PendingDeletion> {
        self.ui.pending_deletion.take()
    }

    fn remove(&mut self, state: &mut EditorState, id: &str) -> Result<(String, String), CrudError> {
        let Some(entity) = state.store_mut(self.kind).shift_remove(id) else {
            return Err(self.not_found(id));
        };
        if self.ui.editing.as_deref() == Some(id) {
            self.ui.editing = None;
        }
        tracing::debug!(kind = %self.kind, id, "entity deleted");
        Ok((id.to_string(), display_name(&entity, id).to_string()))
    }

    fn not_found(&self, id: &str) -> CrudError {
        CrudError::NotFound {
            kind: self.kind,
            id: id.to_string(),
        }
    }

    fn report<T>(&self, operation: CrudOperation, result: &Result<T, CrudError>)
    where
        T: NamedOutcome,
    {
        let event = match result {
            Ok(outcome) => CrudEvent::Notification {
                action: match operation {
                    CrudOperation::Create => CrudAction::Created,
                    CrudOperation::Update => CrudAction::Updated,
                    CrudOperation::Delete => CrudAction::Deleted,
                },
                entity_kind: self.kind,
                entity_name: outcome.entity_name().to_string(),
                at: Utc::now(),
            },
            Err(err) => {
                tracing::debug!(kind = %self.kind, ?operation, %err, "operation failed");
                CrudEvent::Error {
                    operation,
                    entity_kind: self.kind,
                    reason: err.to_string(),
                    at: Utc::now(),
                }
            }
        };
        self.events.emit(event);
    }
}

/// Successful outcome that names its entity
trait NamedOutcome {
    fn entity_name(&self) -> &str;
}

impl NamedOutcome for (String, String) {
    fn entity_name(&self) -> &str {
        &self.1
    }
}

impl NamedOutcome for () {
    fn entity_name(&self) -> &str {
        ""
    }
}
