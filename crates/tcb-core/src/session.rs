//! Editing session for one tenant
//!
//! Owns the base document, the editor state and everything that mutates or
//! mirrors it. All entity writes go through the per-kind controllers; each
//! successful write marks the session dirty and feeds autosave.

use crate::config::EditorConfig;
use crate::error::SessionError;
use crate::store::{ConfigStore, SaveOptions, SaveResult, LAST_UPDATED_FIELD};
use chrono::SecondsFormat;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tcb_autosave::{AutoSaveManager, SnapshotStorage};
use tcb_config::{
    ConfigDiff, ConfigDiffer, ConfigMergeEngine, EditableSection, SectionClassifier, TenantConfig,
};
use tcb_deps::{DependencyReport, DependencyResolver, EntityKind};
use tcb_entity::{
    CrudEvent, DeleteOutcome, EditorState, EntityCrudController, EntityStore, EventLog,
    EventSink, PendingDeletion,
};

#[derive(Debug)]
struct Controllers {
    programs: EntityCrudController,
    forms: EntityCrudController,
    ctas: EntityCrudController,
    branches: EntityCrudController,
}

impl Controllers {
    fn new(resolver: &Arc<DependencyResolver>, events: &Arc<dyn EventSink>) -> Self {
        let make = |kind| EntityCrudController::new(kind, Arc::clone(resolver), Arc::clone(events));
        Self {
            programs: make(EntityKind::Program),
            forms: make(EntityKind::Form),
            ctas: make(EntityKind::Cta),
            branches: make(EntityKind::Branch),
        }
    }

    fn get(&self, kind: EntityKind) -> &EntityCrudController {
        match kind {
            EntityKind::Program => &self.programs,
            EntityKind::Form => &self.forms,
            EntityKind::Cta => &self.ctas,
            EntityKind::Branch => &self.branches,
        }
    }

    fn get_mut(&mut self, kind: EntityKind) -> &mut EntityCrudController {
        match kind {
            EntityKind::Program => &mut self.programs,
            EntityKind::Form => &mut self.forms,
            EntityKind::Cta => &mut self.ctas,
            EntityKind::Branch => &mut self.branches,
        }
    }
}

/// One tenant's editing session
pub struct EditorSession {
    tenant_id: String,
    config: EditorConfig,
    store: Arc<dyn ConfigStore>,
    engine: ConfigMergeEngine,
    differ: ConfigDiffer,
    classifier: SectionClassifier,
    resolver: Arc<DependencyResolver>,
    base: TenantConfig,
    state: EditorState,
    dirty: bool,
    recovered: bool,
    controllers: Controllers,
    autosave: AutoSaveManager,
    events: Arc<EventLog>,
}

impl EditorSession {
    /// Load the tenant's document, seed the editor and attempt recovery
    ///
    /// A usable autosave snapshot replaces the seeded entity stores and
    /// leaves the session dirty.
    ///
    /// # Errors
    /// Returns [`SessionError::Store`] if the document cannot be loaded
    pub async fn open(
        tenant_id: &str,
        store: Arc<dyn ConfigStore>,
        snapshots: Arc<dyn SnapshotStorage>,
        config: EditorConfig,
    ) -> Result<Self, SessionError> {
        let base = store.load_config(tenant_id, false).await?;
        let seeded = EditorState::from_config(&base);
        let autosave = AutoSaveManager::new(config.autosave.clone(), snapshots, tenant_id);

        let (state, recovered) = match autosave.load_recovery(&seeded) {
            Some(state) => (state, true),
            None => (seeded, false),
        };

        let events = Arc::new(EventLog::new());
        let sink: Arc<dyn EventSink> = events.clone();
        let resolver = Arc::new(DependencyResolver::default());

        tracing::info!(
            tenant_id,
            entities = state.entity_count(),
            recovered,
            "editor session opened"
        );

        Ok(Self {
            tenant_id: tenant_id.to_string(),
            engine: ConfigMergeEngine::new().with_default_version(config.default_version.clone()),
            config,
            store,
            differ: ConfigDiffer::new(),
            classifier: SectionClassifier::new(),
            controllers: Controllers::new(&resolver, &sink),
            resolver,
            base,
            state,
            dirty: recovered,
            recovered,
            autosave,
            events,
        })
    }

    /// Tenant being edited
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Settings in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Document the edits apply to
    #[inline]
    #[must_use]
    pub fn base(&self) -> &TenantConfig {
        &self.base
    }

    /// Current editor state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Entities of one kind
    #[inline]
    #[must_use]
    pub fn entities(&self, kind: EntityKind) -> &EntityStore {
        self.state.entities(kind)
    }

    /// Controller of one kind, for its UI state
    #[inline]
    #[must_use]
    pub fn controller(&self, kind: EntityKind) -> &EntityCrudController {
        self.controllers.get(kind)
    }

    /// Add an entity
    ///
    /// # Errors
    /// Returns the controller's [`CrudError`](tcb_entity::CrudError)
    pub fn create(&mut self, kind: EntityKind, entity: Value) -> Result<String, SessionError> {
        let id = self.controllers.get_mut(kind).create(&mut self.state, entity)?;
        self.touch();
        Ok(id)
    }

    /// Replace an entity
    ///
    /// # Errors
    /// Returns the controller's [`CrudError`](tcb_entity::CrudError)
    pub fn update(
        &mut self,
        kind: EntityKind,
        id: &str,
        entity: Value,
    ) -> Result<(), SessionError> {
        self.controllers.get_mut(kind).update(&mut self.state, id, entity)?;
        self.touch();
        Ok(())
    }

    /// Delete an entity, staging it when referenced
    ///
    /// # Errors
    /// Returns the controller's [`CrudError`](tcb_entity::CrudError)
    pub fn request_delete(
        &mut self,
        kind: EntityKind,
        id: &str,
    ) -> Result<DeleteOutcome, SessionError> {
        let outcome = self.controllers.get_mut(kind).request_delete(&mut self.state, id)?;
        if matches!(outcome, DeleteOutcome::Deleted(_)) {
            self.touch();
        }
        Ok(outcome)
    }

    /// Carry out a staged deletion
    ///
    /// # Errors
    /// Returns the controller's [`CrudError`](tcb_entity::CrudError)
    pub fn confirm_delete(&mut self, kind: EntityKind) -> Result<String, SessionError> {
        let id = self.controllers.get_mut(kind).confirm_delete(&mut self.state)?;
        self.touch();
        Ok(id)
    }

    /// Drop a staged deletion
    pub fn cancel_delete(&mut self, kind: EntityKind) -> Option<PendingDeletion> {
        self.controllers.get_mut(kind).cancel_delete()
    }

    /// Replace the content showcase sequence
    pub fn set_content_showcase(&mut self, items: Vec<Value>) {
        self.state.set_content_showcase(items);
        self.touch();
    }

    /// Set a client-editable metadata field
    ///
    /// # Errors
    /// Returns [`SessionError::Metadata`] for fields the client may not set
    pub fn set_metadata(&mut self, key: &str, value: Value) -> Result<(), SessionError> {
        self.state.set_metadata(key, value)?;
        self.touch();
        Ok(())
    }

    /// Who references an entity in the current state
    #[must_use]
    pub fn get_dependencies(&self, section: EditableSection, id: &str) -> Option<DependencyReport> {
        self.resolver.get_dependencies(&self.state, section, id)
    }

    /// Edits merged onto the base document
    #[must_use]
    pub fn merged_config(&self) -> TenantConfig {
        self.engine.merge(&self.base, &self.state.to_edited_sections())
    }

    /// Differences between the base document and the merged edits
    #[must_use]
    pub fn config_diff(&self) -> ConfigDiff {
        self.differ.diff(&self.base, &self.merged_config())
    }

    /// Whether edits exist that are not deployed
    #[inline]
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Whether this session started from an autosave snapshot
    #[inline]
    #[must_use]
    pub fn recovered_from_autosave(&self) -> bool {
        self.recovered
    }

    /// Merge the edits onto the latest stored document and save it
    ///
    /// On success the saved document becomes the new base, the session is
    /// clean and the autosave snapshot is gone. On failure nothing changes.
    ///
    /// # Errors
    /// - [`SessionError::Validation`] if the edit payload carries fields
    ///   the client may not write
    /// - [`SessionError::Store`] if loading or saving fails
    pub async fn deploy(&mut self) -> Result<SaveResult, SessionError> {
        let edited = self.state.to_edited_sections();
        self.classifier.validate_edit_payload(edited.as_map())?;

        let latest = self.store.load_config(&self.tenant_id, false).await?;
        let mut merged = self.engine.merge(&latest, &edited);
        let options = SaveOptions::default().with_backup(self.config.create_backup_on_deploy);
        let result = self.store.save_config(&self.tenant_id, &merged, options).await?;

        merged.insert(
            LAST_UPDATED_FIELD,
            Value::String(result.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        self.base = merged;
        self.dirty = false;
        self.recovered = false;
        self.autosave.set_dirty(false);

        tracing::info!(
            tenant_id = %self.tenant_id,
            timestamp = %result.timestamp,
            "configuration deployed"
        );
        Ok(result)
    }

    /// Synchronous last-chance snapshot before the session goes away
    ///
    /// Returns whether a snapshot was written.
    pub fn flush_on_exit(&self) -> bool {
        self.autosave.flush(&self.state)
    }

    /// Events emitted by the controllers so far
    #[must_use]
    pub fn events(&self) -> Vec<CrudEvent> {
        self.events.events()
    }

    /// Shared event log
    #[inline]
    #[must_use]
    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Autosave manager of this session
    #[inline]
    #[must_use]
    pub fn autosave(&self) -> &AutoSaveManager {
        &self.autosave
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.autosave.set_dirty(true);
        self.autosave.notify_change(&self.state);
    }
}

impl fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorSession")
            .field("tenant_id", &self.tenant_id)
            .field("dirty", &self.dirty)
            .field("recovered", &self.recovered)
            .field("entities", &self.state.entity_count())
            .finish_non_exhaustive()
    }
}
