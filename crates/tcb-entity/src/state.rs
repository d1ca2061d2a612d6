//! In-memory editor state
//!
//! One entity store per entity kind, the content showcase sequence and the
//! client-editable metadata. Seeded from a base document, turned back into
//! an edit payload for merging.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tcb_config::{EditableSection, SectionClassifier, TenantConfig};
use tcb_deps::{EntityKind, SectionSource};

/// Entity map of one section (id → entity), insertion ordered
pub type EntityStore = Map<String, Value>;

/// Editable state of one tenant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    metadata: Map<String, Value>,
    programs: EntityStore,
    forms: EntityStore,
    ctas: EntityStore,
    branches: EntityStore,
    content_showcase: Vec<Value>,
    present: BTreeSet<EditableSection>,
}

/// Metadata key rejected by [`EditorState::set_metadata`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("metadata field '{0}' is not client-editable")]
pub struct MetadataError(pub String);

impl EditorState {
    /// Empty state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a document's editable sections and metadata
    ///
    /// Non-object sections seed empty stores; a non-array showcase seeds
    /// an empty sequence.
    #[must_use]
    pub fn from_config(config: &TenantConfig) -> Self {
        let mut state = Self::new();
        for (key, value) in config.as_map() {
            if is_client_metadata(key) {
                state.metadata.insert(key.clone(), value.clone());
            }
        }
        for section in EditableSection::ALL {
            if config.contains_key(section.key()) {
                state.present.insert(section);
            }
        }
        for kind in EntityKind::ALL {
            *state.store_mut(kind) = config.entities(kind.section());
        }
        state.content_showcase = config
            .section(EditableSection::ContentShowcase)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        state
    }

    /// Build from restored stores, keeping metadata from `seed`
    #[must_use]
    pub fn from_parts(
        seed: &Self,
        programs: EntityStore,
        forms: EntityStore,
        ctas: EntityStore,
        branches: EntityStore,
        content_showcase: Vec<Value>,
    ) -> Self {
        Self {
            metadata: seed.metadata.clone(),
            programs,
            forms,
            ctas,
            branches,
            content_showcase,
            present: seed.present.clone(),
        }
    }

    /// Entities of one kind
    #[inline]
    #[must_use]
    pub fn entities(&self, kind: EntityKind) -> &EntityStore {
        match kind {
            EntityKind::Program => &self.programs,
            EntityKind::Form => &self.forms,
            EntityKind::Cta => &self.ctas,
            EntityKind::Branch => &self.branches,
        }
    }

    pub(crate) fn store_mut(&mut self, kind: EntityKind) -> &mut EntityStore {
        match kind {
            EntityKind::Program => &mut self.programs,
            EntityKind::Form => &mut self.forms,
            EntityKind::Cta => &mut self.ctas,
            EntityKind::Branch => &mut self.branches,
        }
    }

    /// Content showcase items, in order
    #[inline]
    #[must_use]
    pub fn content_showcase(&self) -> &[Value] {
        &self.content_showcase
    }

    /// Replace the content showcase sequence
    pub fn set_content_showcase(&mut self, items: Vec<Value>) {
        self.content_showcase = items;
    }

    /// Client-editable metadata
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Set a client-editable metadata field
    ///
    /// # Errors
    /// Returns [`MetadataError`] for non-metadata keys, `tenant_id` and
    /// timestamps.
    pub fn set_metadata(&mut self, key: &str, value: Value) -> Result<(), MetadataError> {
        if !is_client_metadata(key) {
            return Err(MetadataError(key.to_string()));
        }
        self.metadata.insert(key.to_string(), value);
        Ok(())
    }

    /// Edit payload: metadata plus every section that was seeded or is non-empty
    #[must_use]
    pub fn to_edited_sections(&self) -> TenantConfig {
        let mut out = TenantConfig::from_map(self.metadata.clone());
        for section in EditableSection::ALL {
            let value = match EntityKind::for_section(section) {
                Some(kind) => {
                    let store = self.entities(kind);
                    if store.is_empty() && !self.present.contains(&section) {
                        continue;
                    }
                    Value::Object(store.clone())
                }
                None => {
                    if self.content_showcase.is_empty() && !self.present.contains(&section) {
                        continue;
                    }
                    Value::Array(self.content_showcase.clone())
                }
            };
            out.insert(section.key(), value);
        }
        out
    }

    /// Total number of entities across all stores
    #[must_use]
    pub fn entity_count(&self) -> usize {
        EntityKind::ALL.iter().map(|k| self.entities(*k).len()).sum()
    }
}

impl SectionSource for EditorState {
    fn section_entities(&self, section: EditableSection) -> Option<&Map<String, Value>> {
        EntityKind::for_section(section).map(|kind| self.entities(kind))
    }
}

fn is_client_metadata(key: &str) -> bool {
    SectionClassifier::is_metadata(key)
        && key != "tenant_id"
        && !SectionClassifier::is_timestamp(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn base() -> TenantConfig {
        TenantConfig::from_value(json!({
            "tenant_id": "t1",
            "version": "1.0",
            "chat_title": "Hello",
            "generated_at": "2024-01-01T00:00:00Z",
            "programs": {"p1": {"name": "One"}},
            "cta_definitions": {},
            "branding": {"color": "blue"}
        }))
        .unwrap()
    }

    #[test]
    fn seeds_stores_and_client_metadata() {
        let state = EditorState::from_config(&base());
        assert_eq!(state.entities(EntityKind::Program).len(), 1);
        assert!(state.entities(EntityKind::Branch).is_empty());
        assert_eq!(state.metadata().get("chat_title"), Some(&json!("Hello")));
        assert!(!state.metadata().contains_key("tenant_id"));
        assert!(!state.metadata().contains_key("generated_at"));
    }

    #[test]
    fn edited_sections_only_include_seeded_or_non_empty() {
        let state = EditorState::from_config(&base());
        let edited = state.to_edited_sections();

        assert!(edited.contains_key("programs"));
        assert!(edited.contains_key("cta_definitions"));
        assert!(!edited.contains_key("conversation_branches"));
        assert!(!edited.contains_key("content_showcase"));
        assert!(!edited.contains_key("branding"));
    }

    #[test]
    fn showcase_included_once_populated() {
        let mut state = EditorState::from_config(&base());
        state.set_content_showcase(vec![json!({"id": "s1"})]);
        let edited = state.to_edited_sections();
        assert_eq!(edited.get("content_showcase"), Some(&json!([{"id": "s1"}])));
    }

    #[test]
    fn tenant_and_timestamps_are_not_settable() {
        let mut state = EditorState::new();
        assert!(state.set_metadata("company_name", json!("Acme")).is_ok());
        assert!(state.set_metadata("tenant_id", json!("x")).is_err());
        assert!(state.set_metadata("generated_at", json!("x")).is_err());
        assert!(state.set_metadata("branding", json!({})).is_err());
    }

    #[test]
    fn section_source_exposes_entity_sections_only() {
        let state = EditorState::from_config(&base());
        assert!(state.section_entities(EditableSection::Programs).is_some());
        assert!(state.section_entities(EditableSection::ContentShowcase).is_none());
    }
}
