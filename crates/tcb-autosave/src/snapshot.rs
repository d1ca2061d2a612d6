//! Autosave snapshot document
//!
//! Stored as JSON under `<prefix>-<tenantId>`:
//! `{tenantId, timestamp, programs, forms, ctas, branches, contentShowcase}`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tcb_deps::EntityKind;
use tcb_entity::{EditorState, EntityStore};

/// Full copy of the editable entity stores at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSaveSnapshot {
    /// Tenant the snapshot belongs to
    pub tenant_id: String,
    /// Capture time, Unix epoch milliseconds
    pub timestamp: i64,
    /// Program store
    #[serde(default)]
    pub programs: EntityStore,
    /// Form store
    #[serde(default)]
    pub forms: EntityStore,
    /// CTA store
    #[serde(default)]
    pub ctas: EntityStore,
    /// Branch store
    #[serde(default)]
    pub branches: EntityStore,
    /// Content showcase sequence
    #[serde(default)]
    pub content_showcase: Vec<Value>,
}

impl AutoSaveSnapshot {
    /// Capture `state` now
    #[must_use]
    pub fn capture(tenant_id: &str, state: &EditorState) -> Self {
        Self::capture_at(tenant_id, state, Utc::now().timestamp_millis())
    }

    /// Capture `state` with an explicit timestamp
    #[must_use]
    pub fn capture_at(tenant_id: &str, state: &EditorState, timestamp: i64) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            timestamp,
            programs: state.entities(EntityKind::Program).clone(),
            forms: state.entities(EntityKind::Form).clone(),
            ctas: state.entities(EntityKind::Cta).clone(),
            branches: state.entities(EntityKind::Branch).clone(),
            content_showcase: state.content_showcase().to_vec(),
        }
    }

    /// Rebuild editor state, taking metadata from `seed`
    #[must_use]
    pub fn restore(self, seed: &EditorState) -> EditorState {
        EditorState::from_parts(
            seed,
            self.programs,
            self.forms,
            self.ctas,
            self.branches,
            self.content_showcase,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tcb_config::TenantConfig;

    fn state() -> EditorState {
        let config = TenantConfig::from_value(json!({
            "tenant_id": "acme",
            "chat_title": "Hi",
            "programs": {"p1": {"program_id": "p1", "name": "One"}},
            "content_showcase": [{"id": "s1"}]
        }))
        .unwrap();
        EditorState::from_config(&config)
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let snapshot = AutoSaveSnapshot::capture_at("acme", &state(), 1_700_000_000_000);
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["tenantId"], json!("acme"));
        assert_eq!(value["timestamp"], json!(1_700_000_000_000_i64));
        assert_eq!(value["contentShowcase"], json!([{"id": "s1"}]));
        assert_eq!(value["programs"]["p1"]["name"], json!("One"));
        assert!(value.get("content_showcase").is_none());
    }

    #[test]
    fn restore_keeps_seed_metadata() {
        let seed = state();
        let mut snapshot = AutoSaveSnapshot::capture("acme", &seed);
        snapshot.programs.insert("p2".into(), json!({"program_id": "p2"}));

        let restored = snapshot.restore(&seed);
        assert_eq!(restored.entities(EntityKind::Program).len(), 2);
        assert_eq!(restored.metadata(), seed.metadata());
    }

    #[test]
    fn missing_stores_default_to_empty() {
        let snapshot: AutoSaveSnapshot =
            serde_json::from_str(r#"{"tenantId":"acme","timestamp":5}"#).unwrap();
        assert!(snapshot.programs.is_empty());
        assert!(snapshot.content_showcase.is_empty());
    }
}
