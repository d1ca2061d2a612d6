//! Testing utilities for TCB workspace
//!
//! Shared fixtures and a small builder for tenant documents.

#![allow(missing_docs)]

use serde_json::{json, Map, Value};
use tcb_config::TenantConfig;

pub const TENANT: &str = "acme";

/// Builder for tenant documents; sections appear in insertion order
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    fields: Map<String, Value>,
}

impl ConfigBuilder {
    pub fn new(tenant_id: &str) -> Self {
        let mut builder = Self::default();
        builder.fields.insert("tenant_id".into(), json!(tenant_id));
        builder.fields.insert("version".into(), json!("1.0"));
        builder
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn program(self, id: &str, name: &str) -> Self {
        self.entity("programs", id, json!({"program_id": id, "name": name}))
    }

    pub fn form(self, id: &str, title: &str, program: &str) -> Self {
        self.entity(
            "conversational_forms",
            id,
            json!({"form_id": id, "title": title, "program": program}),
        )
    }

    pub fn cta(self, id: &str, label: &str, form_id: Option<&str>) -> Self {
        let mut cta = json!({"cta_id": id, "label": label});
        if let Some(form_id) = form_id {
            cta["formId"] = json!(form_id);
        }
        self.entity("cta_definitions", id, cta)
    }

    pub fn branch(self, id: &str, primary: &str, secondary: &[&str]) -> Self {
        self.entity(
            "conversation_branches",
            id,
            json!({
                "branch_id": id,
                "available_ctas": {"primary": primary, "secondary": secondary}
            }),
        )
    }

    pub fn showcase(self, items: Value) -> Self {
        self.field("content_showcase", items)
    }

    pub fn build(self) -> TenantConfig {
        TenantConfig::from_map(self.fields)
    }

    fn entity(mut self, section: &str, id: &str, entity: Value) -> Self {
        let slot = self
            .fields
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = slot {
            map.insert(id.to_string(), entity);
        }
        self
    }
}

/// Tenant document with every entity kind, cross references and read-only sections
pub fn sample_config() -> TenantConfig {
    ConfigBuilder::new(TENANT)
        .field("chat_title", json!("Acme Assistant"))
        .field("generated_at", json!("2024-01-01T00:00:00.000Z"))
        .field("branding", json!({"color": "blue", "logo": "acme.svg"}))
        .field("aws", json!({"region": "us-east-1"}))
        .program("p1", "Mentoring")
        .form("f1", "Volunteer signup", "p1")
        .cta("cta1", "Apply", Some("f1"))
        .cta("cta2", "Learn more", None)
        .branch("b1", "cta1", &["cta2"])
        .showcase(json!([{"id": "s1", "title": "Spring drive"}]))
        .build()
}

/// Minimal document: tenant, one program, one read-only section
pub fn minimal_config(tenant_id: &str) -> TenantConfig {
    ConfigBuilder::new(tenant_id)
        .field("branding", json!({"color": "blue"}))
        .program("p1", "Mentoring")
        .build()
}

/// Edit payload replacing `programs`
pub fn programs_edit(ids: &[&str]) -> TenantConfig {
    let programs: Map<String, Value> = ids
        .iter()
        .map(|id| ((*id).to_string(), json!({"program_id": id, "name": id})))
        .collect();
    TenantConfig::from_map(Map::from_iter([("programs".to_string(), Value::Object(programs))]))
}
