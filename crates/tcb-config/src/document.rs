//! Tenant configuration document
//!
//! [`TenantConfig`] is the full persisted document. It is held as an ordered
//! JSON object so that read-only sections survive every round trip with
//! their content and key order intact.

use crate::hash::ContentHash;
use crate::section::{EditableSection, SectionClass, SectionClassifier};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The full persisted configuration document of one tenant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantConfig {
    fields: Map<String, Value>,
}

/// Errors when reading a document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Input is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Input is not valid YAML
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// Top-level value is not an object
    #[error("configuration must be an object, found {0}")]
    NotAnObject(&'static str),
}

impl TenantConfig {
    /// Create an empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing field map
    #[inline]
    #[must_use]
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Build from a JSON value
    ///
    /// # Errors
    /// Returns error if the value is not an object
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(DocumentError::NotAnObject(kind_name(&other))),
        }
    }

    /// Parse from JSON string
    ///
    /// # Errors
    /// Returns error if JSON is invalid or not an object
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Parse from YAML string
    ///
    /// # Errors
    /// Returns error if YAML is invalid or not a mapping
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DocumentError> {
        Self::from_value(serde_yaml::from_str(yaml)?)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails (rare for JSON)
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(&self.fields)?)
    }

    /// Borrow the underlying field map
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consume into the underlying field map
    #[inline]
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    /// Consume into a JSON value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Get a top-level field
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a top-level field, keeping its position if it already exists
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    /// Remove a top-level field
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    /// Whether a top-level field is present
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Tenant identifier, if present and a string
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.fields.get("tenant_id").and_then(Value::as_str)
    }

    /// Document version, if present and a string
    #[inline]
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// Editable section value, if present
    #[inline]
    #[must_use]
    pub fn section(&self, section: EditableSection) -> Option<&Value> {
        self.fields.get(section.key())
    }

    /// Entity map of an id-keyed editable section
    ///
    /// Missing or non-object sections read as empty.
    #[must_use]
    pub fn entities(&self, section: EditableSection) -> Map<String, Value> {
        match self.section(section) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Fingerprint of every read-only field, in document order
    #[must_use]
    pub fn read_only_fingerprint(&self) -> ContentHash {
        let read_only: Map<String, Value> = self
            .fields
            .iter()
            .filter(|(key, _)| SectionClassifier::classify_key(key) == SectionClass::ReadOnly)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        ContentHash::of_value(&Value::Object(read_only))
    }

    /// Approximate serialized size in bytes
    #[must_use]
    pub fn approximate_size(&self) -> usize {
        serde_json::to_vec(&self.fields).map_or(0, |bytes| bytes.len())
    }
}

impl From<Map<String, Value>> for TenantConfig {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_map(fields)
    }
}

impl TryFrom<Value> for TenantConfig {
    type Error = DocumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_preserves_key_order() {
        let doc = TenantConfig::from_json_str(r#"{"zeta": 1, "alpha": {"b": 1, "a": 2}}"#).unwrap();
        let keys: Vec<_> = doc.as_map().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);

        let out = serde_json::to_string(&doc).unwrap();
        assert_eq!(out, r#"{"zeta":1,"alpha":{"b":1,"a":2}}"#);
    }

    #[test]
    fn from_yaml() {
        let doc = TenantConfig::from_yaml_str("tenant_id: t1\nversion: '1.2'\n").unwrap();
        assert_eq!(doc.tenant_id(), Some("t1"));
        assert_eq!(doc.version(), Some("1.2"));
    }

    #[test]
    fn non_object_rejected() {
        let err = TenantConfig::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, DocumentError::NotAnObject("array")));
        assert!(TenantConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn entities_tolerates_missing_and_malformed_sections() {
        let doc = TenantConfig::from_value(json!({"programs": [1, 2]})).unwrap();
        assert!(doc.entities(EditableSection::Programs).is_empty());
        assert!(doc.entities(EditableSection::CtaDefinitions).is_empty());
    }

    #[test]
    fn read_only_fingerprint_ignores_editable_changes() {
        let a = TenantConfig::from_value(json!({
            "branding": {"color": "blue"},
            "programs": {"p1": {}}
        }))
        .unwrap();
        let mut b = a.clone();
        b.insert("programs", json!({}));
        assert_eq!(a.read_only_fingerprint(), b.read_only_fingerprint());

        b.insert("branding", json!({"color": "red"}));
        assert_ne!(a.read_only_fingerprint(), b.read_only_fingerprint());
    }
}
