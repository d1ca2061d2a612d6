//! Configuration merge engine
//!
//! Recombines an edited set of editable sections with the latest base
//! document. Merge is total: it never fails and never inspects the shape of
//! an editable section.
//!
//! # Rules
//! 1. Start from a full copy of `base`; read-only fields are never touched.
//! 2. Each editable section present in the edit replaces the base section
//!    wholesale. Sections absent from the edit are kept from `base`.
//! 3. Metadata present in the edit overwrites, except timestamps and
//!    `tenant_id`.
//! 4. `tenant_id` always comes from `base`.
//! 5. `version` falls back to the base value, then to the engine default.
//! 6. `generated_at` is stamped at merge time.

use crate::document::TenantConfig;
use crate::section::{SectionClass, SectionClassifier, GENERATED_AT_FIELD};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Version used when neither the edit nor the base carries one
pub const DEFAULT_VERSION: &str = "1.0";

/// Merges edited sections into a base configuration
#[derive(Debug, Clone)]
pub struct ConfigMergeEngine {
    default_version: String,
}

impl Default for ConfigMergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigMergeEngine {
    /// Create engine with the stock fallback version
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Override the fallback version
    #[inline]
    #[must_use]
    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = version.into();
        self
    }

    /// Fallback version
    #[inline]
    #[must_use]
    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    /// Merge `edited` into `base`, stamping the current time
    #[must_use]
    pub fn merge(&self, base: &TenantConfig, edited: &TenantConfig) -> TenantConfig {
        self.merge_at(base, edited, Utc::now())
    }

    /// Merge `edited` into `base`, stamping `now` as the generation time
    #[must_use]
    pub fn merge_at(
        &self,
        base: &TenantConfig,
        edited: &TenantConfig,
        now: DateTime<Utc>,
    ) -> TenantConfig {
        let mut merged = base.clone();
        let mut replaced = 0usize;
        let mut ignored = Vec::new();

        for (key, value) in edited.as_map() {
            match SectionClassifier::classify_key(key) {
                SectionClass::Editable(_) => {
                    merged.insert(key.clone(), value.clone());
                    replaced += 1;
                }
                SectionClass::Metadata => {
                    if key == "tenant_id" || SectionClassifier::is_timestamp(key) {
                        continue;
                    }
                    merged.insert(key.clone(), value.clone());
                }
                SectionClass::ReadOnly => ignored.push(key.as_str()),
            }
        }

        if !ignored.is_empty() {
            tracing::warn!(?ignored, "read-only fields in edit ignored by merge");
        }

        match base.get("tenant_id") {
            Some(tenant) => {
                merged.insert("tenant_id", tenant.clone());
            }
            None => {
                merged.remove("tenant_id");
            }
        }

        if !matches!(merged.get("version"), Some(v) if !v.is_null()) {
            let version = base
                .get("version")
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| Value::String(self.default_version.clone()));
            merged.insert("version", version);
        }

        merged.insert(
            GENERATED_AT_FIELD,
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        tracing::debug!(
            tenant = merged.tenant_id().unwrap_or("<none>"),
            sections_replaced = replaced,
            read_only = %merged.read_only_fingerprint().short(),
            "merged configuration"
        );

        merged
    }
}

/// Project a full document onto its metadata and editable fields
///
/// Key order of the source document is preserved.
#[must_use]
pub fn extract_editable_sections(full: &TenantConfig) -> TenantConfig {
    full.as_map()
        .iter()
        .filter(|(key, _)| SectionClassifier::classify_key(key) != SectionClass::ReadOnly)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

/// Whether every read-only field of `base` survives unchanged in `merged`
#[must_use]
pub fn verify_read_only_preserved(base: &TenantConfig, merged: &TenantConfig) -> bool {
    base.read_only_fingerprint() == merged.read_only_fingerprint()
}
