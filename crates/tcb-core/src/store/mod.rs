//! Persistence backend interface
//!
//! Sole I/O boundary of the editor: a save either applies the whole
//! document or fails, never partially. Retries and timeouts belong to
//! implementations, not callers.

mod fs;
mod memory;

pub use fs::FsConfigStore;
pub use memory::MemoryConfigStore;

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tcb_config::{extract_editable_sections, ConfigMergeEngine, ContentHash, TenantConfig};

static TENANT_ID: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").ok());

/// Field stamped by the store on every save
pub const LAST_UPDATED_FIELD: &str = "last_updated";

/// How a document is saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    /// Merge the submitted document onto the stored one
    pub merge: bool,
    /// Keep a copy of the document being replaced
    pub create_backup: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            merge: false,
            create_backup: true,
        }
    }
}

impl SaveOptions {
    /// With server-side merge on or off
    #[inline]
    #[must_use]
    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    /// With backups on or off
    #[inline]
    #[must_use]
    pub fn with_backup(mut self, create_backup: bool) -> Self {
        self.create_backup = create_backup;
        self
    }
}

/// Acknowledgement of a save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    /// Always true for a returned result; failures are errors
    pub success: bool,
    /// Time stamped into `last_updated`
    pub timestamp: DateTime<Utc>,
}

/// One stored backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Backup id, sortable by creation time
    pub id: String,
    /// When the backup was taken
    pub created_at: DateTime<Utc>,
    /// Size of the backed-up document
    pub size_bytes: u64,
}

/// Summary of a tenant's stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Tenant id
    pub tenant_id: String,
    /// Document version, if any
    pub version: Option<String>,
    /// Last save time as stored, if any
    pub last_updated: Option<String>,
    /// Serialized document size
    pub size_bytes: u64,
    /// Number of backups kept
    pub backup_count: usize,
    /// Fingerprint of the read-only sections
    pub read_only_fingerprint: ContentHash,
}

/// Tenant configuration persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load a tenant's document, optionally projected onto its editable part
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the tenant has no document
    async fn load_config(
        &self,
        tenant_id: &str,
        editable_only: bool,
    ) -> Result<TenantConfig, StoreError>;

    /// Store a document for a tenant
    ///
    /// # Errors
    /// Returns error on invalid tenant, tenant mismatch or backend failure;
    /// nothing is written in that case
    async fn save_config(
        &self,
        tenant_id: &str,
        config: &TenantConfig,
        options: SaveOptions,
    ) -> Result<SaveResult, StoreError>;

    /// Backups of a tenant's document, oldest first
    ///
    /// # Errors
    /// Returns error on invalid tenant or backend failure
    async fn list_backups(&self, tenant_id: &str) -> Result<Vec<BackupInfo>, StoreError>;

    /// Summary of a tenant's stored document
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the tenant has no document
    async fn get_metadata(&self, tenant_id: &str) -> Result<ConfigMetadata, StoreError>;
}

/// Check a tenant id against `^[A-Za-z0-9][A-Za-z0-9_-]*$`
///
/// # Errors
/// Returns [`StoreError::InvalidTenant`] for anything else
pub fn validate_tenant_id(tenant_id: &str) -> Result<(), StoreError> {
    let valid = TENANT_ID.as_ref().is_some_and(|re| re.is_match(tenant_id));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTenant(tenant_id.to_string()))
    }
}

/// Document as the store will write it
///
/// Applies the server-side merge when requested, binds the tenant id and
/// stamps `last_updated`.
pub(crate) fn prepare_document(
    engine: &ConfigMergeEngine,
    tenant_id: &str,
    existing: Option<&TenantConfig>,
    incoming: &TenantConfig,
    options: SaveOptions,
    now: DateTime<Utc>,
) -> Result<TenantConfig, StoreError> {
    if let Some(found) = incoming.tenant_id() {
        if found != tenant_id {
            return Err(StoreError::TenantMismatch {
                expected: tenant_id.to_string(),
                found: found.to_string(),
            });
        }
    }
    let mut document = match (options.merge, existing) {
        (true, Some(base)) => engine.merge_at(base, incoming, now),
        _ => incoming.clone(),
    };
    if document.tenant_id().is_none() {
        document.insert("tenant_id", Value::String(tenant_id.to_string()));
    }
    document.insert(
        LAST_UPDATED_FIELD,
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    Ok(document)
}

/// Apply the `editable_only` projection
pub(crate) fn project(document: TenantConfig, editable_only: bool) -> TenantConfig {
    if editable_only {
        extract_editable_sections(&document)
    } else {
        document
    }
}

pub(crate) fn metadata_of(
    tenant_id: &str,
    document: &TenantConfig,
    backup_count: usize,
) -> ConfigMetadata {
    ConfigMetadata {
        tenant_id: tenant_id.to_string(),
        version: document.version().map(str::to_string),
        last_updated: document
            .get(LAST_UPDATED_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string),
        size_bytes: document.approximate_size() as u64,
        backup_count,
        read_only_fingerprint: document.read_only_fingerprint(),
    }
}
