//! In-memory configuration store

use super::{
    metadata_of, prepare_document, project, validate_tenant_id, BackupInfo, ConfigMetadata,
    ConfigStore, SaveOptions, SaveResult,
};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tcb_config::{ConfigMergeEngine, TenantConfig};
use ulid::Ulid;

#[derive(Debug, Clone)]
struct TenantRecord {
    document: TenantConfig,
    backups: Vec<(BackupInfo, TenantConfig)>,
}

/// Store keeping every tenant in a concurrent map
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    tenants: DashMap<String, TenantRecord>,
    engine: ConfigMergeEngine,
}

impl MemoryConfigStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With the merge engine used for `merge = true` saves
    #[must_use]
    pub fn with_merge_engine(mut self, engine: ConfigMergeEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Put a document in place as-is, without stamping or backups
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidTenant`] for a malformed tenant id
    pub fn seed(&self, tenant_id: &str, document: TenantConfig) -> Result<(), StoreError> {
        validate_tenant_id(tenant_id)?;
        self.tenants.insert(
            tenant_id.to_string(),
            TenantRecord {
                document,
                backups: Vec::new(),
            },
        );
        Ok(())
    }

    /// Number of tenants stored
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    /// Whether no tenant is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Content of one backup
    #[must_use]
    pub fn backup(&self, tenant_id: &str, backup_id: &str) -> Option<TenantConfig> {
        self.tenants.get(tenant_id).and_then(|record| {
            record
                .backups
                .iter()
                .find(|(info, _)| info.id == backup_id)
                .map(|(_, document)| document.clone())
        })
    }

    fn not_found(tenant_id: &str) -> StoreError {
        StoreError::NotFound {
            tenant: tenant_id.to_string(),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load_config(
        &self,
        tenant_id: &str,
        editable_only: bool,
    ) -> Result<TenantConfig, StoreError> {
        validate_tenant_id(tenant_id)?;
        let document = self
            .tenants
            .get(tenant_id)
            .map(|record| record.document.clone())
            .ok_or_else(|| Self::not_found(tenant_id))?;
        Ok(project(document, editable_only))
    }

    async fn save_config(
        &self,
        tenant_id: &str,
        config: &TenantConfig,
        options: SaveOptions,
    ) -> Result<SaveResult, StoreError> {
        validate_tenant_id(tenant_id)?;
        let now = Utc::now();
        match self.tenants.entry(tenant_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                let document = prepare_document(
                    &self.engine,
                    tenant_id,
                    Some(&record.document),
                    config,
                    options,
                    now,
                )?;
                if options.create_backup {
                    let id = Ulid::new();
                    let previous = std::mem::replace(&mut record.document, document);
                    let info = BackupInfo {
                        id: id.to_string(),
                        created_at: DateTime::<Utc>::from(id.datetime()),
                        size_bytes: previous.approximate_size() as u64,
                    };
                    record.backups.push((info, previous));
                } else {
                    record.document = document;
                }
            }
            Entry::Vacant(vacant) => {
                let document =
                    prepare_document(&self.engine, tenant_id, None, config, options, now)?;
                vacant.insert(TenantRecord {
                    document,
                    backups: Vec::new(),
                });
            }
        }
        tracing::info!(tenant_id, merge = options.merge, "saved configuration in memory");
        Ok(SaveResult {
            success: true,
            timestamp: now,
        })
    }

    async fn list_backups(&self, tenant_id: &str) -> Result<Vec<BackupInfo>, StoreError> {
        validate_tenant_id(tenant_id)?;
        Ok(self
            .tenants
            .get(tenant_id)
            .map(|record| record.backups.iter().map(|(info, _)| info.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_metadata(&self, tenant_id: &str) -> Result<ConfigMetadata, StoreError> {
        validate_tenant_id(tenant_id)?;
        let record = self
            .tenants
            .get(tenant_id)
            .ok_or_else(|| Self::not_found(tenant_id))?;
        Ok(metadata_of(tenant_id, &record.document, record.backups.len()))
    }
}
