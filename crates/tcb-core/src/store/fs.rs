//! Filesystem-backed configuration store
//!
//! Layout: `<root>/<tenant>/config.json`, previous versions kept under
//! `<root>/<tenant>/backups/<ulid>.json`.

use super::{
    metadata_of, prepare_document, project, validate_tenant_id, BackupInfo, ConfigMetadata,
    ConfigStore, SaveOptions, SaveResult,
};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tcb_config::{ConfigMergeEngine, TenantConfig};
use tokio::fs;
use tokio::sync::Mutex;
use ulid::Ulid;

const CONFIG_FILE: &str = "config.json";
const BACKUP_DIR: &str = "backups";

/// Store writing one directory per tenant
#[derive(Debug)]
pub struct FsConfigStore {
    root: PathBuf,
    engine: ConfigMergeEngine,
    write_lock: Mutex<()>,
}

impl FsConfigStore {
    /// Store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            engine: ConfigMergeEngine::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// With the merge engine used for `merge = true` saves
    #[must_use]
    pub fn with_merge_engine(mut self, engine: ConfigMergeEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tenant_dir(&self, tenant_id: &str) -> Result<PathBuf, StoreError> {
        validate_tenant_id(tenant_id)?;
        Ok(self.root.join(tenant_id))
    }

    async fn read_document(path: &Path) -> Result<Option<TenantConfig>, StoreError> {
        match fs::read_to_string(path).await {
            Ok(text) => Ok(Some(TenantConfig::from_json_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn backup_count(dir: &Path) -> Result<usize, StoreError> {
        Ok(Self::read_backups(dir).await?.len())
    }

    async fn read_backups(dir: &Path) -> Result<Vec<BackupInfo>, StoreError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut backups = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Ulid::from_string(s).ok())
            else {
                tracing::debug!(
                    path = %path.display(),
                    "skipping foreign file in backup directory"
                );
                continue;
            };
            let size_bytes = entry.metadata().await?.len();
            backups.push(BackupInfo {
                id: id.to_string(),
                created_at: DateTime::<Utc>::from(id.datetime()),
                size_bytes,
            });
        }
        backups.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(backups)
    }
}

#[async_trait]
impl ConfigStore for FsConfigStore {
    async fn load_config(
        &self,
        tenant_id: &str,
        editable_only: bool,
    ) -> Result<TenantConfig, StoreError> {
        let path = self.tenant_dir(tenant_id)?.join(CONFIG_FILE);
        let document = Self::read_document(&path).await?.ok_or_else(|| StoreError::NotFound {
            tenant: tenant_id.to_string(),
        })?;
        tracing::debug!(tenant_id, editable_only, path = %path.display(), "loaded configuration");
        Ok(project(document, editable_only))
    }

    async fn save_config(
        &self,
        tenant_id: &str,
        config: &TenantConfig,
        options: SaveOptions,
    ) -> Result<SaveResult, StoreError> {
        let dir = self.tenant_dir(tenant_id)?;
        let path = dir.join(CONFIG_FILE);
        let _guard = self.write_lock.lock().await;

        let existing = Self::read_document(&path).await?;
        let now = Utc::now();
        let document =
            prepare_document(&self.engine, tenant_id, existing.as_ref(), config, options, now)?;
        let encoded = document.to_json_pretty()?;

        fs::create_dir_all(&dir).await?;
        if options.create_backup && existing.is_some() {
            let backups = dir.join(BACKUP_DIR);
            fs::create_dir_all(&backups).await?;
            let backup = backups.join(format!("{}.json", Ulid::new()));
            fs::copy(&path, &backup).await?;
            tracing::debug!(
                tenant_id,
                backup = %backup.display(),
                "backed up previous configuration"
            );
        }

        let tmp = dir.join(format!("{CONFIG_FILE}.tmp"));
        fs::write(&tmp, encoded.as_bytes()).await?;
        fs::rename(&tmp, &path).await?;

        tracing::info!(
            tenant_id,
            merge = options.merge,
            bytes = encoded.len(),
            "saved configuration"
        );
        Ok(SaveResult {
            success: true,
            timestamp: now,
        })
    }

    async fn list_backups(&self, tenant_id: &str) -> Result<Vec<BackupInfo>, StoreError> {
        let dir = self.tenant_dir(tenant_id)?.join(BACKUP_DIR);
        Self::read_backups(&dir).await
    }

    async fn get_metadata(&self, tenant_id: &str) -> Result<ConfigMetadata, StoreError> {
        let dir = self.tenant_dir(tenant_id)?;
        let document = Self::read_document(&dir.join(CONFIG_FILE))
            .await?
            .ok_or_else(|| StoreError::NotFound {
                tenant: tenant_id.to_string(),
            })?;
        let backup_count = Self::backup_count(&dir.join(BACKUP_DIR)).await?;
        Ok(metadata_of(tenant_id, &document, backup_count))
    }
}
