//! Per-tenant autosave and recovery
//!
//! Mirrors editor state into [`SnapshotStorage`] under
//! `<prefix>-<tenantId>`. Writes are debounced: only the state present when
//! the timer fires is stored. Storage failures are logged and swallowed so
//! editing is never blocked.

use crate::snapshot::AutoSaveSnapshot;
use crate::storage::{SnapshotStorage, StorageError};
use crate::timer::DebounceTimer;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tcb_entity::EditorState;

/// Default debounce interval in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 30_000;

/// Default storage key prefix
pub const DEFAULT_KEY_PREFIX: &str = "tcb-autosave";

/// Autosave settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Whether snapshots are written and recovered at all
    pub enabled: bool,
    /// Quiet period before a snapshot is written
    pub debounce_ms: u64,
    /// Prefix of the per-tenant storage key
    pub storage_key_prefix: String,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            storage_key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl AutoSaveConfig {
    /// Debounce interval as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Set the debounce interval
    #[must_use]
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the storage key prefix
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_key_prefix = prefix.into();
        self
    }

    /// Enable or disable autosave
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Shared between the manager and its timer task
#[derive(Debug)]
struct Slot {
    storage: Arc<dyn SnapshotStorage>,
    key: String,
    pending: Mutex<Option<AutoSaveSnapshot>>,
}

impl Slot {
    /// Write the pending snapshot, if any; returns whether one was stored
    fn write_pending(&self) -> bool {
        let mut pending = self.pending.lock();
        match pending.take() {
            Some(snapshot) => match self.write(&snapshot) {
                Ok(bytes) => {
                    tracing::debug!(key = %self.key, bytes, "autosave snapshot written");
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        key = %self.key,
                        error = %e,
                        "failed to write autosave snapshot"
                    );
                    false
                }
            },
            None => false,
        }
    }

    fn write(&self, snapshot: &AutoSaveSnapshot) -> Result<usize, StorageError> {
        let encoded = serde_json::to_string(snapshot)?;
        self.storage.set(&self.key, &encoded)?;
        Ok(encoded.len())
    }

    fn read(&self) -> Result<Option<AutoSaveSnapshot>, StorageError> {
        match self.storage.get(&self.key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn clear(&self) {
        self.pending.lock().take();
        match self.storage.remove(&self.key) {
            Ok(()) => tracing::debug!(key = %self.key, "autosave snapshot removed"),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to remove autosave snapshot");
            }
        }
    }
}

/// Debounced autosave for one tenant
#[derive(Debug)]
pub struct AutoSaveManager {
    config: AutoSaveConfig,
    tenant_id: String,
    slot: Arc<Slot>,
    timer: DebounceTimer,
    dirty: AtomicBool,
}

impl AutoSaveManager {
    /// Manager for `tenant_id` writing into `storage`
    pub fn new(
        config: AutoSaveConfig,
        storage: Arc<dyn SnapshotStorage>,
        tenant_id: impl Into<String>,
    ) -> Self {
        let tenant_id = tenant_id.into();
        let slot = Arc::new(Slot {
            storage,
            key: format!("{}-{}", config.storage_key_prefix, tenant_id),
            pending: Mutex::new(None),
        });
        let task_slot = Arc::clone(&slot);
        let timer =
            DebounceTimer::new(config.debounce_interval(), move || task_slot.write_pending());
        Self {
            config,
            tenant_id,
            slot,
            timer,
            dirty: AtomicBool::new(false),
        }
    }

    /// Settings in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AutoSaveConfig {
        &self.config
    }

    /// Tenant this manager writes for
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Storage key of this tenant's snapshot
    #[inline]
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.slot.key
    }

    /// Last dirty flag seen
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Whether a debounced write is waiting
    #[must_use]
    pub fn has_pending_write(&self) -> bool {
        self.timer.is_pending()
    }

    /// Track the externally owned dirty flag
    ///
    /// A transition to clean drops any waiting write and deletes the stored
    /// snapshot, so recovery never resurrects deployed state.
    pub fn set_dirty(&self, dirty: bool) {
        let was_dirty = self.dirty.swap(dirty, Ordering::SeqCst);
        if was_dirty && !dirty {
            self.timer.cancel();
            if self.config.enabled {
                self.slot.clear();
            }
        }
    }

    /// Record a change to the watched stores
    ///
    /// While dirty, captures `state` as the pending snapshot and restarts the
    /// debounce wait. Without an async runtime the snapshot is held until
    /// [`flush`](Self::flush).
    pub fn notify_change(&self, state: &EditorState) {
        if !self.config.enabled || !self.is_dirty() {
            return;
        }
        *self.slot.pending.lock() = Some(AutoSaveSnapshot::capture(&self.tenant_id, state));
        self.timer.reset();
    }

    /// Synchronous best-effort write of `state`, skipping the debounce
    ///
    /// Does nothing while clean. Returns whether a snapshot was stored.
    pub fn flush(&self, state: &EditorState) -> bool {
        if !self.config.enabled || !self.is_dirty() {
            return false;
        }
        *self.slot.pending.lock() = Some(AutoSaveSnapshot::capture(&self.tenant_id, state));
        self.timer.fire_now()
    }

    /// Load this tenant's snapshot and rebuild state from it
    ///
    /// Returns `None` when there is nothing usable to recover. A snapshot of
    /// another tenant is ignored and left in place. On success the manager
    /// is marked dirty: recovered state is always unsaved.
    pub fn load_recovery(&self, seed: &EditorState) -> Option<EditorState> {
        if !self.config.enabled {
            return None;
        }
        let snapshot = match self.slot.read() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(
                    key = %self.slot.key,
                    error = %e,
                    "ignoring unreadable autosave snapshot"
                );
                return None;
            }
        };
        if snapshot.tenant_id != self.tenant_id {
            tracing::warn!(
                key = %self.slot.key,
                expected = %self.tenant_id,
                found = %snapshot.tenant_id,
                "ignoring autosave snapshot of another tenant"
            );
            return None;
        }
        tracing::info!(
            tenant_id = %self.tenant_id,
            timestamp = snapshot.timestamp,
            "recovered unsaved changes from autosave"
        );
        self.dirty.store(true, Ordering::SeqCst);
        Some(snapshot.restore(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tcb_config::TenantConfig;
    use tcb_deps::{DependencyResolver, EntityKind};
    use tcb_entity::{EntityCrudController, EventLog};

    const KEY: &str = "tcb-autosave-acme";

    fn seed() -> EditorState {
        let config = TenantConfig::from_value(json!({
            "tenant_id": "acme",
            "programs": {"p1": {"program_id": "p1", "name": "One"}}
        }))
        .unwrap();
        EditorState::from_config(&config)
    }

    fn manager(storage: &Arc<MemoryStorage>) -> AutoSaveManager {
        let storage: Arc<dyn SnapshotStorage> = storage.clone();
        AutoSaveManager::new(AutoSaveConfig::default(), storage, "acme")
    }

    fn programs() -> EntityCrudController {
        EntityCrudController::new(
            EntityKind::Program,
            Arc::new(DependencyResolver::default()),
            Arc::new(EventLog::new()),
        )
    }

    fn stored(storage: &MemoryStorage) -> AutoSaveSnapshot {
        serde_json::from_str(&storage.get(KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn key_uses_prefix_and_tenant() {
        let storage = Arc::new(MemoryStorage::new());
        assert_eq!(manager(&storage).storage_key(), KEY);

        let custom = AutoSaveManager::new(
            AutoSaveConfig::default().with_key_prefix("draft"),
            storage,
            "t9",
        );
        assert_eq!(custom.storage_key(), "draft-t9");
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_changes_write_once_with_last_state() {
        let storage = Arc::new(MemoryStorage::new());
        let autosave = manager(&storage);
        let mut state = seed();
        let mut ctl = programs();
        autosave.set_dirty(true);

        for i in 2..6 {
            ctl.create(&mut state, json!({"program_id": format!("p{i}")})).unwrap();
            autosave.notify_change(&state);
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        assert_eq!(storage.write_count(), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(storage.write_count(), 1);
        let snapshot = stored(&storage);
        assert_eq!(snapshot.tenant_id, "acme");
        assert_eq!(snapshot.programs.len(), 5);
        assert!(snapshot.programs.contains_key("p5"));
    }

    #[tokio::test(start_paused = true)]
    async fn changes_while_clean_are_not_written() {
        let storage = Arc::new(MemoryStorage::new());
        let autosave = manager(&storage);
        autosave.notify_change(&seed());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(storage.write_count(), 0);
        assert!(!autosave.flush(&seed()));
    }

    #[tokio::test(start_paused = true)]
    async fn clean_transition_deletes_snapshot_and_pending_write() {
        let storage = Arc::new(MemoryStorage::new());
        let autosave = manager(&storage);
        autosave.set_dirty(true);
        autosave.notify_change(&seed());
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(storage.contains(KEY));

        autosave.notify_change(&seed());
        autosave.set_dirty(false);
        assert!(!storage.contains(KEY));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!storage.contains(KEY));
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_writes_immediately_and_cancels_timer() {
        let storage = Arc::new(MemoryStorage::new());
        let autosave = manager(&storage);
        autosave.set_dirty(true);
        autosave.notify_change(&seed());
        assert!(autosave.has_pending_write());

        assert!(autosave.flush(&seed()));
        assert_eq!(storage.write_count(), 1);
        assert!(!autosave.has_pending_write());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn changes_without_runtime_coalesce_until_flush() {
        let storage = Arc::new(MemoryStorage::new());
        let autosave = manager(&storage);
        let mut state = seed();
        let mut ctl = programs();
        autosave.set_dirty(true);

        for i in 2..5 {
            ctl.create(&mut state, json!({"program_id": format!("p{i}")})).unwrap();
            autosave.notify_change(&state);
        }
        assert_eq!(storage.write_count(), 0);
        assert!(autosave.has_pending_write());

        assert!(autosave.flush(&state));
        assert_eq!(storage.write_count(), 1);
        assert_eq!(stored(&storage).programs.len(), 4);
        assert!(!autosave.has_pending_write());
    }

    #[test]
    fn clean_transition_drops_write_held_without_runtime() {
        let storage = Arc::new(MemoryStorage::new());
        let autosave = manager(&storage);
        autosave.set_dirty(true);
        autosave.notify_change(&seed());
        autosave.set_dirty(false);

        assert!(!autosave.has_pending_write());
        assert!(!autosave.flush(&seed()));
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn recovery_restores_stores_and_marks_dirty() {
        let storage = Arc::new(MemoryStorage::new());
        let mut state = seed();
        programs().create(&mut state, json!({"program_id": "p2"})).unwrap();
        let snapshot = AutoSaveSnapshot::capture("acme", &state);
        storage.set(KEY, &serde_json::to_string(&snapshot).unwrap()).unwrap();

        let autosave = manager(&storage);
        let recovered = autosave.load_recovery(&seed()).unwrap();
        assert_eq!(recovered.entities(EntityKind::Program).len(), 2);
        assert!(autosave.is_dirty());
    }

    #[test]
    fn recovery_ignores_other_tenant_without_deleting() {
        let storage = Arc::new(MemoryStorage::new());
        let snapshot = AutoSaveSnapshot::capture("other", &EditorState::new());
        storage.set(KEY, &serde_json::to_string(&snapshot).unwrap()).unwrap();

        let autosave = manager(&storage);
        assert!(autosave.load_recovery(&seed()).is_none());
        assert!(!autosave.is_dirty());
        assert!(storage.contains(KEY));
    }

    #[test]
    fn recovery_ignores_garbage() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(KEY, "not json").unwrap();
        assert!(manager(&storage).load_recovery(&seed()).is_none());
    }

    #[test]
    fn quota_failure_is_swallowed() {
        let storage = Arc::new(MemoryStorage::with_quota(8));
        let autosave = manager(&storage);
        autosave.set_dirty(true);
        assert!(!autosave.flush(&seed()));
        assert!(!storage.contains(KEY));
    }

    #[test]
    fn disabled_manager_never_touches_storage() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(KEY, "{}").unwrap();
        let dyn_storage: Arc<dyn SnapshotStorage> = storage.clone();
        let config = AutoSaveConfig::default().with_enabled(false);
        let autosave = AutoSaveManager::new(config, dyn_storage, "acme");
        autosave.set_dirty(true);
        assert!(!autosave.flush(&seed()));
        autosave.set_dirty(false);
        assert!(storage.contains(KEY));
        assert!(autosave.load_recovery(&seed()).is_none());
    }
}
