//! TCB Autosave
//!
//! Best-effort crash recovery for the editor. Editor state is mirrored into
//! ephemeral per-tenant storage after a quiet period and restored when the
//! tenant is opened again. Independent of the deploy path.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tcb_autosave::{AutoSaveConfig, AutoSaveManager, MemoryStorage, SnapshotStorage};
//! use tcb_entity::EditorState;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let autosave = AutoSaveManager::new(AutoSaveConfig::default(), storage.clone(), "acme");
//!
//! autosave.set_dirty(true);
//! assert!(autosave.flush(&EditorState::new()));
//! assert!(storage.contains("tcb-autosave-acme"));
//!
//! autosave.set_dirty(false);
//! assert!(storage.get("tcb-autosave-acme").unwrap().is_none());
//! ```

#![warn(unreachable_pub)]

mod manager;
mod snapshot;
mod storage;
mod timer;

pub use manager::{AutoSaveConfig, AutoSaveManager, DEFAULT_DEBOUNCE_MS, DEFAULT_KEY_PREFIX};
pub use snapshot::AutoSaveSnapshot;
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage, StorageError};
pub use timer::DebounceTimer;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
