//! TCB Core
//!
//! Editing sessions over tenant configuration documents:
//! - [`EditorSession`]: load, edit through per-kind controllers, deploy
//! - [`ConfigStore`]: persistence backend, with filesystem and in-memory
//!   implementations
//! - [`EditorConfig`]: TOML-loadable settings
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use tcb_autosave::MemoryStorage;
//! use tcb_config::TenantConfig;
//! use tcb_core::{EditorConfig, EditorSession, MemoryConfigStore};
//! use tcb_deps::EntityKind;
//!
//! # tokio_test();
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn tokio_test() {
//! let store = Arc::new(MemoryConfigStore::new());
//! let seed = TenantConfig::from_value(json!({"tenant_id": "acme", "programs": {}})).unwrap();
//! store.seed("acme", seed).unwrap();
//!
//! let snapshots = Arc::new(MemoryStorage::new());
//! let mut session = EditorSession::open("acme", store, snapshots, EditorConfig::default())
//!     .await
//!     .unwrap();
//! session.create(EntityKind::Program, json!({"program_id": "p1"})).unwrap();
//! assert!(session.has_unsaved_changes());
//!
//! session.deploy().await.unwrap();
//! assert!(!session.has_unsaved_changes());
//! # }
//! ```

#![warn(unreachable_pub)]

mod config;
mod error;
mod session;
pub mod store;

pub use config::{ConfigLoadError, EditorConfig};
pub use error::{SessionError, StoreError};
pub use session::EditorSession;
pub use store::{
    validate_tenant_id, BackupInfo, ConfigMetadata, ConfigStore, FsConfigStore, MemoryConfigStore,
    SaveOptions, SaveResult, LAST_UPDATED_FIELD,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
