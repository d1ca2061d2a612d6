//! TCB Entity
//!
//! Editable entity stores and the generic CRUD controller that is their
//! only writer.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use tcb_config::TenantConfig;
//! use tcb_deps::{DependencyResolver, EntityKind};
//! use tcb_entity::{EditorState, EntityCrudController, EventLog};
//!
//! let config = TenantConfig::from_value(json!({"programs": {}})).unwrap();
//! let mut state = EditorState::from_config(&config);
//! let log = Arc::new(EventLog::new());
//! let mut programs = EntityCrudController::new(
//!     EntityKind::Program,
//!     Arc::new(DependencyResolver::default()),
//!     log.clone(),
//! );
//!
//! programs.create(&mut state, json!({"program_id": "p1", "name": "Mentoring"})).unwrap();
//! assert!(programs.create(&mut state, json!({"program_id": "p1"})).is_err());
//! assert_eq!(log.events().len(), 2);
//! ```

#![warn(unreachable_pub)]

mod controller;
mod error;
mod events;
mod state;

pub use controller::{ControllerUiState, DeleteOutcome, EntityCrudController, PendingDeletion};
pub use error::CrudError;
pub use events::{CrudAction, CrudEvent, CrudOperation, EventLog, EventSink};
pub use state::{EditorState, EntityStore, MetadataError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
