//! TCB Dependencies
//!
//! Cross-entity reference declarations and impact analysis.
//!
//! # Overview
//!
//! - **EntityKind**: closed set of editable entity kinds
//! - **ReferenceRegistry**: every declared "A references B by id" field
//! - **DependencyResolver**: who references a given entity
//!
//! # Example
//!
//! ```rust
//! use tcb_config::{EditableSection, TenantConfig};
//! use tcb_deps::{DependencyResolver, EntityKind};
//! use serde_json::json;
//!
//! let config = TenantConfig::from_value(json!({
//!     "cta_definitions": {"cta2": {}},
//!     "conversation_branches": {
//!         "b1": {"available_ctas": {"primary": "cta1", "secondary": ["cta2"]}}
//!     }
//! })).unwrap();
//!
//! let report = DependencyResolver::default()
//!     .get_dependencies(&config, EditableSection::CtaDefinitions, "cta2")
//!     .unwrap();
//! assert!(report.contains(EntityKind::Branch, "b1"));
//! ```

#![warn(missing_docs)]

pub mod kind;
pub mod registry;
pub mod resolver;

// Re-exports
pub use kind::{display_name, EntityKind};
pub use registry::{Cardinality, ReferenceField, ReferenceRegistry};
pub use resolver::{DependencyReport, DependencyResolver, SectionSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
