//! TCB Config
//!
//! Tenant configuration documents and the pure operations over them.
//!
//! # Core Concepts
//!
//! - [`TenantConfig`]: the full persisted document, order-preserving
//! - [`SectionClassifier`]: editable / read-only / metadata partition
//! - [`ConfigMergeEngine`]: recombines edited sections with the latest base
//! - [`ConfigDiffer`]: structural diff for change detection
//! - [`ContentHash`]: canonical fingerprint of JSON values
//!
//! # Example
//!
//! ```rust
//! use tcb_config::{extract_editable_sections, ConfigDiffer, ConfigMergeEngine, TenantConfig};
//! use serde_json::json;
//!
//! let base = TenantConfig::from_value(json!({
//!     "tenant_id": "acme",
//!     "branding": {"color": "blue"},
//!     "programs": {"p1": {}}
//! })).unwrap();
//!
//! let mut edited = extract_editable_sections(&base);
//! edited.insert("programs", json!({"p1": {}, "p2": {}}));
//!
//! let merged = ConfigMergeEngine::new().merge(&base, &edited);
//! assert_eq!(merged.get("branding"), Some(&json!({"color": "blue"})));
//!
//! let diff = ConfigDiffer::new().diff(&base, &merged);
//! assert!(diff.has_changes);
//! ```

#![warn(unreachable_pub)]

mod diff;
mod document;
mod hash;
mod merge;
mod section;

pub use diff::{ConfigDiff, ConfigDiffer, SectionChange, ValueChange};
pub use document::{DocumentError, TenantConfig};
pub use hash::ContentHash;
pub use merge::{
    extract_editable_sections, verify_read_only_preserved, ConfigMergeEngine, DEFAULT_VERSION,
};
pub use section::{
    ClassifiedSections, EditableSection, SectionClass, SectionClassifier, ValidationError,
    GENERATED_AT_FIELD, METADATA_FIELDS, READ_ONLY_SECTIONS, TIMESTAMP_FIELDS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
