//! Section classification
//!
//! Every top-level field of a tenant configuration falls into exactly one of
//! three categories: editable sections (owned by the editor), metadata
//! (scalar facts about the document) and read-only sections (everything
//! else, carried through verbatim).

use crate::document::TenantConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Metadata fields owned by the merge engine
pub const METADATA_FIELDS: &[&str] = &[
    "tenant_id",
    "version",
    "chat_title",
    "company_name",
    "generated_at",
    "last_updated",
];

/// Metadata fields that are assigned at merge/save time, never by clients
pub const TIMESTAMP_FIELDS: &[&str] = &["generated_at", "last_updated"];

/// Field stamped by the merge engine on every merge
pub const GENERATED_AT_FIELD: &str = "generated_at";

/// Known read-only sections. Unrecognized keys are read-only as well.
pub const READ_ONLY_SECTIONS: &[&str] = &[
    "branding",
    "features",
    "quick_help",
    "action_chips",
    "widget_behavior",
    "aws",
    "card_inventory",
    "subscription_tier",
];

/// Editable top-level sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableSection {
    /// `programs`: id → program
    Programs,
    /// `conversational_forms`: id → form
    ConversationalForms,
    /// `cta_definitions`: id → call-to-action
    CtaDefinitions,
    /// `conversation_branches`: id → branch
    ConversationBranches,
    /// `content_showcase`: ordered sequence of showcase items
    ContentShowcase,
}

impl EditableSection {
    /// All editable sections in document order
    pub const ALL: [Self; 5] = [
        Self::Programs,
        Self::ConversationalForms,
        Self::CtaDefinitions,
        Self::ConversationBranches,
        Self::ContentShowcase,
    ];

    /// Top-level key of this section
    #[inline]
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Programs => "programs",
            Self::ConversationalForms => "conversational_forms",
            Self::CtaDefinitions => "cta_definitions",
            Self::ConversationBranches => "conversation_branches",
            Self::ContentShowcase => "content_showcase",
        }
    }

    /// Look up a section by its top-level key
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    /// Whether the section is an ordered sequence rather than an id map
    #[inline]
    #[must_use]
    pub const fn is_sequence(self) -> bool {
        matches!(self, Self::ContentShowcase)
    }
}

impl fmt::Display for EditableSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Category of a single top-level field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionClass {
    /// Owned by the editor
    Editable(EditableSection),
    /// Scalar document metadata
    Metadata,
    /// Opaque, preserved verbatim
    ReadOnly,
}

/// A document's fields split by category, each preserving document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedSections {
    /// Editable sections
    pub editable: Map<String, Value>,
    /// Read-only sections (known and unrecognized)
    pub read_only: Map<String, Value>,
    /// Metadata fields
    pub metadata: Map<String, Value>,
}

/// Edit payload rejected by [`SectionClassifier::validate_edit_payload`]
///
/// Read-only violations and unknown keys are reported separately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe_violations(.read_only, .disallowed))]
pub struct ValidationError {
    /// Keys naming known read-only sections
    pub read_only: Vec<String>,
    /// Keys that are neither editable nor metadata nor known read-only
    pub disallowed: Vec<String>,
}

fn describe_violations(read_only: &[String], disallowed: &[String]) -> String {
    let mut parts = Vec::new();
    if !read_only.is_empty() {
        parts.push(format!(
            "cannot edit read-only sections: {}",
            read_only.join(", ")
        ));
    }
    if !disallowed.is_empty() {
        parts.push(format!(
            "fields not allowed in edit payload: {}",
            disallowed.join(", ")
        ));
    }
    parts.join("; ")
}

/// Static partition of configuration fields
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionClassifier;

impl SectionClassifier {
    /// Create classifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classify a single top-level key
    #[must_use]
    pub fn classify_key(key: &str) -> SectionClass {
        if let Some(section) = EditableSection::from_key(key) {
            SectionClass::Editable(section)
        } else if METADATA_FIELDS.contains(&key) {
            SectionClass::Metadata
        } else {
            SectionClass::ReadOnly
        }
    }

    /// Whether `key` is a metadata field
    #[inline]
    #[must_use]
    pub fn is_metadata(key: &str) -> bool {
        METADATA_FIELDS.contains(&key)
    }

    /// Whether `key` is assigned by the merge engine or the store
    #[inline]
    #[must_use]
    pub fn is_timestamp(key: &str) -> bool {
        TIMESTAMP_FIELDS.contains(&key)
    }

    /// Partition a document's fields into editable, read-only and metadata
    #[must_use]
    pub fn classify(&self, document: &TenantConfig) -> ClassifiedSections {
        let mut out = ClassifiedSections::default();
        for (key, value) in document.as_map() {
            let bucket = match Self::classify_key(key) {
                SectionClass::Editable(_) => &mut out.editable,
                SectionClass::Metadata => &mut out.metadata,
                SectionClass::ReadOnly => &mut out.read_only,
            };
            bucket.insert(key.clone(), value.clone());
        }
        out
    }

    /// Check that an edit payload only touches editable or metadata fields
    ///
    /// # Errors
    /// Returns [`ValidationError`] listing every read-only key and every
    /// unrecognized key found in `payload`.
    pub fn validate_edit_payload(
        &self,
        payload: &Map<String, Value>,
    ) -> Result<(), ValidationError> {
        let mut read_only = Vec::new();
        let mut disallowed = Vec::new();

        for key in payload.keys() {
            if READ_ONLY_SECTIONS.contains(&key.as_str()) {
                read_only.push(key.clone());
            } else if !matches!(
                Self::classify_key(key),
                SectionClass::Editable(_) | SectionClass::Metadata
            ) {
                disallowed.push(key.clone());
            }
        }

        if read_only.is_empty() && disallowed.is_empty() {
            Ok(())
        } else {
            tracing::debug!(?read_only, ?disallowed, "edit payload rejected");
            Err(ValidationError {
                read_only,
                disallowed,
            })
        }
    }
}
