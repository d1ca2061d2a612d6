//! Entity kinds
//!
//! The closed set of entity kinds an operator can create, edit and delete.
//! Each kind lives in exactly one id-keyed editable section.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tcb_config::EditableSection;

/// Kind of an editable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Program (`programs`)
    Program,
    /// Conversational form (`conversational_forms`)
    Form,
    /// Call-to-action (`cta_definitions`)
    Cta,
    /// Conversation branch (`conversation_branches`)
    Branch,
}

impl EntityKind {
    /// All entity kinds
    pub const ALL: [Self; 4] = [Self::Program, Self::Form, Self::Cta, Self::Branch];

    /// Section holding entities of this kind
    #[inline]
    #[must_use]
    pub const fn section(self) -> EditableSection {
        match self {
            Self::Program => EditableSection::Programs,
            Self::Form => EditableSection::ConversationalForms,
            Self::Cta => EditableSection::CtaDefinitions,
            Self::Branch => EditableSection::ConversationBranches,
        }
    }

    /// Entity kind stored in `section`, if the section is id-keyed
    #[must_use]
    pub fn for_section(section: EditableSection) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.section() == section)
    }

    /// Field carrying the entity's own id
    #[inline]
    #[must_use]
    pub const fn id_field(self) -> &'static str {
        match self {
            Self::Program => "program_id",
            Self::Form => "form_id",
            Self::Cta => "cta_id",
            Self::Branch => "branch_id",
        }
    }

    /// Extract an entity's id
    ///
    /// Reads the kind-specific id field, falling back to a generic `id`.
    /// Empty strings are not ids.
    #[must_use]
    pub fn entity_id(self, entity: &Value) -> Option<&str> {
        entity
            .get(self.id_field())
            .or_else(|| entity.get("id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Human label, singular
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Program => "program",
            Self::Form => "form",
            Self::Cta => "CTA",
            Self::Branch => "branch",
        }
    }

    /// Human label, plural
    #[inline]
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Program => "programs",
            Self::Form => "forms",
            Self::Cta => "CTAs",
            Self::Branch => "branches",
        }
    }

    /// Label with count agreement
    #[must_use]
    pub fn counted(self, n: usize) -> String {
        if n == 1 {
            format!("1 {}", self.label())
        } else {
            format!("{n} {}", self.plural())
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display name of an entity: its first string `name`, `label` or `title`
#[must_use]
pub fn display_name<'a>(entity: &'a Value, id: &'a str) -> &'a str {
    ["name", "label", "title"]
        .into_iter()
        .find_map(|field| entity.get(field).and_then(Value::as_str))
        .filter(|name| !name.is_empty())
        .unwrap_or(id)
}
