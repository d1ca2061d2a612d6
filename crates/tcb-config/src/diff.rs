//! Structural diff between two configuration snapshots
//!
//! Pure and stateless: the same pair of documents always yields the same
//! diff. Entities are compared by value, never by identity.

use crate::document::TenantConfig;
use crate::hash::ContentHash;
use crate::section::{EditableSection, SectionClassifier, METADATA_FIELDS};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Old and new value of a metadata field (absent reads as `null`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    /// Value in the old snapshot
    pub old: Value,
    /// Value in the new snapshot
    pub new: Value,
}

/// Entity-level changes within one editable section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionChange {
    /// Ids present only in the new snapshot
    pub added: Vec<String>,
    /// Ids present only in the old snapshot
    pub removed: Vec<String>,
    /// Ids present in both whose values differ
    pub modified: Vec<String>,
    /// Shared entries of an ordered section appear in a different order
    pub reordered: bool,
    /// The section changed type (for example a map became a string); every
    /// old entry is listed as removed and every new one as added
    pub replaced: bool,
}

impl SectionChange {
    /// Whether no entity changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && !self.reordered
            && !self.replaced
    }
}

/// Result of [`ConfigDiffer::diff`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigDiff {
    /// Changed metadata fields, keyed by field name
    pub metadata_changes: IndexMap<String, ValueChange>,
    /// Changed editable sections, keyed by section name
    pub section_changes: IndexMap<String, SectionChange>,
    /// Whether anything changed
    pub has_changes: bool,
}

impl ConfigDiff {
    /// Changes for one section, if it changed
    #[inline]
    #[must_use]
    pub fn section(&self, section: EditableSection) -> Option<&SectionChange> {
        self.section_changes.get(section.key())
    }
}

/// Computes [`ConfigDiff`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigDiffer;

impl ConfigDiffer {
    /// Create differ
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Diff two snapshots
    ///
    /// Merge-assigned timestamps are not compared: every merge stamps a
    /// fresh `generated_at`, which would otherwise always register as a change.
    #[must_use]
    pub fn diff(&self, old: &TenantConfig, new: &TenantConfig) -> ConfigDiff {
        let mut diff = ConfigDiff::default();

        for field in METADATA_FIELDS {
            if SectionClassifier::is_timestamp(field) {
                continue;
            }
            let old_value = old.get(field).cloned().unwrap_or(Value::Null);
            let new_value = new.get(field).cloned().unwrap_or(Value::Null);
            if old_value != new_value {
                diff.metadata_changes.insert(
                    (*field).to_string(),
                    ValueChange {
                        old: old_value,
                        new: new_value,
                    },
                );
            }
        }

        for section in EditableSection::ALL {
            let change = diff_section(old.section(section), new.section(section));
            if !change.is_empty() {
                diff.section_changes.insert(section.key().to_string(), change);
            }
        }

        diff.has_changes = !diff.metadata_changes.is_empty() || !diff.section_changes.is_empty();
        tracing::debug!(
            metadata = diff.metadata_changes.len(),
            sections = diff.section_changes.len(),
            "computed configuration diff"
        );
        diff
    }
}

fn diff_section(old: Option<&Value>, new: Option<&Value>) -> SectionChange {
    if let (Some(a), Some(b)) = (old, new) {
        if ContentHash::of_value(a) == ContentHash::of_value(b) {
            return SectionChange::default();
        }
    }

    let old_entries = entity_entries(old);
    let new_entries = entity_entries(new);
    let mut change = SectionChange::default();

    if !Shape::of(old).compatible(Shape::of(new)) {
        change.removed = old_entries.keys().cloned().collect();
        change.added = new_entries.keys().cloned().collect();
        change.replaced = true;
        return change;
    }

    for (id, new_value) in &new_entries {
        match old_entries.get(id) {
            None => change.added.push(id.clone()),
            Some(old_value) if old_value != new_value => change.modified.push(id.clone()),
            Some(_) => {}
        }
    }
    for id in old_entries.keys() {
        if !new_entries.contains_key(id) {
            change.removed.push(id.clone());
        }
    }

    if matches!((old, new), (Some(Value::Array(_)), Some(Value::Array(_)))) {
        let old_order = old_entries.keys().filter(|id| new_entries.contains_key(*id));
        let new_order = new_entries.keys().filter(|id| old_entries.contains_key(*id));
        change.reordered = !old_order.eq(new_order);
    }
    change
}

/// Coarse type of a section value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Absent,
    Map,
    Sequence,
    Scalar,
}

impl Shape {
    fn of(section: Option<&Value>) -> Self {
        match section {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::Object(_)) => Self::Map,
            Some(Value::Array(_)) => Self::Sequence,
            Some(_) => Self::Scalar,
        }
    }

    /// Absent reads as an empty container, so only scalars and map/sequence
    /// swaps count as a change of type
    fn compatible(self, other: Self) -> bool {
        match (self, other) {
            (Self::Absent, Self::Map | Self::Sequence | Self::Absent)
            | (Self::Map | Self::Sequence, Self::Absent) => true,
            (a, b) => a == b && a != Self::Scalar,
        }
    }
}

/// Id → entity view of a section
///
/// Objects are keyed by their own keys. Sequences are keyed by each item's
/// string `id` when all items carry a distinct one, otherwise by position.
/// Anything else, including a missing section, reads as empty.
fn entity_entries(section: Option<&Value>) -> IndexMap<String, &Value> {
    match section {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Some(Value::Array(items)) => {
            let ids: Vec<Option<&str>> = items
                .iter()
                .map(|item| item.get("id").and_then(Value::as_str))
                .collect();
            let distinct: HashSet<&str> = ids.iter().flatten().copied().collect();

            if ids.iter().all(Option::is_some) && distinct.len() == items.len() {
                ids.into_iter()
                    .flatten()
                    .zip(items)
                    .map(|(id, item)| (id.to_string(), item))
                    .collect()
            } else {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), item))
                    .collect()
            }
        }
        _ => IndexMap::new(),
    }
}
