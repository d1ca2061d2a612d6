//! Dependency resolution
//!
//! Finds every entity that references a given entity through a declared
//! reference field. Read-only and advisory: the report informs a
//! confirmation workflow, it never blocks or repairs anything.

use crate::kind::{display_name, EntityKind};
use crate::registry::ReferenceRegistry;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tcb_config::{EditableSection, TenantConfig};

/// Read access to id-keyed editable sections
///
/// Implemented by whole documents and by in-memory editor state so the
/// resolver works over either.
pub trait SectionSource {
    /// Entities of `section`; `None` when the section is absent or not a map
    fn section_entities(&self, section: EditableSection) -> Option<&Map<String, Value>>;
}

impl SectionSource for TenantConfig {
    fn section_entities(&self, section: EditableSection) -> Option<&Map<String, Value>> {
        self.section(section).and_then(Value::as_object)
    }
}

/// Entities referencing one target entity, grouped by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    /// Kind of the referenced entity
    pub target_kind: EntityKind,
    /// Id of the referenced entity
    pub target_id: String,
    /// Referencing entity ids by kind
    pub dependents: BTreeMap<EntityKind, BTreeSet<String>>,
    /// Message suitable for direct display
    pub summary: String,
}

impl DependencyReport {
    /// Total number of referencing entities
    #[must_use]
    pub fn total(&self) -> usize {
        self.dependents.values().map(BTreeSet::len).sum()
    }

    /// Whether `id` of `kind` references the target
    #[must_use]
    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.dependents.get(&kind).is_some_and(|ids| ids.contains(id))
    }

    /// Referencing ids of one kind
    #[must_use]
    pub fn ids(&self, kind: EntityKind) -> Vec<&str> {
        self.dependents
            .get(&kind)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Impact analysis over declared references
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    registry: ReferenceRegistry,
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new(ReferenceRegistry::with_defaults())
    }
}

impl DependencyResolver {
    /// Create resolver over a registry
    #[inline]
    #[must_use]
    pub fn new(registry: ReferenceRegistry) -> Self {
        Self { registry }
    }

    /// Declared references
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Entities referencing `entity_id` in `section`
    ///
    /// Returns `None` when nothing references it, including when the
    /// section holds no referenceable entities.
    #[must_use]
    pub fn get_dependencies<S: SectionSource + ?Sized>(
        &self,
        source: &S,
        section: EditableSection,
        entity_id: &str,
    ) -> Option<DependencyReport> {
        let target_kind = EntityKind::for_section(section)?;
        let mut dependents: BTreeMap<EntityKind, BTreeSet<String>> = BTreeMap::new();
        let mut names: BTreeMap<EntityKind, BTreeMap<String, String>> = BTreeMap::new();

        for field in self.registry.referencing(target_kind) {
            let Some(entities) = source.section_entities(field.source.section()) else {
                continue;
            };
            for (id, entity) in entities {
                if field.source == target_kind && id == entity_id {
                    continue;
                }
                if field.references(entity, entity_id) {
                    dependents.entry(field.source).or_default().insert(id.clone());
                    names
                        .entry(field.source)
                        .or_default()
                        .insert(id.clone(), display_name(entity, id).to_string());
                }
            }
        }

        if dependents.is_empty() {
            return None;
        }

        let target_name = source
            .section_entities(section)
            .and_then(|entities| entities.get(entity_id))
            .map_or(entity_id, |entity| display_name(entity, entity_id));
        let summary = summarize(target_kind, target_name, &names);

        tracing::debug!(
            target = %target_kind,
            id = entity_id,
            dependents = dependents.values().map(BTreeSet::len).sum::<usize>(),
            "resolved dependencies"
        );

        Some(DependencyReport {
            target_kind,
            target_id: entity_id.to_string(),
            dependents,
            summary,
        })
    }
}

fn summarize(
    target_kind: EntityKind,
    target_name: &str,
    names: &BTreeMap<EntityKind, BTreeMap<String, String>>,
) -> String {
    let groups: Vec<String> = names
        .iter()
        .map(|(kind, by_id)| {
            let mut listed: Vec<&str> = by_id.values().map(String::as_str).collect();
            listed.sort_unstable();
            format!("{} ({})", kind.counted(by_id.len()), listed.join(", "))
        })
        .collect();

    format!(
        "{} \"{}\" is used by {}",
        capitalize(target_kind.label()),
        target_name,
        join_groups(&groups)
    )
}

fn join_groups(groups: &[String]) -> String {
    match groups {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Cardinality, ReferenceField};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn config() -> TenantConfig {
        TenantConfig::from_value(json!({
            "programs": {"p1": {"name": "Mentoring"}},
            "conversational_forms": {
                "f1": {"program": "p1", "title": "Volunteer signup"},
                "f2": {"program": "p2"}
            },
            "cta_definitions": {
                "cta1": {"label": "Apply", "formId": "f1"},
                "cta2": {"label": "Learn more"}
            },
            "conversation_branches": {
                "b1": {"available_ctas": {"primary": "cta1", "secondary": ["cta2"]}},
                "b2": {"available_ctas": {"primary": "cta2", "secondary": []}},
                "b3": {"available_ctas": {"primary": "cta1"}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn secondary_reference_found() {
        let resolver = DependencyResolver::default();
        let report = resolver
            .get_dependencies(&config(), EditableSection::CtaDefinitions, "cta2")
            .unwrap();

        assert_eq!(report.target_kind, EntityKind::Cta);
        assert_eq!(report.ids(EntityKind::Branch), vec!["b1", "b2"]);
        assert_eq!(report.total(), 2);
        assert_eq!(
            report.summary,
            "CTA \"Learn more\" is used by 2 branches (b1, b2)"
        );
    }

    #[test]
    fn multiple_kinds_grouped() {
        let mut doc = config();
        doc.insert(
            "conversational_forms",
            json!({"f1": {"program": "p1", "title": "Volunteer signup"}, "f3": {"program": "p1"}}),
        );
        let report = DependencyResolver::default()
            .get_dependencies(&doc, EditableSection::Programs, "p1")
            .unwrap();
        assert_eq!(report.ids(EntityKind::Form), vec!["f1", "f3"]);
        assert_eq!(
            report.summary,
            "Program \"Mentoring\" is used by 2 forms (Volunteer signup, f3)"
        );
    }

    #[test]
    fn unreferenced_entity_has_no_report() {
        let resolver = DependencyResolver::default();
        assert!(resolver
            .get_dependencies(&config(), EditableSection::ConversationBranches, "b1")
            .is_none());
        assert!(resolver
            .get_dependencies(&config(), EditableSection::CtaDefinitions, "missing")
            .is_none());
        assert!(resolver
            .get_dependencies(&config(), EditableSection::ContentShowcase, "x")
            .is_none());
    }

    #[test]
    fn missing_sections_tolerated() {
        let empty = TenantConfig::new();
        assert!(DependencyResolver::default()
            .get_dependencies(&empty, EditableSection::CtaDefinitions, "cta1")
            .is_none());
    }

    #[test]
    fn custom_registry_and_multi_group_summary() {
        let mut registry = ReferenceRegistry::with_defaults();
        registry.register(ReferenceField::new(
            EntityKind::Cta,
            &["program"],
            EntityKind::Program,
            Cardinality::Single,
        ));
        let mut doc = config();
        doc.insert(
            "cta_definitions",
            json!({"cta9": {"label": "Donate", "program": "p1"}}),
        );

        let report = DependencyResolver::new(registry)
            .get_dependencies(&doc, EditableSection::Programs, "p1")
            .unwrap();
        assert!(report.contains(EntityKind::Cta, "cta9"));
        assert!(report.contains(EntityKind::Form, "f1"));
        assert_eq!(
            report.summary,
            "Program \"Mentoring\" is used by 1 form (Volunteer signup) and 1 CTA (Donate)"
        );
    }

    proptest! {
        #[test]
        fn prop_report_matches_exact_referencing_set(
            branches in prop::collection::btree_map(
                "b[0-9]{1,2}",
                (prop::option::of("c[0-3]"), prop::collection::vec("c[0-3]", 0..3)),
                0..8,
            ),
            target in "c[0-3]",
        ) {
            let mut expected = BTreeSet::new();
            let mut map = Map::new();
            for (id, (primary, secondary)) in &branches {
                if primary.as_deref() == Some(target.as_str()) || secondary.contains(&target) {
                    expected.insert(id.clone());
                }
                map.insert(
                    id.clone(),
                    json!({"available_ctas": {"primary": primary, "secondary": secondary}}),
                );
            }
            let mut doc = TenantConfig::new();
            doc.insert("conversation_branches", Value::Object(map));

            let resolver = DependencyResolver::default();
            let first = resolver.get_dependencies(&doc, EditableSection::CtaDefinitions, &target);
            let second = resolver.get_dependencies(&doc, EditableSection::CtaDefinitions, &target);
            prop_assert_eq!(&first, &second);

            match first {
                None => prop_assert!(expected.is_empty()),
                Some(report) => {
                    let found: BTreeSet<String> =
                        report.ids(EntityKind::Branch).into_iter().map(String::from).collect();
                    prop_assert_eq!(found, expected);
                }
            }
        }
    }
}
