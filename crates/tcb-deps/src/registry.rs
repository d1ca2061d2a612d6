//! Declared cross-entity references
//!
//! Every "entity A references entity B by id" relation is declared here, in
//! one place. Nothing is inferred from entity shapes: a reference field that
//! is not registered is invisible to impact analysis.

use crate::kind::EntityKind;
use serde_json::Value;

/// How many ids a reference field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// A single id (string)
    Single,
    /// An ordered sequence of ids (array of strings)
    Many,
}

/// One declared reference field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceField {
    /// Kind of the referencing entity
    pub source: EntityKind,
    /// Kind of the referenced entity
    pub target: EntityKind,
    /// Path of the field inside the referencing entity
    pub path: Vec<&'static str>,
    /// Scalar or sequence
    pub cardinality: Cardinality,
}

impl ReferenceField {
    /// Declare a reference field
    #[must_use]
    pub fn new(
        source: EntityKind,
        path: &[&'static str],
        target: EntityKind,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            source,
            target,
            path: path.to_vec(),
            cardinality,
        }
    }

    /// Whether `entity` references `id` through this field
    #[must_use]
    pub fn references(&self, entity: &Value, id: &str) -> bool {
        let Some(value) = self.path.iter().try_fold(entity, |v, seg| v.get(*seg)) else {
            return false;
        };

        match self.cardinality {
            Cardinality::Single => value.as_str() == Some(id),
            Cardinality::Many => value
                .as_array()
                .is_some_and(|ids| ids.iter().any(|v| v.as_str() == Some(id))),
        }
    }

    /// Dotted field path, for diagnostics
    #[must_use]
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

/// Registry of declared reference fields
#[derive(Debug, Clone, Default)]
pub struct ReferenceRegistry {
    fields: Vec<ReferenceField>,
}

impl ReferenceRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Registry with the built-in references
    ///
    /// - form `program` → program
    /// - CTA `formId` → form
    /// - branch `available_ctas.primary` → CTA
    /// - branch `available_ctas.secondary[]` → CTA
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ReferenceField::new(
            EntityKind::Form,
            &["program"],
            EntityKind::Program,
            Cardinality::Single,
        ));
        registry.register(ReferenceField::new(
            EntityKind::Cta,
            &["formId"],
            EntityKind::Form,
            Cardinality::Single,
        ));
        registry.register(ReferenceField::new(
            EntityKind::Branch,
            &["available_ctas", "primary"],
            EntityKind::Cta,
            Cardinality::Single,
        ));
        registry.register(ReferenceField::new(
            EntityKind::Branch,
            &["available_ctas", "secondary"],
            EntityKind::Cta,
            Cardinality::Many,
        ));
        registry
    }

    /// Register a reference field
    pub fn register(&mut self, field: ReferenceField) {
        self.fields.push(field);
    }

    /// Fields that point at entities of `target`
    pub fn referencing(&self, target: EntityKind) -> impl Iterator<Item = &ReferenceField> {
        self.fields.iter().filter(move |f| f.target == target)
    }

    /// Get number of registered fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
