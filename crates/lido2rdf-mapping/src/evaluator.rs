//! Mapping Evaluator - applies rules to one record
//!
//! Produces a result tree mirroring the rule shape, filled with the
//! [`Info`] of every matched element. Evaluation never fails; a rule that
//! does not apply yields an invalid or empty branch.

use crate::identity::{IdentityResolver, Info};
use crate::rules::{ExP, Mapping, PropertyObject, RuleSet};
use crate::schema::RecordSchema;
use crate::xml::XmlNode;

/// Evaluated property rule
#[derive(Debug, Clone)]
pub struct PoData<'r> {
    /// Relation link of the rule
    pub predicate: &'r ExP,
    /// Object link of the rule
    pub object: &'r ExP,
    /// Whether the rule's condition held for the subject
    pub valid: bool,
    /// Matched objects; empty when invalid
    pub objects: Vec<Info>,
}

/// Evaluated rule for one subject candidate
#[derive(Debug, Clone)]
pub struct MappingData<'r> {
    /// Subject link of the rule
    pub subject: &'r ExP,
    /// Resolved subject
    pub info: Info,
    /// Whether the rule's own condition held
    pub valid: bool,
    /// One entry per property rule, in rule order
    pub properties: Vec<PoData<'r>>,
}

impl MappingData<'_> {
    /// Total number of matched objects over valid properties
    pub fn object_count(&self) -> usize {
        self.properties
            .iter()
            .filter(|po| po.valid)
            .map(|po| po.objects.len())
            .sum()
    }
}

/// Interpreter over a record tree
#[derive(Debug, Clone, Copy)]
pub struct MappingEvaluator<'s> {
    resolver: IdentityResolver<'s>,
}

impl<'s> MappingEvaluator<'s> {
    /// Create an evaluator for records of `schema`
    pub fn new(schema: &'s RecordSchema) -> Self {
        Self {
            resolver: IdentityResolver::new(schema),
        }
    }

    /// Evaluate one rule against a record, one entry per subject candidate
    pub fn evaluate<'r>(&self, mapping: &'r Mapping, record: XmlNode<'_>) -> Vec<MappingData<'r>> {
        mapping
            .subject
            .path
            .select(record)
            .into_iter()
            .enumerate()
            .map(|(position, candidate)| MappingData {
                subject: &mapping.subject,
                info: self.resolver.resolve(candidate, position),
                valid: mapping.condition.holds(candidate),
                properties: mapping
                    .properties
                    .iter()
                    .map(|po| self.evaluate_property(po, candidate))
                    .collect(),
            })
            .collect()
    }

    /// Evaluate every rule, keeping only valid subjects
    pub fn evaluate_all<'r>(&self, rules: &'r RuleSet, record: XmlNode<'_>) -> Vec<MappingData<'r>> {
        rules
            .mappings
            .iter()
            .flat_map(|mapping| self.evaluate(mapping, record))
            .filter(|data| data.valid)
            .collect()
    }

    fn evaluate_property<'r>(&self, po: &'r PropertyObject, subject: XmlNode<'_>) -> PoData<'r> {
        let valid = po.condition.holds(subject);
        let objects = if valid {
            po.object
                .path
                .select(subject)
                .into_iter()
                .enumerate()
                .map(|(position, element)| self.resolver.resolve(element, position))
                .collect()
        } else {
            Vec::new()
        };
        PoData {
            predicate: &po.predicate,
            object: &po.object,
            valid,
            objects,
        }
    }
}
