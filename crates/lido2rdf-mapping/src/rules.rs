//! Mapping Model - typed representation of a loaded rule document

use crate::predicate::Predicate;
use crate::selector::Selector;
use serde::Serialize;
use std::collections::BTreeMap;

/// Entity–path link: where to look, and what it means in the target ontology
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExP {
    /// Source location, relative to the element it is evaluated against
    pub path: Selector,
    /// Short-form or absolute name of the target type or relation
    pub entity: String,
    /// Optional binding name (`entity/@variable`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// Optional identity-generation strategy (`instance_generator/@name`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl ExP {
    /// Create a link without variable or generator
    pub fn new(path: Selector, entity: impl Into<String>) -> Self {
        Self {
            path,
            entity: entity.into(),
            variable: None,
            generator: None,
        }
    }

    /// Check if the path is anchored at the record root
    pub fn is_root(&self) -> bool {
        self.path.is_rooted()
    }
}

/// Property–object rule: one outgoing relation of a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyObject {
    /// Relation selector and target relationship
    pub predicate: ExP,
    /// Object selector (relative to the subject) and target type
    pub object: ExP,
    /// Gate evaluated against the subject element
    pub condition: Predicate,
}

/// One rule: a subject locator and its outgoing properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mapping {
    /// Subject selector and target type
    pub subject: ExP,
    /// Gate evaluated against each subject candidate
    pub condition: Predicate,
    /// Outgoing property rules
    pub properties: Vec<PropertyObject>,
}

/// Every rule of one document plus the namespaces it declares
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    /// `prefix → uri` declared by the document
    pub namespaces: BTreeMap<String, String>,
    /// Rules in document order
    pub mappings: Vec<Mapping>,
}

impl RuleSet {
    /// Number of rules
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Check if there are no rules
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Total number of property rules
    pub fn property_count(&self) -> usize {
        self.mappings.iter().map(|m| m.properties.len()).sum()
    }

    /// Iterate declared namespaces
    pub fn namespace_bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}
