//! Record Identity Resolver

use crate::schema::RecordSchema;
use crate::xml::XmlNode;
use lido2rdf_domain::IdentityKey;
use serde::Serialize;
use std::collections::BTreeMap;

/// How an element's identity was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMode {
    /// Identifier taken from the source
    ExplicitId,
    /// Synthesized from the element's place in the record tree
    PathId,
    /// Plain value; only the text is meaningful
    PlainText,
}

/// Data extracted from one matched element
///
/// Built fresh on every evaluation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Info {
    /// Trimmed direct text
    pub text: String,
    /// Attributes keyed by expanded name
    pub attributes: BTreeMap<String, String>,
    /// How `id` was obtained
    pub mode: IdMode,
    /// Explicit identifier or positional path; empty for plain text
    pub id: String,
    /// Ancestor chain of local names with sibling positions
    pub path: String,
    /// Position among the candidates it was found with
    pub index: usize,
    /// Inherited `xml:lang`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Info {
    /// Key from which the element's node identity is derived
    ///
    /// Plain-text elements fall back to their positional path so that every
    /// element has a stable identity.
    pub fn identity_key<'a>(&'a self, record_id: &'a str) -> IdentityKey<'a> {
        match self.mode {
            IdMode::ExplicitId => IdentityKey::Explicit(&self.id),
            IdMode::PathId | IdMode::PlainText => IdentityKey::Positional {
                record_id,
                path: &self.path,
            },
        }
    }

    /// Check if the element carries an identity of its own
    pub fn has_identity(&self) -> bool {
        self.mode != IdMode::PlainText
    }
}

/// Resolves identity and content of source elements
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver<'s> {
    schema: &'s RecordSchema,
}

impl<'s> IdentityResolver<'s> {
    /// Create a resolver backed by a schema's identity table
    pub fn new(schema: &'s RecordSchema) -> Self {
        Self { schema }
    }

    /// Resolve an element found at `position`
    pub fn resolve(&self, element: XmlNode<'_>, position: usize) -> Info {
        let text = element.text().to_string();
        let path = element.positional_path();

        let (mode, id) = match self.schema.explicit_id(element) {
            Some(id) => (IdMode::ExplicitId, id),
            None if element.has_children() && text.is_empty() => (IdMode::PathId, path.clone()),
            None => (IdMode::PlainText, String::new()),
        };

        Info {
            attributes: element
                .attributes()
                .iter()
                .map(|a| (a.name.to_string(), a.value.clone()))
                .collect(),
            lang: element.language().map(str::to_string),
            text,
            mode,
            id,
            path,
            index: position,
        }
    }
}
