//! Triple Builder - evaluation results → triples
//!
//! Decides per object whether it becomes a literal, a linked resource or a
//! hashed node, and expands short-form names through the namespace table.
//! A subject is only emitted together with at least one property triple.

use crate::evaluator::{MappingData, PoData};
use crate::identity::{IdMode, Info};
use lido2rdf_domain::namespace::{is_absolute, Expansion, NamespaceTable, RDFS, XSD};
use lido2rdf_domain::{Literal, Node, Term, Triple, RDF_TYPE};
use tracing::debug;

/// `crm:P90_has_value` short form
pub const HAS_VALUE: &str = "crm:P90_has_value";

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Builds triples against a namespace table
#[derive(Debug, Clone, Copy)]
pub struct TripleBuilder<'n> {
    namespaces: &'n NamespaceTable,
}

/// How an object entity type wants its values rendered
enum ObjectKind {
    /// Literal, with a datatype for non-string XSD types
    Literal(Option<String>),
    /// Node, typed with the object entity
    Node,
}

impl<'n> TripleBuilder<'n> {
    /// Create a builder
    pub fn new(namespaces: &'n NamespaceTable) -> Self {
        Self { namespaces }
    }

    /// Triples for one evaluated subject
    ///
    /// Returns nothing for an invalid subject, and nothing at all (not even
    /// the type assertion) when no property contributes a triple.
    pub fn build(&self, data: &MappingData<'_>, record_id: &str) -> Vec<Triple> {
        if !data.valid {
            return Vec::new();
        }
        let subject = data.info.identity_key(record_id).node();

        let mut properties = Vec::new();
        for po in data.properties.iter().filter(|po| po.valid) {
            self.property_triples(&subject, po, record_id, &mut properties);
        }
        if properties.is_empty() {
            return Vec::new();
        }

        let mut triples = Vec::with_capacity(properties.len() + 1);
        triples.push(self.type_assertion(subject, &data.subject.entity));
        triples.extend(properties);
        triples
    }

    fn expand(&self, name: &str) -> Expansion {
        let expansion = self.namespaces.expand(name);
        if expansion.is_opaque() {
            debug!(name, "short-form name with unknown prefix");
        }
        expansion
    }

    /// `(node, rdf:type, class)`; an unresolvable class is kept as a literal name
    fn type_assertion(&self, node: Node, entity: &str) -> Triple {
        match self.expand(entity) {
            Expansion::Iri(class) => Triple::typed(node, class),
            Expansion::Opaque(name) => Triple::new(node, RDF_TYPE, Literal::simple(name)),
        }
    }

    fn object_kind(&self, entity: &str) -> ObjectKind {
        let expansion = self.expand(entity);
        if let Expansion::Iri(iri) = &expansion {
            if iri == &format!("{}Literal", RDFS) {
                return ObjectKind::Literal(None);
            }
            if iri.starts_with(XSD) {
                let datatype = (iri != XSD_STRING).then(|| iri.clone());
                return ObjectKind::Literal(datatype);
            }
        }
        ObjectKind::Node
    }

    fn property_triples(&self, subject: &Node, po: &PoData<'_>, record_id: &str, out: &mut Vec<Triple>) {
        let predicate = self.expand(&po.predicate.entity).into_string();
        let kind = self.object_kind(&po.object.entity);

        for object in &po.objects {
            match &kind {
                ObjectKind::Literal(datatype) => {
                    let value = literal_value(object);
                    if value.is_empty() {
                        continue;
                    }
                    let literal = match datatype {
                        Some(datatype) => Literal::typed(value, datatype.as_str()),
                        None => Literal::with_language(value, object.lang.as_deref()),
                    };
                    out.push(Triple::new(subject.clone(), predicate.as_str(), literal));
                }
                ObjectKind::Node if !object.has_identity() => {
                    if object.text.is_empty() {
                        continue;
                    }
                    if is_absolute(&object.text) {
                        let node = Node::resource(object.text.as_str());
                        self.link(subject, &predicate, node, &po.object.entity, None, out);
                    } else {
                        let literal = Literal::with_language(object.text.as_str(), object.lang.as_deref());
                        out.push(Triple::new(subject.clone(), predicate.as_str(), literal));
                    }
                }
                ObjectKind::Node => {
                    let node = object.identity_key(record_id).node();
                    let value = literal_value(object);
                    let value = (!value.is_empty()).then_some(value);
                    self.link(subject, &predicate, node, &po.object.entity, value, out);
                }
            }
        }
    }

    fn link(
        &self,
        subject: &Node,
        predicate: &str,
        object: Node,
        entity: &str,
        value: Option<&str>,
        out: &mut Vec<Triple>,
    ) {
        if &object == subject {
            debug!(node = %object, "skipping self-referential object");
            return;
        }
        out.push(self.type_assertion(object.clone(), entity));
        if let Some(value) = value {
            out.push(Triple::new(
                object.clone(),
                self.expand(HAS_VALUE).into_string(),
                Literal::simple(value),
            ));
        }
        out.push(Triple::new(subject.clone(), predicate, Term::Node(object)));
    }
}

/// Text of an object, or its explicit identifier when it has no text
fn literal_value(info: &Info) -> &str {
    if info.text.is_empty() && info.mode == IdMode::ExplicitId {
        &info.id
    } else {
        &info.text
    }
}
