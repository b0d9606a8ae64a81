//! Triple module - the atomic fact of the output graph

use crate::term::{Node, Term};
use std::fmt;

/// RDF type predicate
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// A (subject, predicate, object) fact
///
/// Triples are append-only: once built they are only ever inserted into a
/// [`crate::TripleSet`], never modified.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    /// Subject node
    pub subject: Node,
    /// Predicate IRI (already expanded)
    pub predicate: String,
    /// Object term
    pub object: Term,
}

impl Triple {
    /// Create a new triple
    pub fn new(subject: Node, predicate: impl Into<String>, object: impl Into<Term>) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Create an `rdf:type` assertion
    pub fn typed(subject: Node, class_iri: impl Into<String>) -> Self {
        Self::new(subject, RDF_TYPE, Node::Resource(class_iri.into()))
    }

    /// Check if this is an `rdf:type` assertion
    pub fn is_type_assertion(&self) -> bool {
        self.predicate == RDF_TYPE
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}
