//! Term module - the building blocks of a triple

use std::fmt;

/// Content-addressed identity of a node that has no name of its own
///
/// The digest is derived from a stable key (see [`crate::identity`]), so the
/// same logical entity always maps to the same node across runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(String);

impl NodeId {
    /// Hash a key into a node identity
    ///
    /// # Examples
    ///
    /// ```
    /// use lido2rdf_domain::NodeId;
    ///
    /// let a = NodeId::from_key("DE-Mb112/lido-obj00154983");
    /// let b = NodeId::from_key("DE-Mb112/lido-obj00154983");
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str().len(), 32);
    /// ```
    pub fn from_key(key: &str) -> Self {
        Self(format!("{:x}", md5::compute(key.as_bytes())))
    }

    /// Get the hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node that can stand in subject position
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Node {
    /// Absolute resource name
    Resource(String),
    /// Hashed identity, rendered inside the local identifier namespace
    Hashed(NodeId),
}

impl Node {
    /// Create a resource node
    pub fn resource(iri: impl Into<String>) -> Self {
        Node::Resource(iri.into())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Resource(iri) => write!(f, "<{}>", iri),
            Node::Hashed(id) => write!(f, "_:{}", id),
        }
    }
}

/// A literal value, optionally language-tagged or datatyped
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    /// Lexical value
    pub value: String,
    /// Language tag (`xml:lang`)
    pub language: Option<String>,
    /// Datatype IRI; `None` means a plain string
    pub datatype: Option<String>,
}

impl Literal {
    /// Plain string literal
    pub fn simple(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }

    /// String literal with an optional language tag
    ///
    /// Empty tags are dropped.
    pub fn with_language(value: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            value: value.into(),
            language: language
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            datatype: None,
        }
    }

    /// Typed literal
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
            datatype: Some(datatype.into()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value)?;
        if let Some(lang) = &self.language {
            write!(f, "@{}", lang)?;
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{}>", dt)?;
        }
        Ok(())
    }
}

/// Object position term
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    /// Link to another node
    Node(Node),
    /// Literal value
    Literal(Literal),
}

impl Term {
    /// Get the node if this term is one
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Term::Node(node) => Some(node),
            Term::Literal(_) => None,
        }
    }

    /// Get the literal if this term is one
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            Term::Node(_) => None,
        }
    }
}

impl From<Node> for Term {
    fn from(node: Node) -> Self {
        Term::Node(node)
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Node(node) => node.fmt(f),
            Term::Literal(lit) => lit.fmt(f),
        }
    }
}
