//! Recursive boolean conditions and their evaluation
//!
//! A condition is a closed sum type: three boolean combinators and one leaf
//! whose flavour (equals, exists, ...) is a tag. Combinators without
//! children carry an optional leaf of their own, which is how the rule
//! grammar spells a bare condition without an explicit wrapper.

use crate::error::{MappingError, Result};
use crate::schema::SourceNamespaces;
use crate::selector::Selector;
use crate::xml::{XmlName, XmlNode};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Flavour of a leaf condition
///
/// All flavours share the same evaluation; they differ only in the tag
/// they are written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafKind {
    /// `<equals>`
    Equals,
    /// `<exists>`
    Exists,
    /// `<broader>`
    Broader,
    /// `<narrower>`
    Narrower,
    /// `<exact_match>`
    ExactMatch,
}

impl LeafKind {
    /// Element name in the rule grammar
    pub fn tag(&self) -> &'static str {
        match self {
            LeafKind::Equals => "equals",
            LeafKind::Exists => "exists",
            LeafKind::Broader => "broader",
            LeafKind::Narrower => "narrower",
            LeafKind::ExactMatch => "exact_match",
        }
    }

    /// Parse an element name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "equals" => Some(LeafKind::Equals),
            "exists" => Some(LeafKind::Exists),
            "broader" => Some(LeafKind::Broader),
            "narrower" => Some(LeafKind::Narrower),
            "exact_match" => Some(LeafKind::ExactMatch),
            _ => None,
        }
    }
}

/// What a leaf looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// A selector ending in `text()`, evaluated relative to the element
    Path(Selector),
    /// An attribute of the element itself; unprefixed names match any namespace
    Attribute {
        /// Name as written
        raw: String,
        /// Resolved name
        name: XmlName,
    },
}

impl Access {
    /// Compile an access string
    ///
    /// Anything ending in `text()` is a selector; anything else names an
    /// attribute (a leading `@` is accepted).
    pub fn parse(raw: &str, namespaces: &SourceNamespaces) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MappingError::selector(raw, "empty condition access"));
        }
        if raw.ends_with("text()") {
            return Ok(Access::Path(Selector::parse(raw, namespaces)?));
        }
        let name = namespaces.qualify(raw.trim_start_matches('@'))?;
        Ok(Access::Attribute {
            raw: raw.to_string(),
            name,
        })
    }

    /// Access string as written
    pub fn as_str(&self) -> &str {
        match self {
            Access::Path(selector) => selector.as_str(),
            Access::Attribute { raw, .. } => raw,
        }
    }

    fn values(&self, element: XmlNode<'_>) -> Vec<String> {
        match self {
            Access::Path(selector) => selector.values(element),
            Access::Attribute { name, .. } => element
                .attributes()
                .iter()
                .filter(|a| {
                    a.name.local == name.local
                        && (name.namespace.is_none() || a.name.namespace == name.namespace)
                })
                .map(|a| a.value.trim().to_string())
                .collect(),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Access {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Leaf condition: an access and the values it accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaf {
    /// Tag flavour
    pub kind: LeafKind,
    /// Where the tested value comes from
    pub access: Access,
    /// Accepted values; empty means "no restriction"
    pub values: BTreeSet<String>,
}

impl Leaf {
    /// Create a leaf
    pub fn new<I, S>(kind: LeafKind, access: Access, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            access,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Evaluate against an element
    pub fn holds(&self, element: XmlNode<'_>) -> bool {
        if self.values.is_empty() {
            return true;
        }
        self.access
            .values(element)
            .iter()
            .any(|v| self.values.contains(v))
    }
}

/// Children of a combinator, plus its own leaf for the childless form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Nested conditions
    pub children: Vec<Predicate>,
    /// Leaf evaluated when there are no children
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Leaf>,
}

impl Group {
    /// Group of nested conditions
    pub fn of(children: Vec<Predicate>) -> Self {
        Self {
            children,
            fallback: None,
        }
    }

    /// Childless group carrying its own leaf
    pub fn bare(leaf: Leaf) -> Self {
        Self {
            children: Vec::new(),
            fallback: Some(leaf),
        }
    }

    fn fallback_holds(&self, element: XmlNode<'_>) -> bool {
        self.fallback.as_ref().is_none_or(|leaf| leaf.holds(element))
    }
}

/// Boolean condition tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// All children hold
    And(Group),
    /// Any child holds
    Or(Group),
    /// No child holds
    Not(Group),
    /// Value test
    Leaf(Leaf),
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::always()
    }
}

impl Predicate {
    /// Condition that always holds
    pub fn always() -> Self {
        Predicate::Or(Group::default())
    }

    /// Check if this condition restricts nothing
    pub fn is_unconditional(&self) -> bool {
        match self {
            Predicate::And(g) | Predicate::Or(g) => g.children.is_empty() && g.fallback.is_none(),
            Predicate::Not(_) => false,
            Predicate::Leaf(leaf) => leaf.values.is_empty(),
        }
    }

    /// Evaluate against a possibly missing element
    ///
    /// A missing element never satisfies a condition.
    pub fn evaluate(&self, element: Option<XmlNode<'_>>) -> bool {
        element.is_some_and(|e| self.holds(e))
    }

    /// Evaluate against an element
    pub fn holds(&self, element: XmlNode<'_>) -> bool {
        match self {
            Predicate::Or(group) => {
                if group.children.is_empty() {
                    group.fallback_holds(element)
                } else {
                    group.children.iter().any(|c| c.holds(element))
                }
            }
            Predicate::And(group) => {
                if group.children.is_empty() {
                    group.fallback_holds(element)
                } else {
                    group.children.iter().all(|c| c.holds(element))
                }
            }
            Predicate::Not(group) => {
                if group.children.is_empty() {
                    !group.fallback_holds(element)
                } else {
                    !group.children.iter().any(|c| c.holds(element))
                }
            }
            Predicate::Leaf(leaf) => leaf.holds(element),
        }
    }

    /// Element name of the outermost node in the rule grammar
    pub fn tag(&self) -> &'static str {
        match self {
            Predicate::And(_) => "and",
            Predicate::Or(_) => "or",
            Predicate::Not(_) => "not",
            Predicate::Leaf(leaf) => leaf.kind.tag(),
        }
    }
}
