//! Location selectors over a record tree
//!
//! A deliberately small XPath subset: child and descendant steps, name tests
//! with namespace prefixes, a handful of bracket filters, and `text()` /
//! `@attr` terminals. Prefixes are resolved when the selector is compiled,
//! so evaluation needs nothing but the tree.

use crate::error::{MappingError, Result};
use crate::schema::SourceNamespaces;
use crate::xml::XmlNode;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfNode,
    Parent,
}

/// Name test; `None` parts match anything
#[derive(Debug, Clone, PartialEq, Eq)]
struct NameTest {
    namespace: Option<String>,
    local: Option<String>,
}

impl NameTest {
    fn any() -> Self {
        Self {
            namespace: None,
            local: None,
        }
    }

    fn parse(raw: &str, namespaces: &SourceNamespaces, path: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MappingError::selector(path, "empty name"));
        }
        if raw == "*" {
            return Ok(Self::any());
        }
        let (namespace, local) = match raw.split_once(':') {
            Some((prefix, local)) => {
                let uri = namespaces
                    .resolve(prefix)
                    .ok_or_else(|| MappingError::selector(path, format!("unknown prefix '{}'", prefix)))?;
                (Some(uri.to_string()), local)
            }
            None => (None, raw),
        };
        if local.is_empty() || local.contains(|c: char| c.is_whitespace() || "[]()'\"=@/".contains(c)) {
            return Err(MappingError::selector(path, format!("invalid name '{}'", raw)));
        }
        let local = if local == "*" { None } else { Some(local.to_string()) };
        Ok(Self { namespace, local })
    }

    fn matches_element(&self, node: XmlNode<'_>) -> bool {
        let name = node.name();
        self.local.as_deref().is_none_or(|l| l == name.local)
            && self
                .namespace
                .as_deref()
                .is_none_or(|ns| name.namespace.as_deref() == Some(ns))
    }

    fn attribute_values<'a>(&self, node: XmlNode<'a>) -> impl Iterator<Item = &'a str> + use<'a, '_> {
        node.attributes()
            .iter()
            .filter(move |a| {
                self.local.as_deref().is_none_or(|l| l == a.name.local)
                    && self
                        .namespace
                        .as_deref()
                        .is_none_or(|ns| a.name.namespace.as_deref() == Some(ns))
            })
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    Position(usize),
    HasAttribute(NameTest),
    AttributeEquals(NameTest, String),
    HasChild(NameTest),
    ChildEquals(NameTest, String),
    TextEquals(String),
}

impl Filter {
    fn parse(raw: &str, namespaces: &SourceNamespaces, path: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Ok(position) = raw.parse::<usize>() {
            if position == 0 {
                return Err(MappingError::selector(path, "positions start at 1"));
            }
            return Ok(Filter::Position(position));
        }
        let (lhs, rhs) = match raw.split_once('=') {
            Some((lhs, rhs)) => (lhs.trim(), Some(unquote(rhs.trim(), path)?)),
            None => (raw, None),
        };
        if let Some(attr) = lhs.strip_prefix('@') {
            let test = NameTest::parse(attr, namespaces, path)?;
            return Ok(match rhs {
                Some(value) => Filter::AttributeEquals(test, value),
                None => Filter::HasAttribute(test),
            });
        }
        if lhs == "text()" {
            return rhs
                .map(Filter::TextEquals)
                .ok_or_else(|| MappingError::selector(path, "text() filter needs a value"));
        }
        let test = NameTest::parse(lhs, namespaces, path)?;
        Ok(match rhs {
            Some(value) => Filter::ChildEquals(test, value),
            None => Filter::HasChild(test),
        })
    }

    fn keep(&self, node: XmlNode<'_>) -> bool {
        match self {
            Filter::Position(_) => true,
            Filter::HasAttribute(test) => test.attribute_values(node).next().is_some(),
            Filter::AttributeEquals(test, value) => test.attribute_values(node).any(|v| v == value),
            Filter::HasChild(test) => node.children().any(|c| test.matches_element(c)),
            Filter::ChildEquals(test, value) => node
                .children()
                .any(|c| test.matches_element(c) && c.text() == value),
            Filter::TextEquals(value) => node.text() == value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    filters: Vec<Filter>,
}

impl Step {
    fn apply<'a>(&self, context: XmlNode<'a>, out: &mut Vec<XmlNode<'a>>) {
        let candidates: Vec<XmlNode<'a>> = match self.axis {
            Axis::Child => context.children().collect(),
            Axis::Descendant => context.descendants().collect(),
            Axis::DescendantOrSelf => context.descendants_or_self().collect(),
            Axis::SelfNode => vec![context],
            Axis::Parent => context.parent().into_iter().collect(),
        };
        let mut matched: Vec<XmlNode<'a>> = candidates
            .into_iter()
            .filter(|n| self.test.matches_element(*n))
            .collect();
        for filter in &self.filters {
            matched = match filter {
                Filter::Position(p) => matched.get(p - 1).copied().into_iter().collect(),
                other => matched.into_iter().filter(|n| other.keep(*n)).collect(),
            };
        }
        out.extend(matched);
    }
}

/// What a selector yields at its end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The selected elements themselves
    Elements,
    /// Direct text of the selected elements (`text()`)
    Text,
    /// Attribute values (`@name`)
    Attribute(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Root,
    Context,
}

/// Compiled location selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    raw: String,
    anchor: Anchor,
    steps: Vec<Step>,
    target: Target,
    attribute: Option<NameTest>,
}

impl Selector {
    /// Compile a selector, resolving prefixes against `namespaces`
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Selector`] for empty paths, unknown prefixes
    /// and unbalanced brackets.
    pub fn parse(raw: &str, namespaces: &SourceNamespaces) -> Result<Self> {
        let path = raw.trim();
        if path.is_empty() {
            return Err(MappingError::selector(raw, "empty selector"));
        }

        let (anchor, first_axis, rest) = if let Some(rest) = path.strip_prefix("//") {
            (Anchor::Root, Axis::DescendantOrSelf, rest)
        } else if let Some(rest) = path.strip_prefix('/') {
            (Anchor::Root, Axis::SelfNode, rest)
        } else if let Some(rest) = path.strip_prefix(".//") {
            (Anchor::Context, Axis::Descendant, rest)
        } else if let Some(rest) = path.strip_prefix("./") {
            (Anchor::Context, Axis::Child, rest)
        } else {
            (Anchor::Context, Axis::DescendantOrSelf, path)
        };

        let segments = split_segments(rest, path)?;
        let mut steps = Vec::new();
        let mut target = Target::Elements;
        let mut attribute = None;
        let mut axis = first_axis;
        let last = segments.len().saturating_sub(1);

        for (i, segment) in segments.iter().enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                if i == 0 || i == last {
                    return Err(MappingError::selector(path, "empty step"));
                }
                axis = Axis::Descendant;
                continue;
            }
            if i == last && segment == "text()" {
                target = Target::Text;
                continue;
            }
            if let Some(name) = segment.strip_prefix('@') {
                if i != last {
                    return Err(MappingError::selector(path, "attribute step must be last"));
                }
                attribute = Some(NameTest::parse(name, namespaces, path)?);
                target = Target::Attribute(name.trim().to_string());
                continue;
            }
            let step = match segment {
                "." => Step {
                    axis: if axis == Axis::DescendantOrSelf { Axis::SelfNode } else { axis },
                    test: NameTest::any(),
                    filters: Vec::new(),
                },
                ".." => Step {
                    axis: Axis::Parent,
                    test: NameTest::any(),
                    filters: Vec::new(),
                },
                _ => parse_step(segment, axis, namespaces, path)?,
            };
            steps.push(step);
            axis = Axis::Child;
        }

        Ok(Self {
            raw: path.to_string(),
            anchor,
            steps,
            target,
            attribute,
        })
    }

    /// Selector text as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Terminal kind
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Check if the selector ends in `text()`
    pub fn is_text(&self) -> bool {
        self.target == Target::Text
    }

    /// Check if the selector is anchored at the record root
    pub fn is_rooted(&self) -> bool {
        self.anchor == Anchor::Root
    }

    /// Selected elements in document order, without duplicates
    pub fn select<'a>(&self, context: XmlNode<'a>) -> Vec<XmlNode<'a>> {
        let start = match self.anchor {
            Anchor::Root => context.root(),
            Anchor::Context => context,
        };
        let mut current = vec![start];
        for step in &self.steps {
            let mut next = Vec::new();
            for node in &current {
                step.apply(*node, &mut next);
            }
            next.sort_by_key(|n| n.index());
            next.dedup();
            current = next;
        }
        current
    }

    /// Non-empty string values at the selector's terminal
    pub fn values(&self, context: XmlNode<'_>) -> Vec<String> {
        let nodes = self.select(context);
        match (&self.target, &self.attribute) {
            (Target::Attribute(_), Some(test)) => nodes
                .iter()
                .flat_map(|n| test.attribute_values(*n))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
            _ => nodes
                .iter()
                .map(|n| n.text())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

fn parse_step(segment: &str, axis: Axis, namespaces: &SourceNamespaces, path: &str) -> Result<Step> {
    let (name, mut rest) = match segment.find('[') {
        Some(i) => (&segment[..i], &segment[i..]),
        None => (segment, ""),
    };
    let test = NameTest::parse(name, namespaces, path)?;
    let mut filters = Vec::new();
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .ok_or_else(|| MappingError::selector(path, "unexpected text after filter"))?;
        let close = closing_bracket(inner)
            .ok_or_else(|| MappingError::selector(path, "unbalanced '['"))?;
        filters.push(Filter::parse(&inner[..close], namespaces, path)?);
        rest = inner[close + 1..].trim_start();
    }
    Ok(Step { axis, test, filters })
}

/// Index of the `]` closing a filter, skipping quoted text
fn closing_bracket(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split on `/` outside brackets and quotes
fn split_segments<'a>(s: &'a str, path: &str) -> Result<Vec<&'a str>> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| MappingError::selector(path, "unbalanced ']'"))?;
            }
            (None, '/') if depth == 0 => {
                segments.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return Err(MappingError::selector(path, "unterminated filter"));
    }
    segments.push(&s[start..]);
    Ok(segments)
}

fn unquote(value: &str, path: &str) -> Result<String> {
    let quoted = (value.starts_with('\'') && value.ends_with('\''))
        || (value.starts_with('"') && value.ends_with('"'));
    if quoted && value.len() >= 2 {
        Ok(value[1..value.len() - 1].to_string())
    } else {
        Err(MappingError::selector(path, "filter value must be quoted"))
    }
}
