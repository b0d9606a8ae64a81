//! Namespace-aware XML tree for one record (or one rule document)
//!
//! Nodes live in an arena in document order, so a node's descendants are a
//! contiguous index range and parent links are plain indices. The tree is
//! built incrementally by [`TreeBuilder`], which lets the streaming processor
//! materialize exactly one record subtree at a time.

use crate::error::{MappingError, Result};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::fmt;

/// Namespace bound to the reserved `xml` prefix
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Expanded element or attribute name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XmlName {
    /// Namespace URI, if bound
    pub namespace: Option<String>,
    /// Local part
    pub local: String,
}

impl XmlName {
    /// Name without a namespace
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Namespaced name
    pub fn qualified(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// One attribute of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Expanded name
    pub name: XmlName,
    /// Unescaped value
    pub value: String,
}

#[derive(Debug)]
struct NodeData {
    name: XmlName,
    attributes: Vec<Attribute>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    last_descendant: usize,
}

/// Arena-backed element tree
#[derive(Debug, Default)]
pub struct XmlTree {
    nodes: Vec<NodeData>,
}

impl XmlTree {
    /// Root element, if the tree is not empty
    pub fn root(&self) -> Option<XmlNode<'_>> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(XmlNode {
                tree: self,
                index: 0,
            })
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree has no elements
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parse a complete document held in memory
    pub fn parse_str(input: &str) -> Result<XmlTree> {
        let mut reader = NsReader::from_reader(input.as_bytes());
        let mut builder = TreeBuilder::new();
        let mut buf = Vec::new();

        loop {
            let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
            let namespace = namespace_of(&resolved);
            match event {
                Event::Start(start) => {
                    let (name, attributes) = element_header(&reader, namespace, &start)?;
                    builder.start(name, attributes);
                }
                Event::Empty(start) => {
                    let (name, attributes) = element_header(&reader, namespace, &start)?;
                    builder.start(name, attributes);
                    builder.end();
                }
                Event::End(_) => {
                    builder.end();
                }
                Event::Text(text) => builder.text(&decode_text(&text)?),
                Event::CData(data) => builder.text(&String::from_utf8_lossy(&data)),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        builder.finish()
    }
}

/// Borrowed handle to one element of an [`XmlTree`]
#[derive(Clone, Copy)]
pub struct XmlNode<'a> {
    tree: &'a XmlTree,
    index: usize,
}

impl PartialEq for XmlNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.index == other.index
    }
}

impl Eq for XmlNode<'_> {}

impl fmt::Debug for XmlNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XmlNode({} @{})", self.name(), self.index)
    }
}

impl<'a> XmlNode<'a> {
    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.index]
    }

    fn at(&self, index: usize) -> XmlNode<'a> {
        XmlNode {
            tree: self.tree,
            index,
        }
    }

    /// Position in document order
    pub fn index(&self) -> usize {
        self.index
    }

    /// Root element of the tree this node belongs to
    pub fn root(&self) -> XmlNode<'a> {
        self.at(0)
    }

    /// Expanded name
    pub fn name(&self) -> &'a XmlName {
        &self.data().name
    }

    /// Local part of the name
    pub fn local_name(&self) -> &'a str {
        &self.data().name.local
    }

    /// Direct text content, trimmed
    pub fn text(&self) -> &'a str {
        self.data().text.trim()
    }

    /// All attributes in document order
    pub fn attributes(&self) -> &'a [Attribute] {
        &self.data().attributes
    }

    /// Attribute value by expanded name
    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&'a str> {
        self.attributes()
            .iter()
            .find(|a| a.name.local == local && a.name.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    /// `xml:lang` of this element or its nearest ancestor
    pub fn language(&self) -> Option<&'a str> {
        let mut current = Some(*self);
        while let Some(node) = current {
            if let Some(lang) = node.attribute(Some(XML_NS), "lang") {
                return Some(lang);
            }
            current = node.parent();
        }
        None
    }

    /// Parent element
    pub fn parent(&self) -> Option<XmlNode<'a>> {
        self.data().parent.map(|i| self.at(i))
    }

    /// Child elements in document order
    pub fn children(&self) -> impl Iterator<Item = XmlNode<'a>> + 'a {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&index| XmlNode { tree, index })
    }

    /// Check if the element has child elements
    pub fn has_children(&self) -> bool {
        !self.data().children.is_empty()
    }

    /// All descendants in document order, excluding self
    pub fn descendants(&self) -> impl Iterator<Item = XmlNode<'a>> + 'a {
        let tree = self.tree;
        (self.index + 1..=self.data().last_descendant).map(move |index| XmlNode { tree, index })
    }

    /// Self followed by all descendants
    pub fn descendants_or_self(&self) -> impl Iterator<Item = XmlNode<'a>> + 'a {
        let tree = self.tree;
        (self.index..=self.data().last_descendant).map(move |index| XmlNode { tree, index })
    }

    /// Position among the parent's children with the same local name
    pub fn sibling_position(&self) -> usize {
        let Some(parent) = self.parent() else {
            return 0;
        };
        let local = self.local_name();
        parent
            .children()
            .take_while(|c| c.index != self.index)
            .filter(|c| c.local_name() == local)
            .count()
    }

    /// Local names from the tree root down to this element, each step
    /// below the root qualified by its sibling position
    ///
    /// Unique per element within one tree, e.g. `lido/event[1]/eventActor[0]`.
    pub fn positional_path(&self) -> String {
        let mut steps = Vec::new();
        let mut current = Some(*self);
        while let Some(node) = current {
            current = node.parent();
            match current {
                Some(_) => steps.push(format!("{}[{}]", node.local_name(), node.sibling_position())),
                None => steps.push(node.local_name().to_string()),
            }
        }
        steps.reverse();
        steps.join("/")
    }
}

/// Incremental tree construction from parser events
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    stack: Vec<usize>,
}

impl TreeBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an element
    pub fn start(&mut self, name: XmlName, attributes: Vec<Attribute>) {
        let index = self.nodes.len();
        let parent = self.stack.last().copied();
        if let Some(parent) = parent {
            self.nodes[parent].children.push(index);
        }
        self.nodes.push(NodeData {
            name,
            attributes,
            text: String::new(),
            parent,
            children: Vec::new(),
            last_descendant: index,
        });
        self.stack.push(index);
    }

    /// Append character data to the open element
    ///
    /// Whitespace-only runs between elements are ignored.
    pub fn text(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        if let Some(&open) = self.stack.last() {
            self.nodes[open].text.push_str(text);
        }
    }

    /// Close the innermost open element
    ///
    /// Returns `true` once the root element has been closed.
    pub fn end(&mut self) -> bool {
        if let Some(closed) = self.stack.pop() {
            self.nodes[closed].last_descendant = self.nodes.len() - 1;
        }
        self.stack.is_empty() && !self.nodes.is_empty()
    }

    /// Number of currently open elements
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Finish construction
    pub fn finish(self) -> Result<XmlTree> {
        if self.nodes.is_empty() {
            return Err(MappingError::Xml("document has no root element".into()));
        }
        if !self.stack.is_empty() {
            return Err(MappingError::Xml("unexpected end of document".into()));
        }
        Ok(XmlTree { nodes: self.nodes })
    }
}

/// Owned namespace URI of a resolved name
pub fn namespace_of(resolved: &ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        ResolveResult::Unknown(prefix) if prefix.as_slice() == b"xml" => Some(XML_NS.to_string()),
        _ => None,
    }
}

/// Expanded name and attributes of a start tag
///
/// Namespace declarations are not reported as attributes.
pub fn element_header<R>(
    reader: &NsReader<R>,
    namespace: Option<String>,
    start: &BytesStart<'_>,
) -> Result<(XmlName, Vec<Attribute>)> {
    let name = XmlName {
        namespace,
        local: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
    };

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MappingError::Xml(e.to_string()))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let value = attr
            .unescape_value()
            .map_err(|e| MappingError::Xml(e.to_string()))?
            .into_owned();
        attributes.push(Attribute {
            name: XmlName {
                namespace: namespace_of(&resolved),
                local: String::from_utf8_lossy(local.as_ref()).into_owned(),
            },
            value,
        });
    }

    Ok((name, attributes))
}

/// Unescaped character data
pub fn decode_text(text: &BytesText<'_>) -> Result<String> {
    text.unescape()
        .map(|t| t.into_owned())
        .map_err(|e| MappingError::Xml(e.to_string()))
}
