//! Rule document serialization
//!
//! Writes a [`RuleSet`] back to the rule grammar the loader reads, so a
//! loaded document can be normalized and re-read without loss.

use crate::error::{MappingError, Result};
use crate::predicate::{Group, Leaf, Predicate};
use crate::rules::{ExP, Mapping, PropertyObject, RuleSet};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

impl RuleSet {
    /// Serialize the rule set as a rule document
    pub fn to_x3ml(&self) -> Result<String> {
        let mut out = X3mlWriter::new();
        out.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        out.start("x3ml", &[("version", "1.0"), ("source_type", "xpath")])?;

        if !self.namespaces.is_empty() {
            out.start("namespaces", &[])?;
            for (prefix, uri) in self.namespace_bindings() {
                out.empty("namespace", &[("prefix", prefix), ("uri", uri)])?;
            }
            out.end("namespaces")?;
        }

        out.start("mappings", &[])?;
        for mapping in &self.mappings {
            out.mapping(mapping)?;
        }
        out.end("mappings")?;
        out.end("x3ml")?;
        out.finish()
    }
}

struct X3mlWriter {
    writer: Writer<Vec<u8>>,
}

impl X3mlWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| MappingError::Write(e.to_string()))
    }

    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| MappingError::Write(e.to_string()))
    }

    fn open(name: &str, attrs: &[(&str, &str)]) -> BytesStart<'static> {
        let mut element = BytesStart::new(name.to_string());
        for &(key, value) in attrs {
            element.push_attribute((key, value));
        }
        element
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.emit(Event::Start(Self::open(name, attrs)))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.emit(Event::Empty(Self::open(name, attrs)))
    }

    fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attrs)?;
        if !text.is_empty() {
            self.emit(Event::Text(BytesText::new(text)))?;
        }
        self.end(name)
    }

    fn mapping(&mut self, mapping: &Mapping) -> Result<()> {
        self.start("mapping", &[])?;
        self.start("domain", &[])?;
        self.text_element("source_node", &[], mapping.subject.path.as_str())?;
        self.start("target_node", &[])?;
        self.entity(&mapping.subject)?;
        self.condition(&mapping.condition)?;
        self.end("target_node")?;
        self.end("domain")?;
        for po in &mapping.properties {
            self.link(po)?;
        }
        self.end("mapping")
    }

    fn entity(&mut self, exp: &ExP) -> Result<()> {
        match exp.variable.as_deref() {
            Some(variable) => self.start("entity", &[("variable", variable)])?,
            None => self.start("entity", &[])?,
        }
        self.text_element("type", &[], &exp.entity)?;
        if let Some(generator) = exp.generator.as_deref() {
            self.empty("instance_generator", &[("name", generator)])?;
        }
        self.end("entity")
    }

    fn link(&mut self, po: &PropertyObject) -> Result<()> {
        self.start("link", &[])?;
        self.start("path", &[])?;
        self.start("source_relation", &[])?;
        self.text_element("relation", &[], po.predicate.path.as_str())?;
        self.end("source_relation")?;
        self.start("target_relation", &[])?;
        self.condition(&po.condition)?;
        self.text_element("relationship", &[], &po.predicate.entity)?;
        self.end("target_relation")?;
        self.end("path")?;
        self.start("range", &[])?;
        self.text_element("source_node", &[], po.object.path.as_str())?;
        self.start("target_node", &[])?;
        self.entity(&po.object)?;
        self.end("target_node")?;
        self.end("range")?;
        self.end("link")
    }

    /// Write `<if>` unless the condition is the implicit "always"
    fn condition(&mut self, predicate: &Predicate) -> Result<()> {
        if *predicate == Predicate::always() {
            return Ok(());
        }
        self.if_block(predicate)
    }

    fn if_block(&mut self, predicate: &Predicate) -> Result<()> {
        self.start("if", &[])?;
        self.operator(predicate)?;
        self.end("if")
    }

    fn operator(&mut self, predicate: &Predicate) -> Result<()> {
        match predicate {
            Predicate::Or(group) => self.group("or", group, true),
            Predicate::And(group) => self.group("and", group, false),
            Predicate::Not(group) => self.group("not", group, false),
            Predicate::Leaf(leaf) if leaf.values.len() > 1 => {
                // One value per `equals` under an `or`, the form the loader merges back.
                self.start("or", &[])?;
                self.split_leaf(leaf)?;
                self.end("or")
            }
            Predicate::Leaf(leaf) => self.leaf(leaf.kind.tag(), leaf),
        }
    }

    fn group(&mut self, tag: &str, group: &Group, split: bool) -> Result<()> {
        if group.children.is_empty() {
            return match &group.fallback {
                Some(leaf) => self.leaf(tag, leaf),
                None => self.empty(tag, &[]),
            };
        }
        self.start(tag, &[])?;
        for child in &group.children {
            match child {
                Predicate::Leaf(leaf) if split && leaf.values.len() > 1 => self.split_leaf(leaf)?,
                other => self.if_block(other)?,
            }
        }
        self.end(tag)
    }

    fn split_leaf(&mut self, leaf: &Leaf) -> Result<()> {
        for value in &leaf.values {
            self.start("if", &[])?;
            self.text_element(leaf.kind.tag(), &[("value", value)], leaf.access.as_str())?;
            self.end("if")?;
        }
        Ok(())
    }

    fn leaf(&mut self, tag: &str, leaf: &Leaf) -> Result<()> {
        match leaf.values.iter().next() {
            Some(value) => self.text_element(tag, &[("value", value)], leaf.access.as_str()),
            None => self.text_element(tag, &[], leaf.access.as_str()),
        }
    }
}
