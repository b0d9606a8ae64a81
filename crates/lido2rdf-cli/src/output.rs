//! Output formatting for the CLI.
//!
//! RDF graphs are written with `oxrdfio` (Turtle, N-Triples, RDF/XML) or as
//! JSON-LD built with `serde_json`. Rule listings and status lines go
//! through [`Formatter`].

use crate::cli::STDIO;
use crate::error::{CliError, Result};
use colored::*;
use lido2rdf_domain::{Literal, NamespaceTable, Node, Term, Triple, TripleSet, RDF_TYPE};
use lido2rdf_harvest::HarvestReport;
use lido2rdf_mapping::RuleSet;
use oxrdfio::{RdfFormat, RdfSerializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};
use tracing::warn;

/// Supported RDF output syntaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfSyntax {
    /// Turtle
    Turtle,
    /// N-Triples
    NTriples,
    /// JSON-LD
    JsonLd,
    /// RDF/XML
    RdfXml,
}

impl RdfSyntax {
    /// Parse a syntax name or file suffix
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ttl" | "turtle" => Ok(RdfSyntax::Turtle),
            "nt" | "ntriples" | "n-triples" => Ok(RdfSyntax::NTriples),
            "json" | "jsonld" | "json-ld" => Ok(RdfSyntax::JsonLd),
            "xml" | "rdf" | "rdfxml" | "rdf/xml" => Ok(RdfSyntax::RdfXml),
            other => Err(CliError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Syntax implied by a path's suffix
    pub fn from_suffix(path: &str) -> Option<Self> {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| Self::parse(ext).ok())
    }

    /// Pick the syntax for an output destination
    ///
    /// An explicit name must be valid. Otherwise the destination suffix is
    /// used, and stdout or an unknown suffix fall back to `default`.
    pub fn resolve(explicit: Option<&str>, destination: &str, default: RdfSyntax) -> Result<Self> {
        if let Some(name) = explicit {
            return Self::parse(name);
        }
        if destination != STDIO {
            if let Some(syntax) = Self::from_suffix(destination) {
                return Ok(syntax);
            }
        }
        Ok(default)
    }

    /// File extension for page files
    pub fn extension(&self) -> &'static str {
        match self {
            RdfSyntax::Turtle => "ttl",
            RdfSyntax::NTriples => "nt",
            RdfSyntax::JsonLd => "json",
            RdfSyntax::RdfXml => "xml",
        }
    }
}

/// Serialize a graph, returning the writer
pub fn write_graph<W: Write>(
    graph: &TripleSet,
    namespaces: &NamespaceTable,
    syntax: RdfSyntax,
    mut writer: W,
) -> Result<W> {
    let format = match syntax {
        RdfSyntax::JsonLd => {
            serde_json::to_writer_pretty(&mut writer, &json_ld(graph, namespaces))?;
            writeln!(writer)?;
            return Ok(writer);
        }
        RdfSyntax::Turtle => RdfFormat::Turtle,
        RdfSyntax::NTriples => RdfFormat::NTriples,
        RdfSyntax::RdfXml => RdfFormat::RdfXml,
    };

    let mut serializer = RdfSerializer::from_format(format);
    if syntax != RdfSyntax::NTriples {
        for (prefix, uri) in namespaces.iter() {
            serializer = serializer
                .with_prefix(prefix, uri)
                .map_err(|e| CliError::Config(format!("Invalid namespace {} = {}: {}", prefix, uri, e)))?;
        }
    }

    let mut out = serializer.for_writer(writer);
    for triple in graph.iter() {
        match to_oxrdf(triple, namespaces) {
            Ok(triple) => out.serialize_triple(&triple)?,
            Err(reason) => warn!(triple = %triple, reason = %reason, "skipping triple"),
        }
    }
    Ok(out.finish()?)
}

/// IRI of a node; hashed nodes live in the identity namespace
pub fn node_iri(node: &Node, namespaces: &NamespaceTable) -> String {
    match node {
        Node::Resource(iri) => iri.clone(),
        Node::Hashed(id) => format!("{}{}", namespaces.identity_namespace(), id.as_str()),
    }
}

fn named_node(iri: String) -> std::result::Result<oxrdf::NamedNode, String> {
    oxrdf::NamedNode::new(iri.as_str()).map_err(|e| format!("invalid IRI <{}>: {}", iri, e))
}

fn to_oxrdf(triple: &Triple, namespaces: &NamespaceTable) -> std::result::Result<oxrdf::Triple, String> {
    let subject = named_node(node_iri(&triple.subject, namespaces))?;
    let predicate = named_node(triple.predicate.clone())?;
    let object: oxrdf::Term = match &triple.object {
        Term::Node(node) => named_node(node_iri(node, namespaces))?.into(),
        Term::Literal(literal) => to_oxrdf_literal(literal).into(),
    };
    Ok(oxrdf::Triple::new(subject, predicate, object))
}

/// Malformed tags and datatypes degrade to a plain literal
fn to_oxrdf_literal(literal: &Literal) -> oxrdf::Literal {
    if let Some(lang) = &literal.language {
        if let Ok(tagged) = oxrdf::Literal::new_language_tagged_literal(literal.value.as_str(), lang.as_str()) {
            return tagged;
        }
        tracing::debug!(language = %lang, "dropping malformed language tag");
    } else if let Some(datatype) = &literal.datatype {
        if let Ok(datatype) = oxrdf::NamedNode::new(datatype.as_str()) {
            return oxrdf::Literal::new_typed_literal(literal.value.as_str(), datatype);
        }
        tracing::debug!(datatype = %datatype, "dropping malformed datatype");
    }
    oxrdf::Literal::new_simple_literal(literal.value.as_str())
}

/// Compact an IRI with the longest matching namespace
fn compact(iri: &str, namespaces: &NamespaceTable) -> String {
    namespaces
        .iter()
        .filter(|(_, uri)| !uri.is_empty() && iri.starts_with(uri) && iri.len() > uri.len())
        .max_by_key(|(_, uri)| uri.len())
        .map(|(prefix, uri)| format!("{}:{}", prefix, &iri[uri.len()..]))
        .unwrap_or_else(|| iri.to_string())
}

fn push_value(object: &mut Map<String, Value>, key: String, value: Value) {
    if let Value::Array(values) = object.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
        values.push(value);
    }
}

/// JSON-LD document with one node object per subject
pub fn json_ld(graph: &TripleSet, namespaces: &NamespaceTable) -> Value {
    let context: Map<String, Value> = namespaces
        .iter()
        .map(|(prefix, uri)| (prefix.to_string(), Value::String(uri.to_string())))
        .collect();

    let mut nodes: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    for triple in graph.iter() {
        let id = compact(&node_iri(&triple.subject, namespaces), namespaces);
        let node = nodes.entry(id.clone()).or_insert_with(|| {
            let mut node = Map::new();
            node.insert("@id".to_string(), Value::String(id));
            node
        });

        match &triple.object {
            Term::Node(object) if triple.predicate == RDF_TYPE => {
                let class = compact(&node_iri(object, namespaces), namespaces);
                push_value(node, "@type".to_string(), Value::String(class));
            }
            Term::Node(object) => {
                let reference = json!({ "@id": compact(&node_iri(object, namespaces), namespaces) });
                push_value(node, compact(&triple.predicate, namespaces), reference);
            }
            Term::Literal(literal) => {
                let mut value = Map::new();
                value.insert("@value".to_string(), Value::String(literal.value.clone()));
                if let Some(lang) = &literal.language {
                    value.insert("@language".to_string(), Value::String(lang.clone()));
                } else if let Some(datatype) = &literal.datatype {
                    value.insert("@type".to_string(), Value::String(compact(datatype, namespaces)));
                }
                push_value(node, compact(&triple.predicate, namespaces), Value::Object(value));
            }
        }
    }

    json!({
        "@context": context,
        "@graph": nodes.into_values().map(Value::Object).collect::<Vec<_>>(),
    })
}

/// Output formatter.
pub struct Formatter {
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    /// Format the loaded mappings as a table.
    pub fn format_rules(&self, rules: &RuleSet) -> String {
        if rules.is_empty() {
            return self.colorize("No mappings found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["#", "Subject", "Type", "Properties", "Condition"]);

        for (index, mapping) in rules.mappings.iter().enumerate() {
            let condition = if mapping.condition.is_unconditional() { "-" } else { "yes" };
            builder.push_record([
                (index + 1).to_string(),
                mapping.subject.path.to_string(),
                mapping.subject.entity.clone(),
                mapping.properties.len().to_string(),
                condition.to_string(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        format!(
            "{}\n{}",
            table,
            self.info(&format!(
                "{} mapping(s), {} propert(ies)",
                rules.len(),
                rules.property_count()
            ))
        )
    }

    /// Format the loaded mappings as JSON.
    pub fn format_rules_json(&self, rules: &RuleSet) -> Result<String> {
        Ok(serde_json::to_string_pretty(rules)?)
    }

    /// Format the closing line of a harvest.
    pub fn harvest_summary(&self, report: &HarvestReport) -> String {
        let token = report
            .resume_token
            .as_deref()
            .or(report.last_token.as_deref())
            .unwrap_or("none");
        let message = format!(
            "{} page(s), {} record(s), {} triple(s), last token: {}",
            report.pages, report.records, report.triples, token
        );
        if report.cancelled {
            self.warning(&format!("Cancelled after {}", message))
        } else {
            self.success(&format!("Harvested {}", message))
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
