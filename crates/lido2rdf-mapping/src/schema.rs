//! Source record schema: namespaces, record element and identity table

use crate::error::{MappingError, Result};
use crate::selector::Selector;
use crate::xml::{XmlName, XmlNode, XML_NS};
use std::collections::{BTreeMap, HashMap};

/// LIDO record schema
pub const LIDO_NS: &str = "http://www.lido-schema.org";
/// GML geometry
pub const GML_NS: &str = "http://www.opengis.net/gml";
/// SKOS concepts
pub const SKOS_NS: &str = "http://www.w3.org/2004/02/skos/core#";
/// OAI-PMH envelope
pub const OAI_NS: &str = "http://www.openarchives.org/OAI/2.0/";

/// Prefix table for source selectors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceNamespaces {
    prefixes: BTreeMap<String, String>,
}

impl SourceNamespaces {
    /// Empty table (only `xml` resolves)
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes used by LIDO documents and their OAI-PMH envelope
    pub fn lido() -> Self {
        let mut ns = Self::new();
        ns.bind("lido", LIDO_NS);
        ns.bind("gml", GML_NS);
        ns.bind("skos", SKOS_NS);
        ns.bind("oai", OAI_NS);
        ns
    }

    /// Bind a prefix, replacing any previous binding
    pub fn bind(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), uri.into());
    }

    /// Bind a prefix only if it is not bound yet
    pub fn bind_if_absent(&mut self, prefix: &str, uri: &str) {
        self.prefixes
            .entry(prefix.to_string())
            .or_insert_with(|| uri.to_string());
    }

    /// Resolve a prefix to its namespace URI
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        match prefix {
            "xml" => Some(XML_NS),
            _ => self.prefixes.get(prefix).map(String::as_str),
        }
    }

    /// Iterate bindings in prefix order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Turn `prefix:local` into an expanded name
    pub fn qualify(&self, name: &str) -> Result<XmlName> {
        match name.trim().split_once(':') {
            Some((prefix, local)) => {
                let uri = self
                    .resolve(prefix)
                    .ok_or_else(|| MappingError::selector(name, format!("unknown prefix '{}'", prefix)))?;
                Ok(XmlName::qualified(uri, local))
            }
            None => Ok(XmlName::local(name.trim())),
        }
    }
}

/// Where an element keeps its explicit identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdLocation {
    /// The element's own text is its identifier
    OwnText,
    /// Text of the selected child
    Child(Selector),
}

impl IdLocation {
    fn values(&self, node: XmlNode<'_>) -> Vec<String> {
        match self {
            IdLocation::OwnText => {
                let text = node.text();
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text.to_string()]
                }
            }
            IdLocation::Child(selector) => selector.values(node),
        }
    }
}

/// Shape of the records being converted
///
/// Holds the record element name, the selector for the record identifier
/// and the per-tag table of identifier locations.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    namespaces: SourceNamespaces,
    record_element: XmlName,
    record_id: Option<Selector>,
    identifiers: HashMap<XmlName, Vec<IdLocation>>,
}

impl RecordSchema {
    /// Schema for an arbitrary record element
    ///
    /// `record_element` and `record_id` use prefixes from `namespaces`.
    pub fn new(
        namespaces: SourceNamespaces,
        record_element: &str,
        record_id: Option<&str>,
    ) -> Result<Self> {
        let record_element = namespaces.qualify(record_element)?;
        let record_id = record_id
            .map(|path| Selector::parse(path, &namespaces))
            .transpose()?;
        Ok(Self {
            namespaces,
            record_element,
            record_id,
            identifiers: HashMap::new(),
        })
    }

    /// LIDO records with their identifier table
    pub fn lido() -> Self {
        let mut schema = Self {
            namespaces: SourceNamespaces::lido(),
            record_element: XmlName::qualified(LIDO_NS, "lido"),
            record_id: None,
            identifiers: HashMap::new(),
        };
        // Selectors below are static and known to compile.
        if let Ok(selector) = Selector::parse("./lido:lidoRecID/text()", &schema.namespaces) {
            schema.record_id = Some(selector);
        }
        for (tag, locations) in LIDO_IDENTIFIERS {
            if let Err(e) = schema.add_identifier(tag, locations) {
                tracing::error!(tag, error = %e, "invalid built-in identifier entry");
            }
        }
        schema
    }

    /// Register where elements named `tag` keep their identifier
    ///
    /// An empty location or `.` means the element's own text.
    pub fn add_identifier(&mut self, tag: &str, locations: &[&str]) -> Result<()> {
        let name = self.namespaces.qualify(tag)?;
        let mut compiled = Vec::with_capacity(locations.len());
        for location in locations {
            let location = location.trim();
            if location.is_empty() || location == "." {
                compiled.push(IdLocation::OwnText);
            } else {
                let child = format!("./{}/text()", location);
                compiled.push(IdLocation::Child(Selector::parse(&child, &self.namespaces)?));
            }
        }
        self.identifiers.insert(name, compiled);
        Ok(())
    }

    /// Builder-style [`RecordSchema::add_identifier`]
    pub fn with_identifier(mut self, tag: &str, locations: &[&str]) -> Result<Self> {
        self.add_identifier(tag, locations)?;
        Ok(self)
    }

    /// Replace the record element and identifier selector
    ///
    /// The identity table is kept.
    pub fn with_record(mut self, record_element: &str, record_id: Option<&str>) -> Result<Self> {
        self.record_element = self.namespaces.qualify(record_element)?;
        self.record_id = record_id
            .map(|path| Selector::parse(path, &self.namespaces))
            .transpose()?;
        Ok(self)
    }

    /// Source namespace prefixes
    pub fn namespaces(&self) -> &SourceNamespaces {
        &self.namespaces
    }

    /// Add prefixes declared elsewhere (e.g. in a rule document)
    pub fn extend_namespaces<'a, I>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (prefix, uri) in bindings {
            self.namespaces.bind_if_absent(prefix, uri);
        }
    }

    /// Check if an element is a record element
    pub fn is_record(&self, name: &XmlName) -> bool {
        name.local == self.record_element.local
            && (self.record_element.namespace.is_none()
                || name.namespace == self.record_element.namespace)
    }

    /// Record element name
    pub fn record_element(&self) -> &XmlName {
        &self.record_element
    }

    /// Record identifier: all identifier texts joined by a space
    pub fn record_id(&self, record: XmlNode<'_>) -> Option<String> {
        let ids = self.record_id.as_ref()?.values(record);
        if ids.is_empty() {
            None
        } else {
            Some(ids.join(" "))
        }
    }

    /// Identifier locations for an element, if its tag is in the table
    pub fn identifier_locations(&self, name: &XmlName) -> Option<&[IdLocation]> {
        self.identifiers
            .get(name)
            .or_else(|| self.identifiers.get(&XmlName::local(name.local.clone())))
            .map(Vec::as_slice)
    }

    /// First non-empty explicit identifier of an element
    pub fn explicit_id(&self, node: XmlNode<'_>) -> Option<String> {
        self.identifier_locations(node.name())?
            .iter()
            .flat_map(|location| location.values(node))
            .next()
    }
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self::lido()
    }
}

const LIDO_IDENTIFIERS: &[(&str, &[&str])] = &[
    ("lido:lido", &["lido:lidoRecID"]),
    ("lido:event", &["lido:eventID"]),
    ("lido:eventType", &["lido:conceptID", "lido:term"]),
    ("lido:actor", &["lido:actorID"]),
    ("lido:category", &["lido:conceptID"]),
    ("lido:subjectConcept", &["lido:conceptID"]),
    ("lido:recordType", &["lido:conceptID"]),
    ("lido:objectWorkType", &["lido:conceptID"]),
    ("lido:repositorySet", &["lido:workID"]),
    ("lido:place", &["lido:placeID"]),
    ("lido:namePlaceSet", &["lido:appellationValue"]),
    ("lido:recordWrap", &["lido:recordID"]),
    ("lido:object", &["lido:objectID"]),
    ("lido:rightsHolder", &["lido:legalBodyID"]),
    ("lido:repositoryName", &["lido:legalBodyID"]),
    ("lido:resourceSet", &["lido:resourceID"]),
    ("lido:measurementType", &[""]),
    ("lido:appellationValue", &[""]),
];
