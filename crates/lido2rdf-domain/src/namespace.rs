//! Namespace module - short-form name expansion
//!
//! A small prefix table bound into every produced graph. Expansion is
//! lenient: a name whose prefix is unknown is passed through unchanged so a
//! record with one odd rule still yields its other triples.

use std::collections::BTreeMap;

/// CIDOC-CRM target ontology
pub const CRM: &str = "http://www.cidoc-crm.org/cidoc-crm/";
/// Local content-addressed identifier space
pub const N4O: &str = "http://graph.nfdi4objects.net/id/";
/// RDF syntax vocabulary
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// RDF schema vocabulary
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
/// XML schema datatypes
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
/// GeoSPARQL plugin vocabulary
pub const GEO: &str = "http://www.ontotext.com/plugins/geosparql#";

/// Prefix under which hashed node identities are minted
pub const IDENTITY_PREFIX: &str = "n4o";

/// Outcome of expanding a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// Prefix matched, or the name was already absolute
    Iri(String),
    /// No prefix matched and the name is not absolute; passed through as is
    Opaque(String),
}

impl Expansion {
    /// Get the resulting name either way
    pub fn into_string(self) -> String {
        match self {
            Expansion::Iri(s) | Expansion::Opaque(s) => s,
        }
    }

    /// Check if the name could not be resolved
    pub fn is_opaque(&self) -> bool {
        matches!(self, Expansion::Opaque(_))
    }
}

/// Prefix → namespace URI table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceTable {
    prefixes: BTreeMap<String, String>,
}

impl NamespaceTable {
    /// Create an empty table
    pub fn empty() -> Self {
        Self {
            prefixes: BTreeMap::new(),
        }
    }

    /// Bind a prefix, replacing any previous binding
    pub fn bind(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), uri.into());
    }

    /// Bind a prefix only if it is not bound yet
    ///
    /// Returns `true` if the binding was added.
    pub fn bind_if_absent(&mut self, prefix: &str, uri: &str) -> bool {
        if self.prefixes.contains_key(prefix) {
            return false;
        }
        self.prefixes.insert(prefix.to_string(), uri.to_string());
        true
    }

    /// Look up a prefix
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Iterate bindings in prefix order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Check if the table has no bindings
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Namespace in which hashed nodes are minted
    pub fn identity_namespace(&self) -> &str {
        self.get(IDENTITY_PREFIX).unwrap_or(N4O)
    }

    /// Expand a short-form name
    ///
    /// # Examples
    ///
    /// ```
    /// use lido2rdf_domain::namespace::{Expansion, NamespaceTable};
    ///
    /// let table = NamespaceTable::default();
    /// assert_eq!(
    ///     table.expand("crm:E21_Person"),
    ///     Expansion::Iri("http://www.cidoc-crm.org/cidoc-crm/E21_Person".into())
    /// );
    /// assert!(table.expand("nope:Thing").is_opaque());
    /// ```
    pub fn expand(&self, name: &str) -> Expansion {
        let name = name.trim();
        if let Some((prefix, local)) = name.split_once(':') {
            if let Some(uri) = self.get(prefix) {
                return Expansion::Iri(format!("{}{}", uri, local));
            }
        }
        if is_absolute(name) {
            Expansion::Iri(name.to_string())
        } else {
            Expansion::Opaque(name.to_string())
        }
    }
}

impl Default for NamespaceTable {
    /// Target ontology, identifier space and literal-typing vocabularies
    fn default() -> Self {
        let mut table = Self::empty();
        table.bind("crm", CRM);
        table.bind(IDENTITY_PREFIX, N4O);
        table.bind("rdf", RDF);
        table.bind("rdfs", RDFS);
        table.bind("xsd", XSD);
        table.bind("geo", GEO);
        table
    }
}

/// Check if a name is an absolute resource name
///
/// Accepts hierarchical IRIs (`scheme://...`) and URNs.
pub fn is_absolute(name: &str) -> bool {
    if name.chars().any(char::is_whitespace) {
        return false;
    }
    match name.split_once(':') {
        Some((scheme, rest)) => {
            let mut chars = scheme.chars();
            let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            valid_scheme
                && (rest.starts_with("//") && rest.len() > 2
                    || scheme.eq_ignore_ascii_case("urn") && !rest.is_empty())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_table() {
        let table = NamespaceTable::default();
        assert_eq!(table.get("crm"), Some(CRM));
        assert_eq!(table.identity_namespace(), N4O);
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_expand_absolute_passthrough() {
        let table = NamespaceTable::default();
        assert_eq!(
            table.expand("http://example.org/x"),
            Expansion::Iri("http://example.org/x".into())
        );
    }

    #[test]
    fn test_expand_unknown_prefix_is_opaque() {
        let table = NamespaceTable::default();
        let exp = table.expand("foo:Bar");
        assert!(exp.is_opaque());
        assert_eq!(exp.into_string(), "foo:Bar");
    }

    #[test]
    fn test_bind_if_absent_keeps_existing() {
        let mut table = NamespaceTable::default();
        assert!(!table.bind_if_absent("crm", "http://other.org/"));
        assert_eq!(table.get("crm"), Some(CRM));
        assert!(table.bind_if_absent("ex", "http://example.org/"));
        assert_eq!(table.expand("ex:a").into_string(), "http://example.org/a");
    }

    #[test]
    fn test_is_absolute() {
        assert!(is_absolute("http://d-nb.info/gnd/118640445"));
        assert!(is_absolute("https://example.org"));
        assert!(is_absolute("urn:nbn:de:1234"));
        assert!(!is_absolute("crm:E21_Person"));
        assert!(!is_absolute("DE-Mb112/lido-obj00154983"));
        assert!(!is_absolute("http://has space"));
        assert!(!is_absolute(""));
    }

    proptest! {
        #[test]
        fn prop_expansion_is_stable(local in "[A-Za-z0-9_]{1,24}") {
            let table = NamespaceTable::default();
            let iri = table.expand(&format!("crm:{}", local)).into_string();
            prop_assert_eq!(&iri, &format!("{}{}", CRM, local));
            // An expanded name expands to itself
            prop_assert_eq!(table.expand(&iri), Expansion::Iri(iri.clone()));
        }
    }
}
