//! Per-record conversion facade
//!
//! Ties schema, rules and namespace table together so callers only hand in
//! record trees and a sink.

use crate::builder::TripleBuilder;
use crate::evaluator::MappingEvaluator;
use crate::rules::RuleSet;
use crate::schema::RecordSchema;
use crate::xml::XmlNode;
use lido2rdf_domain::{NamespaceTable, TripleSink};
use tracing::debug;

/// Converts record trees to triples
#[derive(Debug, Clone)]
pub struct RecordConverter {
    schema: RecordSchema,
    rules: RuleSet,
    namespaces: NamespaceTable,
}

impl RecordConverter {
    /// Create a converter
    ///
    /// Namespaces declared by the rule document are added to `namespaces`
    /// and to the schema's source prefixes without overriding existing
    /// bindings.
    pub fn new(mut schema: RecordSchema, rules: RuleSet, mut namespaces: NamespaceTable) -> Self {
        for (prefix, uri) in rules.namespace_bindings() {
            if namespaces.bind_if_absent(prefix, uri) {
                debug!(prefix, uri, "bound rule document namespace");
            }
        }
        schema.extend_namespaces(rules.namespace_bindings());
        Self {
            schema,
            rules,
            namespaces,
        }
    }

    /// Record schema
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Loaded rules
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Target namespace table
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Identifier of a record, or `record-<ordinal>` when it carries none
    pub fn record_id(&self, record: XmlNode<'_>, ordinal: usize) -> String {
        self.schema
            .record_id(record)
            .unwrap_or_else(|| format!("record-{}", ordinal))
    }

    /// Convert one record, returning the number of new triples
    pub fn convert_record<S: TripleSink>(&self, record: XmlNode<'_>, ordinal: usize, sink: &mut S) -> usize {
        let record_id = self.record_id(record, ordinal);
        let evaluator = MappingEvaluator::new(&self.schema);
        let builder = TripleBuilder::new(&self.namespaces);

        let added: usize = evaluator
            .evaluate_all(&self.rules, record)
            .iter()
            .map(|data| sink.accept_all(builder.build(data, &record_id)))
            .sum();
        debug!(record_id = %record_id, triples = added, "record converted");
        added
    }
}
