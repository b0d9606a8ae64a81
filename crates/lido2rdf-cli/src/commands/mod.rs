//! Command implementations.

pub mod convert;
pub mod harvest;
pub mod rules;

pub use self::convert::execute_convert;
pub use self::harvest::{execute_harvest, PageWriter};
pub use self::rules::execute_rules;

use crate::cli::STDIO;
use crate::config::Config;
use crate::error::Result;
use crate::output::{write_graph, RdfSyntax};
use lido2rdf_domain::{NamespaceTable, TripleSet};
use lido2rdf_mapping::{MappingLoader, RecordConverter};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Load a rule file into a converter using the configured schema and namespaces.
pub fn load_converter(rules: &Path, config: &Config) -> Result<RecordConverter> {
    let schema = config.record_schema()?;
    let rules = MappingLoader::new(schema.namespaces()).load_file(rules)?;
    tracing::info!(
        mappings = rules.len(),
        properties = rules.property_count(),
        "rules loaded"
    );
    Ok(RecordConverter::new(schema, rules, config.namespace_table()))
}

/// Write a graph to a file, or to stdout for `-`.
pub fn write_output(graph: &TripleSet, namespaces: &NamespaceTable, syntax: RdfSyntax, destination: &str) -> Result<()> {
    if destination == STDIO {
        let stdout = io::stdout();
        let mut writer = write_graph(graph, namespaces, syntax, BufWriter::new(stdout.lock()))?;
        writer.flush()?;
    } else {
        let file = File::create(destination)?;
        let mut writer = write_graph(graph, namespaces, syntax, BufWriter::new(file))?;
        writer.flush()?;
    }
    Ok(())
}
