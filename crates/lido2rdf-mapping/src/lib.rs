//! lido2rdf Mapping Interpreter
//!
//! Turns source records into triples following a declarative rule document.
//!
//! ## Pipeline
//!
//! 1. [`MappingLoader`] parses the rule document into a [`RuleSet`]
//! 2. [`MappingEvaluator`] locates subject and object candidates in one
//!    record and evaluates each rule's [`Predicate`]
//! 3. [`IdentityResolver`] gives every matched element an [`Info`]
//! 4. [`TripleBuilder`] turns the evaluation result into triples
//!
//! [`RecordConverter`] runs steps 2 to 4 for one record tree at a time;
//! splitting a document into records is left to the streaming caller.
//!
//! ## Example
//!
//! ```
//! use lido2rdf_domain::{NamespaceTable, TripleSet};
//! use lido2rdf_mapping::xml::XmlTree;
//! use lido2rdf_mapping::{MappingLoader, RecordConverter, RecordSchema};
//!
//! let rules = r#"<x3ml><mappings><mapping>
//!   <domain><source_node>//lido:lido</source_node>
//!     <target_node><entity><type>crm:E22_Human-Made_Object</type></entity></target_node></domain>
//!   <link>
//!     <path><source_relation><relation>lido:appellationValue</relation></source_relation>
//!       <target_relation><relationship>crm:P102_has_title</relationship></target_relation></path>
//!     <range><source_node>lido:titleSet/lido:appellationValue</source_node>
//!       <target_node><entity><type>rdfs:Literal</type></entity></target_node></range>
//!   </link>
//! </mapping></mappings></x3ml>"#;
//!
//! let schema = RecordSchema::lido();
//! let rules = MappingLoader::new(schema.namespaces()).load_str(rules)?;
//! let converter = RecordConverter::new(schema, rules, NamespaceTable::default());
//!
//! let record = r#"<lido:lido xmlns:lido="http://www.lido-schema.org">
//!   <lido:lidoRecID>DE-1/42</lido:lidoRecID>
//!   <lido:titleSet><lido:appellationValue>Mona Lisa</lido:appellationValue></lido:titleSet>
//! </lido:lido>"#;
//!
//! let mut graph = TripleSet::new();
//! let tree = XmlTree::parse_str(record)?;
//! if let Some(root) = tree.root() {
//!     converter.convert_record(root, 0, &mut graph);
//! }
//! assert_eq!(graph.len(), 2);
//! # Ok::<(), lido2rdf_mapping::MappingError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod converter;
pub mod error;
pub mod evaluator;
pub mod identity;
pub mod loader;
pub mod predicate;
pub mod rules;
pub mod schema;
pub mod selector;
mod writer;
pub mod xml;

pub use builder::TripleBuilder;
pub use converter::RecordConverter;
pub use error::{MappingError, Result};
pub use evaluator::{MappingData, MappingEvaluator, PoData};
pub use identity::{IdMode, IdentityResolver, Info};
pub use loader::{MappingLoader, DEFAULT_RULE_FILE};
pub use predicate::{Access, Group, Leaf, LeafKind, Predicate};
pub use rules::{ExP, Mapping, PropertyObject, RuleSet};
pub use schema::{RecordSchema, SourceNamespaces};
pub use selector::Selector;
