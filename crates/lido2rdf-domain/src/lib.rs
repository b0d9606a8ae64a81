//! lido2rdf Domain Layer
//!
//! Graph primitives shared by the mapping interpreter, the harvester and the
//! command-line front end. The only external dependency is `md5`, used for
//! content-addressed node identities.
//!
//! ## Key Concepts
//!
//! - **Triple**: a (subject, predicate, object) fact, the atomic unit of output
//! - **Node**: an absolute resource name or a hashed identity
//! - **Identity key**: explicit id, or record id + positional path; hashing the
//!   same key always yields the same node
//! - **Namespace table**: prefix → URI bindings used to expand short-form names
//!   and to compact serialized output
//! - **Triple set**: ordered, de-duplicated output graph
//!
//! ## Architecture
//!
//! - No I/O, no async
//! - Trait definitions for the boundary to output collectors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod identity;
pub mod namespace;
pub mod term;
pub mod traits;
pub mod triple;

// Re-exports for convenience
pub use graph::TripleSet;
pub use identity::IdentityKey;
pub use namespace::{Expansion, NamespaceTable};
pub use term::{Literal, Node, NodeId, Term};
pub use traits::TripleSink;
pub use triple::{Triple, RDF_TYPE};
