//! Identity module - deterministic node identities
//!
//! Node identity is a pure function of the record id, the local path or
//! explicit id, and the position. No randomness, no clock.

use crate::namespace::is_absolute;
use crate::term::{Node, NodeId};

/// The key from which a node identity is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKey<'a> {
    /// Identifier found in the source; global across records
    Explicit(&'a str),
    /// Synthesized positional path; scoped to its record
    Positional {
        /// Identifier of the enclosing record
        record_id: &'a str,
        /// Ancestor chain plus sibling position
        path: &'a str,
    },
}

impl IdentityKey<'_> {
    /// String that gets hashed
    pub fn hash_input(&self) -> String {
        match self {
            IdentityKey::Explicit(id) => id.trim().to_string(),
            IdentityKey::Positional { record_id, path } => format!("{}-{}", record_id, path),
        }
    }

    /// Resolve to a node
    ///
    /// Explicit ids that already are absolute resource names are used
    /// directly; everything else is hashed.
    ///
    /// # Examples
    ///
    /// ```
    /// use lido2rdf_domain::{IdentityKey, Node};
    ///
    /// let gnd = IdentityKey::Explicit("http://d-nb.info/gnd/118640445").node();
    /// assert_eq!(gnd, Node::resource("http://d-nb.info/gnd/118640445"));
    ///
    /// let a = IdentityKey::Positional { record_id: "r1", path: "lido/event/0" }.node();
    /// let b = IdentityKey::Positional { record_id: "r2", path: "lido/event/0" }.node();
    /// assert_ne!(a, b);
    /// ```
    pub fn node(&self) -> Node {
        if let IdentityKey::Explicit(id) = self {
            let id = id.trim();
            if is_absolute(id) {
                return Node::Resource(id.to_string());
            }
        }
        Node::Hashed(NodeId::from_key(&self.hash_input()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_explicit_ids_ignore_surrounding_space() {
        let a = IdentityKey::Explicit(" DE-Mb112/obj1 ").node();
        let b = IdentityKey::Explicit("DE-Mb112/obj1").node();
        assert_eq!(a, b);
    }

    #[test]
    fn test_positional_key_composition() {
        let key = IdentityKey::Positional {
            record_id: "DE-1/rec",
            path: "lido/descriptiveMetadata/0",
        };
        assert_eq!(key.hash_input(), "DE-1/rec-lido/descriptiveMetadata/0");
    }

    proptest! {
        #[test]
        fn prop_identity_is_deterministic(record in ".{0,40}", path in ".{0,40}") {
            let first = IdentityKey::Positional { record_id: &record, path: &path }.node();
            let second = IdentityKey::Positional { record_id: &record, path: &path }.node();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_distinct_records_do_not_merge(
            a in "[a-z0-9]{1,12}",
            b in "[a-z0-9]{1,12}",
            path in "[a-z/]{1,20}/[0-9]",
        ) {
            prop_assume!(a != b);
            let na = IdentityKey::Positional { record_id: &a, path: &path }.node();
            let nb = IdentityKey::Positional { record_id: &b, path: &path }.node();
            prop_assert_ne!(na, nb);
        }
    }
}
