//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the mapping interpreter and
//! whatever collects its output.

use crate::triple::Triple;

/// Receiver of produced triples
///
/// Implemented by [`crate::TripleSet`]; the streaming processor writes every
/// record's triples through this seam, so it is the single writer of the
/// output graph.
pub trait TripleSink {
    /// Accept a triple; returns `false` if it was a duplicate
    fn accept(&mut self, triple: Triple) -> bool;

    /// Accept many triples, returning how many were new
    fn accept_all<I>(&mut self, triples: I) -> usize
    where
        I: IntoIterator<Item = Triple>,
        Self: Sized,
    {
        let mut added = 0;
        for triple in triples {
            if self.accept(triple) {
                added += 1;
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Literal, Node};
    use crate::TripleSet;

    #[test]
    fn test_accept_all_counts_new_only() {
        let t = Triple::new(
            Node::resource("http://e/a"),
            "http://e/p",
            Literal::simple("v"),
        );
        let mut set = TripleSet::new();
        assert_eq!(set.accept_all(vec![t.clone(), t]), 1);
    }
}
