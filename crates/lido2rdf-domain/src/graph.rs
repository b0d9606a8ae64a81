//! Graph module - the accumulated output of a conversion

use crate::term::Node;
use crate::traits::TripleSink;
use crate::triple::Triple;
use std::collections::BTreeSet;

/// Ordered, de-duplicated set of triples
///
/// Iteration order is the natural order of [`Triple`], so two runs over
/// the same input serialize byte-identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripleSet {
    triples: BTreeSet<Triple>,
}

impl TripleSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a triple; returns `false` if it was already present
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Check if a triple is present
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Number of distinct triples
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Iterate in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Distinct subjects in sorted order
    pub fn subjects(&self) -> Vec<&Node> {
        let mut subjects: Vec<&Node> = self.triples.iter().map(|t| &t.subject).collect();
        subjects.dedup();
        subjects
    }

    /// Triples whose subject is `node`
    pub fn about<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Triple> + 'a {
        self.triples.iter().filter(move |t| &t.subject == node)
    }

    /// Move every triple of `other` into this set
    pub fn merge(&mut self, other: TripleSet) {
        self.triples.extend(other.triples);
    }
}

impl TripleSink for TripleSet {
    fn accept(&mut self, triple: Triple) -> bool {
        self.insert(triple)
    }
}

impl Extend<Triple> for TripleSet {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        self.triples.extend(iter);
    }
}

impl FromIterator<Triple> for TripleSet {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            triples: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TripleSet {
    type Item = &'a Triple;
    type IntoIter = std::collections::btree_set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Literal;

    fn title(subject: &str, text: &str) -> Triple {
        Triple::new(
            Node::resource(subject),
            "http://example.org/hasTitle",
            Literal::simple(text),
        )
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut set = TripleSet::new();
        assert!(set.insert(title("http://example.org/a", "x")));
        assert!(!set.insert(title("http://example.org/a", "x")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_insertion_order_is_irrelevant() {
        let forward: TripleSet = vec![title("http://e/a", "1"), title("http://e/b", "2")]
            .into_iter()
            .collect();
        let backward: TripleSet = vec![title("http://e/b", "2"), title("http://e/a", "1")]
            .into_iter()
            .collect();
        assert_eq!(forward, backward);
        let a: Vec<_> = forward.iter().collect();
        let b: Vec<_> = backward.iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_subjects_and_about() {
        let set: TripleSet = vec![
            title("http://e/a", "1"),
            title("http://e/a", "2"),
            title("http://e/b", "3"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.subjects().len(), 2);
        let a = Node::resource("http://e/a");
        assert_eq!(set.about(&a).count(), 2);
    }

    #[test]
    fn test_merge() {
        let mut left: TripleSet = vec![title("http://e/a", "1")].into_iter().collect();
        let right: TripleSet = vec![title("http://e/a", "1"), title("http://e/c", "3")]
            .into_iter()
            .collect();
        left.merge(right);
        assert_eq!(left.len(), 2);
    }
}
