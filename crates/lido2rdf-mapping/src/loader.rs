//! Mapping Loader - rule document → [`RuleSet`]
//!
//! Only a document that cannot be parsed at all is an error. Individual
//! rules that are skipped, incomplete or carry an unusable selector are
//! dropped with a log line and the rest of the document still loads.

use crate::error::{MappingError, Result};
use crate::predicate::{Access, Group, Leaf, LeafKind, Predicate};
use crate::rules::{ExP, Mapping, PropertyObject, RuleSet};
use crate::schema::SourceNamespaces;
use crate::selector::Selector;
use crate::xml::{XmlNode, XmlTree};
use std::path::Path;
use tracing::{debug, warn};

/// Default rule file name
pub const DEFAULT_RULE_FILE: &str = "lido2rdf.x3ml";

/// Parses rule documents against a set of source namespace prefixes
#[derive(Debug, Clone)]
pub struct MappingLoader {
    namespaces: SourceNamespaces,
}

impl MappingLoader {
    /// Create a loader resolving selector prefixes through `namespaces`
    pub fn new(namespaces: &SourceNamespaces) -> Self {
        Self {
            namespaces: namespaces.clone(),
        }
    }

    /// Load a rule document from disk
    ///
    /// # Errors
    ///
    /// [`MappingError::Configuration`] if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<RuleSet> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MappingError::Configuration(format!("cannot read rule file {}: {}", path.display(), e))
        })?;
        self.load_str(&content)
    }

    /// Load a rule document held in memory
    pub fn load_str(&self, input: &str) -> Result<RuleSet> {
        let tree = XmlTree::parse_str(input)
            .map_err(|e| MappingError::Configuration(format!("cannot parse rule document: {}", e)))?;
        let root = tree
            .root()
            .ok_or_else(|| MappingError::Configuration("empty rule document".into()))?;

        let mut rules = RuleSet::default();
        for decl in root.descendants().filter(|n| n.local_name() == "namespace") {
            let prefix = decl.attribute(None, "prefix").unwrap_or("").trim();
            let uri = decl.attribute(None, "uri").unwrap_or("").trim();
            if !prefix.is_empty() && !uri.is_empty() {
                rules.namespaces.insert(prefix.to_string(), uri.to_string());
            }
        }

        let mut namespaces = self.namespaces.clone();
        for (prefix, uri) in rules.namespace_bindings() {
            namespaces.bind_if_absent(prefix, uri);
        }

        for (n, node) in root
            .descendants_or_self()
            .filter(|n| n.local_name() == "mapping")
            .enumerate()
        {
            if is_skipped(node) {
                debug!(mapping = n, "skipping rule flagged skip");
                continue;
            }
            match parse_mapping(node, &namespaces) {
                Ok(Some(mapping)) => rules.mappings.push(mapping),
                Ok(None) => debug!(mapping = n, "dropping incomplete rule"),
                Err(e) => warn!(mapping = n, error = %e, "dropping rule"),
            }
        }

        debug!(
            mappings = rules.len(),
            properties = rules.property_count(),
            "rule document loaded"
        );
        Ok(rules)
    }
}

/// Interpret the `skip` attribute
pub fn str_to_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "t" | "1"
    )
}

fn is_skipped(node: XmlNode<'_>) -> bool {
    node.attribute(None, "skip").is_some_and(str_to_bool)
}

/// First descendant reached by a `/`-separated chain of child names
fn find<'a>(node: XmlNode<'a>, path: &str) -> Option<XmlNode<'a>> {
    path.split('/').try_fold(node, |current, name| {
        current.children().find(|c| c.local_name() == name)
    })
}

fn find_text<'a>(node: XmlNode<'a>, path: &str) -> &'a str {
    find(node, path).map(|n| n.text()).unwrap_or("")
}

fn parse_entity(
    node: XmlNode<'_>,
    source: &str,
    target_node: &str,
    namespaces: &SourceNamespaces,
) -> Result<Option<ExP>> {
    let path = find_text(node, source);
    let entity_node = find(node, &format!("{}/entity", target_node));
    let entity = entity_node.map(|e| find_text(e, "type")).unwrap_or("");
    if path.is_empty() || entity.is_empty() {
        return Ok(None);
    }
    let mut exp = ExP::new(Selector::parse(path, namespaces)?, entity);
    if let Some(entity_node) = entity_node {
        exp.variable = entity_node
            .attribute(None, "variable")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        exp.generator = find(entity_node, "instance_generator")
            .and_then(|g| g.attribute(None, "name"))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
    }
    Ok(Some(exp))
}

fn parse_mapping(node: XmlNode<'_>, namespaces: &SourceNamespaces) -> Result<Option<Mapping>> {
    let Some(domain) = find(node, "domain") else {
        return Ok(None);
    };
    let Some(subject) = parse_entity(domain, "source_node", "target_node", namespaces)? else {
        return Ok(None);
    };

    let condition = match find(domain, "target_node/if") {
        Some(cond) => parse_if(cond, subject.path.as_str(), namespaces)?,
        None => None,
    }
    .unwrap_or_default();

    let mut properties = Vec::new();
    for link in node.children().filter(|c| c.local_name() == "link") {
        if is_skipped(link) {
            debug!(subject = %subject.path, "skipping link flagged skip");
            continue;
        }
        match parse_link(link, &subject, namespaces) {
            Ok(Some(po)) => properties.push(po),
            Ok(None) => debug!(subject = %subject.path, "dropping incomplete link"),
            Err(e) => warn!(subject = %subject.path, error = %e, "dropping link"),
        }
    }

    Ok(Some(Mapping {
        subject,
        condition,
        properties,
    }))
}

fn parse_link(
    link: XmlNode<'_>,
    subject: &ExP,
    namespaces: &SourceNamespaces,
) -> Result<Option<PropertyObject>> {
    let Some(range) = find(link, "range") else {
        return Ok(None);
    };
    let Some(object) = parse_entity(range, "source_node", "target_node", namespaces)? else {
        return Ok(None);
    };

    let Some(target_relation) = find(link, "path/target_relation") else {
        return Ok(None);
    };
    // Intermediate relationships may precede the final one; the last one wins.
    let relationship = target_relation
        .children()
        .filter(|c| c.local_name() == "relationship")
        .last()
        .map(|r| r.text())
        .unwrap_or("");
    if relationship.is_empty() {
        return Ok(None);
    }
    let relation = find_text(link, "path/source_relation/relation");
    let relation = if relation.is_empty() {
        object.path.as_str()
    } else {
        relation
    };
    let predicate = ExP::new(Selector::parse(relation, namespaces)?, relationship);

    let condition = match find(target_relation, "if") {
        Some(cond) => parse_if(cond, subject.path.as_str(), namespaces)?,
        None => None,
    }
    .unwrap_or_default();

    Ok(Some(PropertyObject {
        predicate,
        object,
        condition,
    }))
}

/// Parse the single operator inside an `<if>`
fn parse_if(
    node: XmlNode<'_>,
    base: &str,
    namespaces: &SourceNamespaces,
) -> Result<Option<Predicate>> {
    let Some(op) = node.children().next() else {
        return Ok(None);
    };
    let tag = op.local_name();
    let predicate = match tag {
        "or" => Predicate::Or(parse_group(op, base, namespaces, true)?),
        "and" => Predicate::And(parse_group(op, base, namespaces, false)?),
        "not" => Predicate::Not(parse_group(op, base, namespaces, false)?),
        _ => match LeafKind::from_tag(tag) {
            Some(kind) => Predicate::Leaf(parse_leaf(op, kind, base, namespaces)?),
            None => {
                return Err(MappingError::Configuration(format!(
                    "unknown condition operator '{}'",
                    tag
                )))
            }
        },
    };
    Ok(Some(predicate))
}

fn parse_group(
    node: XmlNode<'_>,
    base: &str,
    namespaces: &SourceNamespaces,
    merge: bool,
) -> Result<Group> {
    let mut children: Vec<Predicate> = Vec::new();
    for child in node.children().filter(|c| c.local_name() == "if") {
        let Some(predicate) = parse_if(child, base, namespaces)? else {
            continue;
        };
        if merge {
            if let Predicate::Leaf(leaf) = &predicate {
                if let Some(Predicate::Leaf(existing)) = children.iter_mut().find(|p| {
                    matches!(p, Predicate::Leaf(l) if l.kind == LeafKind::Equals
                        && leaf.kind == LeafKind::Equals
                        && l.access == leaf.access)
                }) {
                    existing.values.extend(leaf.values.iter().cloned());
                    continue;
                }
            }
        }
        children.push(predicate);
    }

    if !children.is_empty() {
        return Ok(Group::of(children));
    }
    if node.text().is_empty() && node.attribute(None, "value").is_none() {
        return Ok(Group::default());
    }
    Ok(Group::bare(parse_leaf(node, LeafKind::Equals, base, namespaces)?))
}

fn parse_leaf(
    node: XmlNode<'_>,
    kind: LeafKind,
    base: &str,
    namespaces: &SourceNamespaces,
) -> Result<Leaf> {
    let access = Access::parse(relativize(node.text(), base), namespaces)?;
    let values = node
        .attribute(None, "value")
        .map(str::trim)
        .filter(|v| !v.is_empty());
    Ok(Leaf::new(kind, access, values))
}

/// Strip the subject's own selector from a condition access
fn relativize<'a>(access: &'a str, base: &str) -> &'a str {
    let base = base.trim_start_matches('/');
    let trimmed = access.trim_start_matches('/');
    match trimmed.strip_prefix(base) {
        Some(rest) if rest.starts_with('/') && !base.is_empty() => rest.trim_start_matches('/'),
        _ => access,
    }
}
