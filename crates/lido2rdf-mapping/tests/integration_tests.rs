//! Integration tests for lido2rdf-mapping
//!
//! These tests run rule documents end to end: load, evaluate, build.

use lido2rdf_domain::{Literal, NamespaceTable, Node, NodeId, Term, Triple, TripleSet, RDF_TYPE};
use lido2rdf_mapping::xml::{decode_text, element_header, namespace_of, TreeBuilder, XmlTree};
use lido2rdf_mapping::{
    MappingLoader, Predicate, RecordConverter, RecordSchema, SourceNamespaces,
};
use quick_xml::events::Event;
use quick_xml::NsReader;
use std::collections::BTreeSet;
use std::io::Write;

const OBJECT_RULES: &str = include_str!("fixtures/objects.x3ml");
const LIDO_RECORDS: &str = include_str!("fixtures/records.xml");

const CRM: &str = "http://www.cidoc-crm.org/cidoc-crm/";

const TITLE_RULES: &str = r#"<x3ml><mappings><mapping>
    <domain><source_node>//record</source_node>
      <target_node><entity><type>http://example.org/T</type></entity></target_node></domain>
    <link>
      <path><source_relation><relation>record/title</relation></source_relation>
        <target_relation><relationship>http://example.org/hasTitle</relationship></target_relation></path>
      <range><source_node>record/title</source_node>
        <target_node><entity><type>rdfs:Literal</type></entity></target_node></range>
    </link>
  </mapping></mappings></x3ml>"#;

fn generic_schema() -> RecordSchema {
    RecordSchema::new(SourceNamespaces::new(), "record", Some("./id/text()")).unwrap()
}

fn converter(schema: RecordSchema, rules: &str) -> RecordConverter {
    let rules = MappingLoader::new(schema.namespaces()).load_str(rules).unwrap();
    RecordConverter::new(schema, rules, NamespaceTable::default())
}

/// Materialize each outermost record element as its own tree
fn split_records(schema: &RecordSchema, input: &str) -> Vec<XmlTree> {
    let mut reader = NsReader::from_str(input);
    let mut records = Vec::new();
    let mut current: Option<TreeBuilder> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event().unwrap();
        let namespace = namespace_of(&resolved);
        let closed = match event {
            Event::Start(ref start) | Event::Empty(ref start) => {
                let (name, attributes) = element_header(&reader, namespace, start).unwrap();
                if current.is_none() && schema.is_record(&name) {
                    current = Some(TreeBuilder::new());
                }
                match current.as_mut() {
                    Some(builder) => {
                        builder.start(name, attributes);
                        matches!(event, Event::Empty(_)) && builder.end()
                    }
                    None => false,
                }
            }
            Event::End(_) => current.as_mut().is_some_and(TreeBuilder::end),
            Event::Text(text) => {
                if let Some(builder) = current.as_mut() {
                    builder.text(&decode_text(&text).unwrap());
                }
                false
            }
            Event::Eof => break,
            _ => false,
        };
        if closed {
            records.push(current.take().unwrap().finish().unwrap());
        }
    }
    assert!(current.is_none(), "document ends inside a record");
    records
}

fn convert_into(converter: &RecordConverter, input: &str, graph: &mut TripleSet) -> usize {
    let records = split_records(converter.schema(), input);
    for (ordinal, tree) in records.iter().enumerate() {
        converter.convert_record(tree.root().unwrap(), ordinal, graph);
    }
    records.len()
}

fn convert(converter: &RecordConverter, input: &str) -> TripleSet {
    let mut graph = TripleSet::new();
    convert_into(converter, input, &mut graph);
    graph
}

fn crm(local: &str) -> String {
    format!("{}{}", CRM, local)
}

#[test]
fn test_single_record_yields_type_and_title() {
    let converter = converter(generic_schema(), TITLE_RULES);
    let graph = convert(&converter, "<root><record><title>Mona Lisa</title></record></root>");

    assert_eq!(graph.len(), 2, "Expected exactly a type and a title triple");
    let subjects = graph.subjects();
    assert_eq!(subjects.len(), 1);
    let n = subjects[0].clone();
    assert!(matches!(n, Node::Hashed(_)), "Subject should be a generated node");
    assert!(graph.contains(&Triple::typed(n.clone(), "http://example.org/T")));
    assert!(graph.contains(&Triple::new(
        n,
        "http://example.org/hasTitle",
        Literal::simple("Mona Lisa")
    )));
}

#[test]
fn test_distinct_record_ids_do_not_merge() {
    let input = "<root>\
        <record><id>A-1</id><title>Same</title></record>\
        <record><id>A-2</id><title>Same</title></record>\
        </root>";

    // Positional subjects are scoped by record id
    let graph = convert(&converter(generic_schema(), TITLE_RULES), input);
    assert_eq!(graph.subjects().len(), 2, "Subjects of distinct records must not merge");
    assert_eq!(graph.len(), 4);

    // Explicit subjects are keyed by their own id
    let schema = generic_schema().with_identifier("record", &["id"]).unwrap();
    let graph = convert(&converter(schema, TITLE_RULES), input);
    let subjects = graph.subjects();
    assert_eq!(subjects.len(), 2);
    assert!(subjects.contains(&&Node::Hashed(NodeId::from_key("A-1"))));
    assert!(subjects.contains(&&Node::Hashed(NodeId::from_key("A-2"))));
}

#[test]
fn test_or_condition_over_text_values() {
    let doc = r#"<mapping>
        <domain><source_node>//item</source_node>
          <target_node><entity><type>crm:E55_Type</type></entity>
            <if><or>
              <if><equals value="A">type/text()</equals></if>
              <if><equals value="B">type/text()</equals></if>
            </or></if>
          </target_node></domain>
      </mapping>"#;
    let rules = MappingLoader::new(&SourceNamespaces::new()).load_str(doc).unwrap();
    let condition = &rules.mappings[0].condition;
    assert!(matches!(condition, Predicate::Or(_)));

    let b = lido2rdf_mapping::xml::XmlTree::parse_str("<item><type>B</type></item>").unwrap();
    assert!(condition.evaluate(b.root()));

    let c = lido2rdf_mapping::xml::XmlTree::parse_str("<item><type>C</type></item>").unwrap();
    assert!(!condition.evaluate(c.root()));
}

#[test]
fn test_gated_subjects_emit_nothing() {
    let gated = r#"<x3ml><mappings>
      <mapping>
        <domain><source_node>//record</source_node>
          <target_node><entity><type>http://example.org/Gated</type></entity>
            <if><equals value="yes">publish/text()</equals></if>
          </target_node></domain>
        <link>
          <path><source_relation><relation>title</relation></source_relation>
            <target_relation><relationship>http://example.org/hasTitle</relationship></target_relation></path>
          <range><source_node>title</source_node>
            <target_node><entity><type>rdfs:Literal</type></entity></target_node></range>
        </link>
      </mapping>
      <mapping>
        <domain><source_node>//record</source_node>
          <target_node><entity><type>http://example.org/Silent</type></entity></target_node></domain>
        <link>
          <path><source_relation><relation>missing</relation></source_relation>
            <target_relation><relationship>http://example.org/hasMissing</relationship></target_relation></path>
          <range><source_node>missing</source_node>
            <target_node><entity><type>rdfs:Literal</type></entity></target_node></range>
        </link>
      </mapping>
    </mappings></x3ml>"#;
    let converter = converter(generic_schema(), gated);

    let graph = convert(&converter, "<root><record><publish>no</publish><title>Hidden</title></record></root>");
    assert!(graph.is_empty(), "Neither a failed condition nor an empty property may emit a type");

    let graph = convert(&converter, "<root><record><publish>yes</publish><title>Shown</title></record></root>");
    assert_eq!(graph.len(), 2);
    assert!(graph
        .iter()
        .all(|t| !t.is_type_assertion() || t.object == Term::Node(Node::resource("http://example.org/Gated"))));
}

#[test]
fn test_pipeline_is_deterministic() {
    let schema = RecordSchema::lido();
    let first = convert(&converter(schema.clone(), OBJECT_RULES), LIDO_RECORDS);
    let second = convert(&converter(schema, OBJECT_RULES), LIDO_RECORDS);
    assert!(!first.is_empty());
    assert_eq!(first, second, "Identical input must yield an identical graph");
}

#[test]
fn test_rule_document_round_trip() {
    let loader = MappingLoader::new(&SourceNamespaces::lido());
    let rules = loader.load_str(OBJECT_RULES).unwrap();
    assert_eq!(rules.len(), 2, "The skipped rule must not be loaded");

    let written = rules.to_x3ml().unwrap();
    let reloaded = loader.load_str(&written).unwrap();
    assert_eq!(reloaded, rules);
    assert_eq!(reloaded.to_x3ml().unwrap(), written);
}

#[test]
fn test_lido_records() {
    let converter = converter(RecordSchema::lido(), OBJECT_RULES);
    let mut graph = TripleSet::new();
    assert_eq!(convert_into(&converter, LIDO_RECORDS, &mut graph), 2);
    assert_eq!(graph.len(), 15);

    let object = Node::Hashed(NodeId::from_key("DE-Mb112/lido-obj00154983"));
    assert!(graph.contains(&Triple::typed(object.clone(), crm("E22_Human-Made_Object"))));
    assert!(graph.contains(&Triple::new(
        object.clone(),
        crm("P102_has_title"),
        Literal::with_language("Mona Lisa", Some("en"))
    )));
    assert!(
        !graph.iter().any(|t| t.object.as_literal().is_some_and(|l| l.value == "La Gioconda")),
        "Only the main title is mapped"
    );

    // Explicit absolute identifiers are used as resources
    let painting = Node::resource("http://vocab.getty.edu/aat/300033618");
    assert!(graph.contains(&Triple::new(object.clone(), crm("P2_has_type"), Term::Node(painting.clone()))));
    assert!(graph.contains(&Triple::typed(painting, crm("E55_Type"))));

    let leonardo = Node::resource("http://d-nb.info/gnd/118640445");
    assert!(graph.contains(&Triple::typed(leonardo.clone(), crm("E39_Actor"))));

    // The event linked from the object is the same node the event rule describes
    let events: Vec<Node> = graph
        .iter()
        .filter(|t| t.subject == object && t.predicate == crm("P108i_was_produced_by"))
        .filter_map(|t| t.object.as_node())
        .cloned()
        .collect();
    assert_eq!(events.len(), 2, "Both events are linked from the object");
    let note = Literal::with_language("painted by Leonardo", Some("en"));
    let production = events
        .iter()
        .find(|event| graph.contains(&Triple::new((*event).clone(), crm("P3_has_note"), note.clone())))
        .cloned()
        .expect("the production event carries its note");
    assert!(graph.contains(&Triple::new(
        production,
        crm("P14_carried_out_by"),
        Term::Node(leonardo)
    )));

    // The acquisition is linked but fails the production condition
    let acquisition_notes = graph
        .iter()
        .filter(|t| t.object.as_literal().is_some_and(|l| l.value == "acquired 1518"))
        .count();
    assert_eq!(acquisition_notes, 0);

    let untitled = Node::Hashed(NodeId::from_key("DE-Mb112/lido-obj00154984"));
    assert_eq!(graph.about(&untitled).count(), 2);
}

#[test]
fn test_path_identified_objects_under_sibling_subjects_stay_apart() {
    let rules = r#"<x3ml><mappings><mapping>
        <domain><source_node>lido:event</source_node>
          <target_node><entity><type>crm:E12_Production</type></entity></target_node></domain>
        <link>
          <path><source_relation><relation>lido:eventActor</relation></source_relation>
            <target_relation><relationship>crm:P14_carried_out_by</relationship></target_relation></path>
          <range><source_node>lido:eventActor/lido:actorInRole</source_node>
            <target_node><entity><type>crm:E39_Actor</type></entity></target_node></range>
        </link>
      </mapping></mappings></x3ml>"#;
    let record = r#"<lido:lido xmlns:lido="http://www.lido-schema.org">
        <lido:lidoRecID>DE-1/two-events</lido:lidoRecID>
        <lido:eventSet><lido:event><lido:eventActor><lido:actorInRole>
          <lido:actor><lido:nameActorSet><lido:appellationValue>Leonardo</lido:appellationValue></lido:nameActorSet></lido:actor>
        </lido:actorInRole></lido:eventActor></lido:event></lido:eventSet>
        <lido:eventSet><lido:event><lido:eventActor><lido:actorInRole>
          <lido:actor><lido:nameActorSet><lido:appellationValue>Salai</lido:appellationValue></lido:nameActorSet></lido:actor>
        </lido:actorInRole></lido:eventActor></lido:event></lido:eventSet>
    </lido:lido>"#;

    let graph = convert(&converter(RecordSchema::lido(), rules), record);
    let links: Vec<&Triple> = graph
        .iter()
        .filter(|t| t.predicate == crm("P14_carried_out_by"))
        .collect();
    assert_eq!(links.len(), 2);

    let events: BTreeSet<&Node> = links.iter().map(|t| &t.subject).collect();
    let actors: BTreeSet<&Node> = links.iter().filter_map(|t| t.object.as_node()).collect();
    assert_eq!(events.len(), 2);
    assert_eq!(actors.len(), 2, "Each event keeps its own actor");
}

#[test]
fn test_load_rule_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(OBJECT_RULES.as_bytes()).unwrap();

    let rules = MappingLoader::new(&SourceNamespaces::lido())
        .load_file(file.path())
        .unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules.property_count(), 5);
    assert_eq!(rules.mappings[0].properties[1].object.variable.as_deref(), Some("t"));
}

#[test]
fn test_rules_serialize_to_json() {
    let rules = MappingLoader::new(&SourceNamespaces::lido())
        .load_str(OBJECT_RULES)
        .unwrap();
    let json = serde_json::to_value(&rules).unwrap();
    assert_eq!(json["mappings"][0]["subject"]["path"], "//lido:lido");
    assert_eq!(json["mappings"][1]["condition"]["or"]["children"][0]["leaf"]["kind"], "equals");
    assert_eq!(RDF_TYPE, "http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
}
