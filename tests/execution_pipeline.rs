//! End-to-End Execution and Streaming Tests
//!
//! Parses real query text, executes it against an in-memory datastore
//! and drives the full output pipeline, checking the rendered XML and
//! JSON documents, gzip framing and the policy rejection paths.

use std::collections::BTreeMap;
use std::io::Read;

use flate2::read::GzDecoder;

use geoserve::datastore::{
    Datastore, EntityInfo, EntityType, Member, MemoryDatastore, Node, Relation, Way,
};
use geoserve::exec::{self, ExecError, ExecPolicy};
use geoserve::output::{stream_entities, Compression, DefaultFormatRegistry};
use geoserve::query::parse;

fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Three pubs around the origin, a named street, and a route relation.
fn fixture_store() -> MemoryDatastore {
    let mut store = MemoryDatastore::new();
    store.insert_node(Node {
        id: 1,
        lat: 0.5,
        lon: 0.5,
        tags: tags(&[("amenity", "pub"), ("name", "The Anchor")]),
        info: EntityInfo {
            uid: 10,
            user: "alice".to_string(),
            changeset: 100,
            timestamp: None,
        },
    });
    store.insert_node(Node {
        id: 2,
        lat: 0.6,
        lon: 0.7,
        tags: tags(&[("amenity", "cafe")]),
        info: EntityInfo::default(),
    });
    store.insert_node(Node {
        id: 3,
        lat: 40.0,
        lon: 40.0,
        tags: tags(&[("amenity", "pub")]),
        info: EntityInfo::default(),
    });
    store.insert_way(Way {
        id: 20,
        nodes: vec![1, 2],
        tags: tags(&[("highway", "residential"), ("name", "Harbour Road")]),
        info: EntityInfo::default(),
    });
    store.insert_relation(Relation {
        id: 30,
        members: vec![Member {
            member_type: EntityType::Way,
            member_ref: 20,
            role: "route".to_string(),
        }],
        tags: tags(&[("type", "route")]),
        info: EntityInfo::default(),
    });
    store
}

fn run_query(store: &MemoryDatastore, query_text: &str, compression: Compression) -> Vec<u8> {
    let descriptor = parse(query_text).unwrap();
    let policy = ExecPolicy::default();
    let stream = exec::execute(&descriptor, store as &dyn Datastore, &policy).unwrap();
    let mut buf = Vec::new();
    stream_entities(
        stream,
        descriptor.output_format(),
        &DefaultFormatRegistry,
        &mut buf,
        compression,
    )
    .unwrap();
    buf
}

// =============================================================================
// XML output
// =============================================================================

#[test]
fn test_tag_query_renders_matching_nodes_as_xml() {
    let store = fixture_store();
    let xml = String::from_utf8(run_query(&store, "node[amenity=pub]", Compression::None)).unwrap();

    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("generator="));
    assert!(xml.contains("<node id=\"1\""));
    assert!(xml.contains("<node id=\"3\""));
    assert!(!xml.contains("<node id=\"2\""));
    assert!(xml.contains("<tag k=\"name\" v=\"The Anchor\"/>"));
    assert!(xml.contains("uid=\"10\" user=\"alice\" changeset=\"100\""));
    assert!(xml.trim_end().ends_with("</osm>"));
}

#[test]
fn test_empty_result_is_a_well_formed_document() {
    let store = fixture_store();
    let xml =
        String::from_utf8(run_query(&store, "node[amenity=library]", Compression::None)).unwrap();
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<osm"));
    assert!(xml.trim_end().ends_with("</osm>"));
    assert!(!xml.contains("<node"));
}

#[test]
fn test_bbox_restricts_results() {
    let store = fixture_store();
    let xml = String::from_utf8(run_query(
        &store,
        "node[amenity=pub][bbox=0,0,1,1]",
        Compression::None,
    ))
    .unwrap();
    assert!(xml.contains("<node id=\"1\""));
    assert!(!xml.contains("<node id=\"3\""));
}

#[test]
fn test_way_query_renders_node_refs() {
    let store = fixture_store();
    let xml =
        String::from_utf8(run_query(&store, "way[name=Harbour Road]", Compression::None)).unwrap();
    assert!(xml.contains("<way id=\"20\""));
    assert!(xml.contains("<nd ref=\"1\"/>"));
    assert!(xml.contains("<nd ref=\"2\"/>"));
}

#[test]
fn test_relation_query_renders_members() {
    let store = fixture_store();
    let xml = String::from_utf8(run_query(&store, "relation[type=route]", Compression::None))
        .unwrap();
    assert!(xml.contains("<relation id=\"30\""));
    assert!(xml.contains("<member type=\"way\" ref=\"20\" role=\"route\"/>"));
}

#[test]
fn test_any_primitive_spans_all_types() {
    let store = fixture_store();
    let xml = String::from_utf8(run_query(&store, "*[tag]", Compression::None)).unwrap();
    assert!(xml.contains("<node id=\"1\""));
    assert!(xml.contains("<way id=\"20\""));
    assert!(xml.contains("<relation id=\"30\""));
}

// =============================================================================
// JSON output
// =============================================================================

#[test]
fn test_json_suffix_renders_elements_array() {
    let store = fixture_store();
    let bytes = run_query(&store, "node.json[amenity=pub]", Compression::None);
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(value["version"], 0.6);
    let elements = value["elements"].as_array().unwrap();
    assert_eq!(elements.len(), 2);
    assert!(elements.iter().all(|e| e["type"] == "node"));
    assert!(elements.iter().any(|e| e["id"] == 1));
}

#[test]
fn test_json_empty_result() {
    let store = fixture_store();
    let bytes = run_query(&store, "relation.json[type=boundary]", Compression::None);
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["elements"].as_array().unwrap().len(), 0);
}

// =============================================================================
// Gzip
// =============================================================================

#[test]
fn test_gzip_output_decompresses_to_the_plain_document() {
    let store = fixture_store();
    let plain = run_query(&store, "node[amenity=pub]", Compression::None);
    let compressed = run_query(&store, "node[amenity=pub]", Compression::Gzip);

    assert_ne!(plain, compressed);
    assert_eq!(&compressed[..2], &[0x1f, 0x8b], "gzip magic bytes");

    let mut decoder = GzDecoder::new(&compressed[..]);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).unwrap();
    assert_eq!(decompressed, plain);
}

// =============================================================================
// Policy rejections
// =============================================================================

#[test]
fn test_zero_selector_query_is_rejected_before_the_datastore() {
    let store = fixture_store();
    let descriptor = parse("node").unwrap();
    let err = exec::execute(&descriptor, &store as &dyn Datastore, &ExecPolicy::default())
        .err()
        .unwrap();
    assert!(matches!(err, ExecError::NoSelectors));
}

#[test]
fn test_area_limit_is_inclusive() {
    let store = fixture_store();
    let policy = ExecPolicy { max_bbox_area: 4.0 };

    // Exactly at the limit: admitted
    let at_limit = parse("node[bbox=0,0,2,2]").unwrap();
    assert!(exec::execute(&at_limit, &store as &dyn Datastore, &policy).is_ok());

    // Just over: rejected without touching the datastore
    let over = parse("node[bbox=0,0,2,2.1]").unwrap();
    let err = exec::execute(&over, &store as &dyn Datastore, &policy)
        .err()
        .unwrap();
    assert!(matches!(err, ExecError::AreaLimitExceeded { .. }));
}

#[test]
fn test_multiple_bboxes_count_toward_the_limit_together() {
    let store = fixture_store();
    let policy = ExecPolicy { max_bbox_area: 5.0 };
    let descriptor = parse("node[bbox=0,0,2,2][bbox=10,10,12,11.1]").unwrap();
    let err = exec::execute(&descriptor, &store as &dyn Datastore, &policy)
        .err()
        .unwrap();
    assert!(matches!(err, ExecError::AreaLimitExceeded { .. }));
}

// =============================================================================
// Map extract
// =============================================================================

#[test]
fn test_map_extract_pulls_referenced_members() {
    let store = fixture_store();
    // Box covers node 1 only; the full extract follows way 20 to node 2
    // and the relation over the way.
    let xml = String::from_utf8(run_query(
        &store,
        "map?bbox=0.4,0.4,0.6,0.6",
        Compression::None,
    ))
    .unwrap();
    assert!(xml.contains("<node id=\"1\""));
    assert!(xml.contains("<node id=\"2\""));
    assert!(xml.contains("<way id=\"20\""));
    assert!(xml.contains("<relation id=\"30\""));
    assert!(!xml.contains("<node id=\"3\""));

    // Nodes come before ways, ways before relations
    let node_pos = xml.find("<node id=\"1\"").unwrap();
    let way_pos = xml.find("<way id=\"20\"").unwrap();
    let rel_pos = xml.find("<relation id=\"30\"").unwrap();
    assert!(node_pos < way_pos && way_pos < rel_pos);
}

// =============================================================================
// Selector semantics through the full stack
// =============================================================================

#[test]
fn test_attribute_selector_matches_author() {
    let store = fixture_store();
    let xml = String::from_utf8(run_query(&store, "node[@user=alice]", Compression::None)).unwrap();
    assert!(xml.contains("<node id=\"1\""));
    assert!(!xml.contains("<node id=\"2\""));
    assert!(!xml.contains("<node id=\"3\""));
}

#[test]
fn test_or_group_matches_any_member() {
    let store = fixture_store();
    let xml = String::from_utf8(run_query(
        &store,
        "node[amenity=pub|cafe][bbox=0,0,1,1]",
        Compression::None,
    ))
    .unwrap();
    assert!(xml.contains("<node id=\"1\""));
    assert!(xml.contains("<node id=\"2\""));
}

#[test]
fn test_negated_child_predicate_through_the_stack() {
    let mut store = fixture_store();
    store.insert_way(Way {
        id: 21,
        nodes: Vec::new(),
        tags: tags(&[("highway", "proposed")]),
        info: EntityInfo::default(),
    });
    let xml = String::from_utf8(run_query(&store, "way[not(nd)]", Compression::None)).unwrap();
    assert!(xml.contains("<way id=\"21\""));
    assert!(!xml.contains("<way id=\"20\""));
}

#[test]
fn test_wildcard_selector_matches_key_presence() {
    let store = fixture_store();
    let xml = String::from_utf8(run_query(
        &store,
        "node[amenity=*][bbox=0,0,1,1]",
        Compression::None,
    ))
    .unwrap();
    assert!(xml.contains("<node id=\"1\""));
    assert!(xml.contains("<node id=\"2\""));
}

#[test]
fn test_stream_counts_match_rendered_entities() {
    let store = fixture_store();
    let descriptor = parse("node[amenity=pub]").unwrap();
    let stream =
        exec::execute(&descriptor, &store as &dyn Datastore, &ExecPolicy::default()).unwrap();
    let mut buf = Vec::new();
    let count = stream_entities(
        stream,
        descriptor.output_format(),
        &DefaultFormatRegistry,
        &mut buf,
        Compression::None,
    )
    .unwrap();
    assert_eq!(count, 2);
}
