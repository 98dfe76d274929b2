//! Tests for the parallel OSM XML parser.

use osm_traffic::{parse_xml, Error, ScopedPool, Tagged};

const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <node id="0" version="1" lat="52.0" lon="13.0">
    <tag k="highway" v="crossing"/>
  </node>
  <node id="1" version="1" lat="52.0" lon="13.001"/>
  <node id="2" version="2" lat="52.1" lon="13.002"/>
  <node id="-3" version="1" lat="52.2" lon="13.003"/>
  <way id="10" version="1">
    <nd ref="0"/>
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="residential"/>
    <tag k="name" v="Lindenstrasse"/>
  </way>
  <way id="11" version="1">
    <nd ref="2"/>
    <nd ref="-3"/>
  </way>
  <relation id="20" version="1">
    <member type="node" ref="0" role="stop"/>
    <member type="way" ref="10" role=""/>
    <member type="relation" ref="21" role="child"/>
    <tag k="type" v="route"/>
  </relation>
</osm>"#;

#[test]
fn parses_all_entity_kinds() {
    let segment = parse_xml(SAMPLE, &ScopedPool::new(2)).unwrap();

    assert_eq!(segment.nodes().len(), 4);
    assert_eq!(segment.ways().len(), 2);
    assert_eq!(segment.relations().len(), 1);

    let node = segment.get_node(0).unwrap();
    assert_eq!(node.lat, 52.0);
    assert!(node.has_tag_value("highway", "crossing"));

    // Negative ids are legal.
    assert!(segment.get_node(-3).is_ok());

    let way = &segment.get_ways(10)[0];
    assert_eq!(way.refs, vec![0, 1, 2]);
    assert_eq!(way.value("name").unwrap(), "Lindenstrasse");

    let relation = &segment.get_relations(20)[0];
    assert_eq!(relation.node_members[0].ref_id, 0);
    assert_eq!(relation.node_members[0].role, "stop");
    assert_eq!(relation.way_members[0].ref_id, 10);
    assert_eq!(relation.relation_members[0].ref_id, 21);
}

#[test]
fn worker_count_does_not_change_output() {
    let single = parse_xml(SAMPLE, &ScopedPool::new(1)).unwrap();
    let parallel = parse_xml(SAMPLE, &ScopedPool::new(8)).unwrap();

    assert_eq!(single.nodes(), parallel.nodes());
    assert_eq!(single.ways(), parallel.ways());
    assert_eq!(single.relations(), parallel.relations());
}

#[test]
fn rayon_pool_parses_identically() {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
    let with_rayon = parse_xml(SAMPLE, &pool).unwrap();
    let reference = parse_xml(SAMPLE, &ScopedPool::new(1)).unwrap();
    assert_eq!(with_rayon.nodes(), reference.nodes());
    assert_eq!(with_rayon.ways(), reference.ways());
}

#[test]
fn missing_osm_root_is_malformed() {
    let result = parse_xml("<notosm/>", &ScopedPool::new(1));
    assert!(matches!(result, Err(Error::MalformedDocument(_))));
}

#[test]
fn unreadable_bytes_are_malformed() {
    let result = parse_xml("<osm><node id=", &ScopedPool::new(1));
    assert!(matches!(result, Err(Error::MalformedDocument(_))));
}

#[test]
fn broken_entities_are_skipped_not_fatal() {
    let xml = r#"<osm>
      <node id="0" version="1" lat="52.0" lon="13.0"/>
      <node id="1" version="1" lat="52.0"/>
      <node version="1" lat="52.0" lon="13.0"/>
      <way id="10" version="1"><nd ref="0"/></way>
      <way version="1"><nd ref="0"/></way>
    </osm>"#;
    let segment = parse_xml(xml, &ScopedPool::new(3)).unwrap();
    assert_eq!(segment.nodes().len(), 1);
    assert_eq!(segment.ways().len(), 1);
}

#[test]
fn bounding_box_is_computed_after_parse() {
    let segment = parse_xml(SAMPLE, &ScopedPool::new(2)).unwrap();
    let bounds = segment.bounding_box();
    assert_eq!(bounds.lower_lat, 52.0);
    assert_eq!(bounds.upper_lat, 52.2);
    assert_eq!(bounds.upper_lon, 13.003);
}
