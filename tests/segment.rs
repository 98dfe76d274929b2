//! Tests for the OSM segment: insertion rules, selective copies,
//! lookups and the diagnostic JSON round-trip.

use osm_traffic::{Finder, Node, Relation, RelationMember, Segment, Tagged, Way};

fn node(id: i64, lat: f64, lon: f64) -> Node {
    Node::new(id, 1, lat, lon)
}

fn tagged_way(id: i64, refs: &[i64], key: &str, value: &str) -> Way {
    let mut way = Way::new(id, 1);
    way.refs = refs.to_vec();
    way.tags.push((key.to_owned(), value.to_owned()));
    way
}

fn sample_segment() -> Segment {
    let mut segment = Segment::new();
    segment.add_node(node(0, 52.0, 13.0));
    segment.add_node(node(1, 52.0, 13.001));
    segment.add_node(node(2, 52.1, 13.002));
    segment.add_node(node(3, 52.2, 13.003));
    segment.add_way(tagged_way(10, &[0, 1, 2], "highway", "residential"));
    segment.add_way(tagged_way(11, &[2, 3], "building", "yes"));
    segment
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut segment = Segment::new();
    assert!(segment.add_node(node(0, 52.0, 13.0)));
    assert!(!segment.add_node(node(0, 53.0, 14.0)));
    assert_eq!(segment.nodes().len(), 1);

    assert!(segment.add_way(Way::new(10, 1)));
    assert!(!segment.add_way(Way::new(10, 1)));
    // A different sub-index is a distinct fragment of the same way.
    let mut fragment = Way::new(10, 1);
    fragment.sub_index = 1;
    assert!(segment.add_way(fragment));
    assert_eq!(segment.get_ways(10).len(), 2);
}

#[test]
fn node_lookup_resolves_its_own_id() {
    let segment = sample_segment();
    for id in 0..4 {
        assert_eq!(segment.get_node(id).unwrap().id, id);
    }
    assert!(segment.get_node(99).is_err());
}

#[test]
fn bounding_box_is_tight() {
    let mut segment = sample_segment();
    let bounds = segment.bounding_box();
    assert_eq!(bounds.lower_lat, 52.0);
    assert_eq!(bounds.upper_lat, 52.2);
    assert_eq!(bounds.lower_lon, 13.0);
    assert_eq!(bounds.upper_lon, 13.003);

    // Adding a node extends the box; a recalculation agrees.
    segment.add_node(node(4, 51.5, 13.01));
    assert_eq!(segment.bounding_box().lower_lat, 51.5);
    segment.recalculate_boundaries();
    assert_eq!(segment.bounding_box().lower_lat, 51.5);
}

#[test]
fn accept_all_copy_preserves_everything() {
    let mut segment = sample_segment();
    let mut relation = Relation::new(20, 1);
    relation.node_members.push(RelationMember::new(0, "stop"));
    relation.way_members.push(RelationMember::new(10, "route"));
    segment.add_relation(relation);

    let copy = segment.find_nodes(&Finder::accept_all());
    assert_eq!(copy.nodes(), segment.nodes());
    assert_eq!(copy.ways(), segment.ways());
    assert_eq!(copy.relations(), segment.relations());
}

#[test]
fn highway_filter_round_trip() {
    let segment = sample_segment();
    let filtered = segment.find_tag_ways("highway");

    assert_eq!(filtered.ways().len(), 1);
    assert!(filtered.ways()[0].has_tag("highway"));
    // Only the nodes the highway way references survive.
    assert_eq!(filtered.nodes().len(), 3);
    assert!(filtered.get_node(3).is_err());
    // The filtered box nests within the original.
    assert!(segment
        .bounding_box()
        .contains_rect(&filtered.bounding_box()));
}

#[test]
fn relation_cycle_copy_terminates() {
    let mut source = Segment::new();
    source.add_node(node(0, 52.0, 13.0));
    let mut a = Relation::new(20, 1);
    a.node_members.push(RelationMember::new(0, ""));
    a.relation_members.push(RelationMember::new(21, "child"));
    let mut b = Relation::new(21, 1);
    b.relation_members.push(RelationMember::new(20, "parent"));
    source.add_relation(a.clone());
    source.add_relation(b);

    let mut copy = Segment::new();
    copy.add_relation_recursive(&a, &source);
    assert_eq!(copy.relations().len(), 2);
    assert!(copy.get_node(0).is_ok());
}

#[test]
fn way_recursive_copy_pulls_nodes() {
    let source = sample_segment();
    let mut copy = Segment::new();
    let way = source.get_ways(10)[0].clone();
    copy.add_way_recursive(&way, &source);
    assert_eq!(copy.nodes().len(), 3);
    assert_eq!(copy.ways().len(), 1);
}

#[test]
fn find_address_matches_non_empty_fields() {
    let mut segment = Segment::new();
    let mut house = node(0, 52.0, 13.0);
    house.tags.push(("addr:city".into(), "Berlin".into()));
    house.tags.push(("addr:street".into(), "Unter den Linden".into()));
    house.tags.push(("addr:housenumber".into(), "1".into()));
    segment.add_node(house);
    segment.add_node(node(1, 52.0, 13.001));

    assert_eq!(segment.find_address("Berlin", "", "", ""), vec![0]);
    assert_eq!(
        segment.find_address("Berlin", "", "Unter den Linden", "1"),
        vec![0]
    );
    assert!(segment.find_address("Hamburg", "", "", "").is_empty());
}

#[test]
fn closest_node_is_found_by_scan() {
    let segment = sample_segment();
    assert_eq!(segment.find_closest_node(52.0, 13.0001), Some(0));
    assert_eq!(segment.find_closest_node(52.21, 13.003), Some(3));
}

#[test]
fn square_filter_keeps_contained_nodes() {
    let segment = sample_segment();
    let rect = osm_traffic::Rect::from_borders(51.9, 52.05, 12.9, 13.1);
    let inside = segment.find_square_nodes(rect);
    assert_eq!(inside.nodes().len(), 2);
    // The highway way survives with only its contained refs.
    assert_eq!(inside.get_ways(10)[0].refs, vec![0, 1]);
}

#[test]
fn json_round_trip_rebuilds_indexes() {
    let segment = sample_segment();
    let json = segment.to_json().unwrap();
    let loaded = Segment::from_json(&json).unwrap();

    assert_eq!(loaded.nodes(), segment.nodes());
    assert_eq!(loaded.ways(), segment.ways());
    assert_eq!(loaded.get_node(2).unwrap().lat, 52.1);
    assert_eq!(loaded.bounding_box(), segment.bounding_box());
    assert!(loaded.audit_maps());
}

#[test]
fn dangling_refs_are_reported() {
    let mut segment = Segment::new();
    segment.add_node(node(0, 52.0, 13.0));
    segment.add_way(tagged_way(10, &[0, 7], "highway", "service"));
    let dangling = segment.dangling_refs();
    assert!(dangling.contains(&7));
    assert_eq!(dangling.len(), 1);
}
