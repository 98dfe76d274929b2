//! Tests for graph distillation and the traffic overlay.

use assert_approx_eq::assert_approx_eq;
use osm_traffic::{Graph, Node, Projection, Segment, TrafficGraph, Way, World};

fn highway(id: i64, refs: &[i64]) -> Way {
    let mut way = Way::new(id, 1);
    way.refs = refs.to_vec();
    way.tags.push(("highway".to_owned(), "residential".to_owned()));
    way
}

fn single_way_segment() -> Segment {
    let mut segment = Segment::new();
    segment.add_node(Node::new(0, 1, 52.0, 13.0));
    segment.add_node(Node::new(1, 1, 52.0, 13.001));
    segment.add_node(Node::new(2, 1, 52.0, 13.002));
    segment.add_way(highway(10, &[0, 1, 2]));
    segment
}

#[test]
fn single_way_distills_to_three_nodes() {
    let segment = single_way_segment();
    let projection = Projection::new(segment.bounding_box().center());
    let graph = Graph::distill(&segment, &projection);

    assert_eq!(graph.len(), 3);
    // Every consecutive ref pair yields both directions.
    for (u, v) in [(0i64, 1i64), (1, 2)] {
        let ui = graph.index_of(u).unwrap();
        let vi = graph.index_of(v).unwrap();
        assert!(graph.node(ui).edges.iter().any(|e| e.goal_id == v));
        assert!(graph.node(vi).edges.iter().any(|e| e.goal_id == u));
    }
    // But no edge skips the middle node.
    let start = graph.node(graph.index_of(0).unwrap());
    assert!(start.edges.iter().all(|e| e.goal_id != 2));
}

#[test]
fn edge_weights_equal_projected_distance() {
    let segment = single_way_segment();
    let projection = Projection::new(segment.bounding_box().center());
    let graph = Graph::distill(&segment, &projection);

    for node in graph.nodes() {
        for edge in &node.edges {
            let goal = graph.node(graph.index_of(edge.goal_id).unwrap());
            let expected = projection.distance(node.position(), goal.position());
            assert_approx_eq!(edge.weight, expected, 1e-12);
            assert_approx_eq!(edge.distance, edge.weight, 1e-12);
        }
    }
}

#[test]
fn edge_lengths_are_metres() {
    let segment = single_way_segment();
    let projection = Projection::new(segment.bounding_box().center());
    let graph = Graph::distill(&segment, &projection);

    let start = graph.node(graph.index_of(0).unwrap());
    let edge = start.edges.iter().find(|e| e.goal_id == 1).unwrap();
    // A millidegree of longitude is about 111 m of road.
    assert!(edge.distance > 100.0 && edge.distance < 120.0);
}

#[test]
fn audit_is_clean_for_distilled_graph() {
    let segment = single_way_segment();
    let projection = Projection::new(segment.bounding_box().center());
    let graph = Graph::distill(&segment, &projection);
    assert!(graph.audit(&segment).is_empty());
}

#[test]
fn dangling_refs_are_skipped() {
    let mut segment = single_way_segment();
    segment.add_way(highway(11, &[2, 99]));
    let projection = Projection::new(segment.bounding_box().center());
    let graph = Graph::distill(&segment, &projection);
    // The unresolvable ref contributes no node and no edge.
    assert_eq!(graph.len(), 3);
    assert!(graph.audit(&segment).is_empty());
}

#[test]
fn overlay_mirrors_the_routing_graph() {
    let segment = single_way_segment();
    let projection = Projection::new(segment.bounding_box().center());
    let mut graph = Graph::distill(&segment, &projection);
    let traffic = TrafficGraph::build(&mut graph, &projection);

    assert_eq!(traffic.len(), graph.len());
    for (index, node) in traffic.nodes().iter().enumerate() {
        // The cross-graph links are bidirectional.
        assert_eq!(graph.node(node.linked).linked, Some(index));
        // Edges mirror weights and carry defaults.
        let edges = &graph.node(node.linked).edges;
        assert_eq!(node.connections.len(), edges.len());
        for (edge, source) in node.connections.iter().zip(edges) {
            assert_eq!(edge.weight, source.weight);
            assert_eq!(edge.lanes, 1);
            assert!(edge.agents.is_empty());
        }
    }
}

#[test]
fn incoming_backpointers_are_complete() {
    let segment = single_way_segment();
    let projection = Projection::new(segment.bounding_box().center());
    let mut graph = Graph::distill(&segment, &projection);
    let traffic = TrafficGraph::build(&mut graph, &projection);

    for (index, node) in traffic.nodes().iter().enumerate() {
        for (edge_index, edge) in node.connections.iter().enumerate() {
            let goal = traffic.node(edge.goal_index);
            assert!(goal
                .incoming
                .iter()
                .any(|r| r.node == index && r.edge == edge_index));
        }
        // Gates are sized |incoming| x |connections|, all closed.
        assert_eq!(
            node.gates.len(),
            node.incoming.len() * node.connections.len()
        );
        for i in 0..node.incoming.len() {
            for j in 0..node.connections.len() {
                assert!(!node.gates.is_open(i, j));
            }
        }
    }
}

#[test]
fn world_builds_from_highway_subset() {
    let mut segment = single_way_segment();
    segment.add_node(Node::new(5, 1, 52.3, 13.1));
    let mut building = Way::new(12, 1);
    building.refs = vec![2, 5];
    building.tags.push(("building".to_owned(), "yes".to_owned()));
    segment.add_way(building);

    let world = World::new(segment);
    // Only the highway way contributes to the graphs.
    assert_eq!(world.graph().len(), 3);
    assert_eq!(world.traffic().len(), 3);
    assert_eq!(world.highway_map().ways().len(), 1);
}
