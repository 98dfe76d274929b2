//! The routing graph distilled from highway-tagged ways.

use crate::geo::{Point, Projection};
use crate::osm::Segment;
use itertools::Itertools;
use smallvec::SmallVec;
use std::collections::HashMap;

/// A directed edge of the routing graph, keyed by node id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphEdge {
    /// The id of the destination node.
    pub goal_id: i64,
    /// The routing cost of the edge.
    pub weight: f64,
    /// The geometric length of the edge, in metres.
    pub distance: f64,
}

/// A node of the routing graph.
///
/// The position is stored redundantly with the source segment so edge
/// weights and heuristics never chase an id map at query time.
#[derive(Clone, Debug)]
pub struct GraphNode {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// The OSM node id.
    pub node_id: i64,
    /// The outgoing edges.
    pub edges: SmallVec<[GraphEdge; 4]>,
    /// The index of the linked traffic graph node, once an overlay
    /// has been built.
    pub linked: Option<usize>,
}

impl GraphNode {
    /// The node's geographic position.
    pub fn position(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}

/// A violation reported by the consistency audit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuditIssue {
    /// An id-map entry points outside the buffer or at the wrong node.
    BrokenIdMap { id: i64 },
    /// An edge's goal id does not resolve within the graph.
    DanglingEdge { from_id: i64, goal_id: i64 },
    /// A graph node id does not exist in the source segment.
    UnknownNode { id: i64 },
}

/// A directed routing graph of [GraphNode]s, keyed by OSM node id.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    /// The nodes, in creation order.
    buffer: Vec<GraphNode>,
    /// Node id to buffer index.
    id_map: HashMap<i64, usize>,
}

impl Graph {
    /// Distills a segment into a routing graph.
    ///
    /// For every consecutive pair of refs in any way, both directions
    /// are emitted with weight = distance = projected distance. The
    /// segment is expected to be pre-filtered to highway ways; refs
    /// that do not resolve are skipped. Two ways sharing an arc leave
    /// duplicate parallel edges, which is tolerated: their weights are
    /// equal, so shortest-path costs are unaffected.
    pub fn distill(segment: &Segment, projection: &Projection) -> Graph {
        let mut graph = Graph::default();
        for way in segment.ways() {
            let resolved = way
                .refs
                .iter()
                .filter_map(|ref_id| segment.get_node(*ref_id).ok());
            for (a, b) in resolved.tuple_windows() {
                let u = graph.ensure_node(a.id, a.lat, a.lon);
                let v = graph.ensure_node(b.id, b.lat, b.lon);
                let distance = projection.distance(a.position(), b.position());
                graph.buffer[u].edges.push(GraphEdge {
                    goal_id: b.id,
                    weight: distance,
                    distance,
                });
                graph.buffer[v].edges.push(GraphEdge {
                    goal_id: a.id,
                    weight: distance,
                    distance,
                });
            }
        }
        graph
    }

    /// The node buffer, in creation order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.buffer
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Gets the buffer index of a node id.
    pub fn index_of(&self, node_id: i64) -> Option<usize> {
        self.id_map.get(&node_id).copied()
    }

    /// Gets a node by buffer index.
    pub fn node(&self, index: usize) -> &GraphNode {
        &self.buffer[index]
    }

    /// Records the traffic graph index linked to a routing node.
    pub(crate) fn set_linked(&mut self, index: usize, linked: usize) {
        self.buffer[index].linked = Some(linked);
    }

    /// Verifies the graph's internal consistency against its source
    /// segment. Diagnostic only; violations never affect simulation.
    pub fn audit(&self, segment: &Segment) -> Vec<AuditIssue> {
        let mut issues = Vec::new();
        for (id, index) in &self.id_map {
            let valid = self
                .buffer
                .get(*index)
                .map(|node| node.node_id == *id)
                .unwrap_or(false);
            if !valid {
                issues.push(AuditIssue::BrokenIdMap { id: *id });
            }
        }
        for node in &self.buffer {
            for edge in &node.edges {
                if !self.id_map.contains_key(&edge.goal_id) {
                    issues.push(AuditIssue::DanglingEdge {
                        from_id: node.node_id,
                        goal_id: edge.goal_id,
                    });
                }
            }
            if segment.get_node(node.node_id).is_err() {
                issues.push(AuditIssue::UnknownNode { id: node.node_id });
            }
        }
        issues
    }

    /// Gets the index for a node id, creating the node if absent.
    fn ensure_node(&mut self, node_id: i64, lat: f64, lon: f64) -> usize {
        if let Some(index) = self.id_map.get(&node_id) {
            return *index;
        }
        let index = self.buffer.len();
        self.buffer.push(GraphNode {
            lat,
            lon,
            node_id,
            edges: SmallVec::new(),
            linked: None,
        });
        self.id_map.insert(node_id, index);
        index
    }
}
