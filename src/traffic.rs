//! The cache-local traffic overlay of the routing graph.

use crate::geo::{Point2f, Projection};
use crate::graph::Graph;
use crate::route::{IndexRoute, Route};
use crate::scheduler::Scheduler;
use crate::AgentId;

/// Default per-edge speed limit, in m/s (50 km/h).
pub const DEFAULT_MAX_ALLOWED_SPEED: f32 = 13.9;

/// Default physical top speed supported by an edge, in m/s.
pub const DEFAULT_MAX_SPEED: f32 = 36.1;

/// A directed edge of the traffic graph.
///
/// Destinations are addressed by index into the owning graph's node
/// vector; ids exist only on the routing graph side of the link.
#[derive(Clone, Debug)]
pub struct TrafficEdge {
    /// The index of the destination node.
    pub goal_index: usize,
    /// The routing cost, mirrored from the routing graph.
    pub weight: f64,
    /// The geometric length, in metres.
    pub distance: f32,
    /// The speed limit currently in force, in m/s.
    pub max_allowed_speed: f32,
    /// The physical top speed the edge supports, in m/s.
    pub max_speed: f32,
    /// The lane count.
    pub lanes: u8,
    /// The agents on the edge, in arrival order; the front of the
    /// list is closest to the edge's end.
    pub agents: Vec<AgentId>,
}

/// Addresses one edge as `(owning node index, connection index)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeRef {
    /// The index of the node the edge leaves from.
    pub node: usize,
    /// The edge's position within that node's connections.
    pub edge: usize,
}

/// A boolean `|incoming| x |connections|` grid controlling which lane
/// transitions a node currently admits.
#[derive(Clone, Debug, Default)]
pub struct GateMatrix {
    bits: Vec<bool>,
    cols: usize,
}

impl GateMatrix {
    /// Creates an all-closed matrix.
    pub fn closed(rows: usize, cols: usize) -> Self {
        Self {
            bits: vec![false; rows * cols],
            cols,
        }
    }

    /// The number of incoming lanes.
    pub fn rows(&self) -> usize {
        if self.cols == 0 {
            0
        } else {
            self.bits.len() / self.cols
        }
    }

    /// The number of outgoing connections.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether incoming lane `i` may exit via connection `j`.
    pub fn is_open(&self, i: usize, j: usize) -> bool {
        self.bits[i * self.cols + j]
    }

    /// Sets a single gate.
    pub fn set(&mut self, i: usize, j: usize, open: bool) {
        self.bits[i * self.cols + j] = open;
    }

    /// Sets every gate of incoming lane `i`.
    pub fn set_row(&mut self, i: usize, open: bool) {
        for j in 0..self.cols {
            self.bits[i * self.cols + j] = open;
        }
    }

    /// Opens every gate.
    pub fn open_all(&mut self) {
        self.bits.fill(true);
    }

    /// The total number of gate entries.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the matrix has no entries.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

/// A node of the traffic graph.
#[derive(Clone, Debug)]
pub struct TrafficNode {
    /// The node's plane position under the world projection.
    pub plane: Point2f,
    /// The index of the linked routing graph node.
    pub linked: usize,
    /// The outgoing edges.
    pub connections: Vec<TrafficEdge>,
    /// Back-pointers to every edge that ends at this node.
    pub incoming: Vec<EdgeRef>,
    /// The gate matrix, rewritten each tick by the scheduler.
    pub gates: GateMatrix,
    /// The scheduling policy owning the gates.
    pub scheduler: Scheduler,
}

/// The traffic-simulation overlay of a routing graph.
///
/// Topology is immutable after construction; only gates, edge
/// occupancy and agent state mutate during simulation.
#[derive(Clone, Debug, Default)]
pub struct TrafficGraph {
    nodes: Vec<TrafficNode>,
}

impl TrafficGraph {
    /// Builds the overlay for a routing graph, projecting every node
    /// with the given projection and linking the two graphs in both
    /// directions.
    pub fn build(graph: &mut Graph, projection: &Projection) -> TrafficGraph {
        let mut nodes: Vec<TrafficNode> = graph
            .nodes()
            .iter()
            .map(|node| {
                let plane = projection.to_plane(node.position());
                TrafficNode {
                    plane: Point2f::new(plane.x as f32, plane.y as f32),
                    linked: 0,
                    connections: Vec::new(),
                    incoming: Vec::new(),
                    gates: GateMatrix::default(),
                    scheduler: Scheduler::default(),
                }
            })
            .collect();

        for index in 0..graph.len() {
            nodes[index].linked = index;
            graph.set_linked(index, index);
            let edges: Vec<TrafficEdge> = graph
                .node(index)
                .edges
                .iter()
                .filter_map(|edge| {
                    let goal_index = graph.index_of(edge.goal_id)?;
                    Some(TrafficEdge {
                        goal_index,
                        weight: edge.weight,
                        distance: edge.distance as f32,
                        max_allowed_speed: DEFAULT_MAX_ALLOWED_SPEED,
                        max_speed: DEFAULT_MAX_SPEED,
                        lanes: 1,
                        agents: Vec::new(),
                    })
                })
                .collect();
            nodes[index].connections = edges;
        }

        // Second pass: incoming back-pointers, then gate sizing.
        for node in 0..nodes.len() {
            for edge in 0..nodes[node].connections.len() {
                let goal = nodes[node].connections[edge].goal_index;
                nodes[goal].incoming.push(EdgeRef { node, edge });
            }
        }
        for node in &mut nodes {
            node.gates = GateMatrix::closed(node.incoming.len(), node.connections.len());
        }

        TrafficGraph { nodes }
    }

    /// The node vector.
    pub fn nodes(&self) -> &[TrafficNode] {
        &self.nodes
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Gets a node by index.
    pub fn node(&self, index: usize) -> &TrafficNode {
        &self.nodes[index]
    }

    /// Gets a node by index, mutably.
    pub(crate) fn node_mut(&mut self, index: usize) -> &mut TrafficNode {
        &mut self.nodes[index]
    }

    /// Gets an edge by reference.
    pub fn edge(&self, edge_ref: EdgeRef) -> &TrafficEdge {
        &self.nodes[edge_ref.node].connections[edge_ref.edge]
    }

    /// Gets an edge by reference, mutably.
    pub(crate) fn edge_mut(&mut self, edge_ref: EdgeRef) -> &mut TrafficEdge {
        &mut self.nodes[edge_ref.node].connections[edge_ref.edge]
    }

    /// Finds the connection of `from` that ends at `goal_index`.
    pub fn connection_to(&self, from: usize, goal_index: usize) -> Option<usize> {
        self.nodes[from]
            .connections
            .iter()
            .position(|edge| edge.goal_index == goal_index)
    }

    /// Finds the incoming-lane index of an edge at its goal node.
    pub fn incoming_index(&self, edge_ref: EdgeRef) -> Option<usize> {
        let goal = self.edge(edge_ref).goal_index;
        self.nodes[goal].incoming.iter().position(|r| *r == edge_ref)
    }

    /// Converts an index-form route into identifier form through the
    /// linked routing graph.
    pub fn id_route(&self, graph: &Graph, route: &IndexRoute) -> Route {
        route
            .iter()
            .map(|index| graph.node(self.nodes[*index].linked).node_id)
            .collect()
    }
}
