//! A* route finding over the traffic graph.

use crate::geo::Point2f;
use crate::traffic::TrafficGraph;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A route as a sequence of OSM node ids.
pub type Route = Vec<i64>;

/// A route as a sequence of traffic graph node indices, valid only
/// against the graph that produced it.
pub type IndexRoute = Vec<usize>;

/// Pruning bound: the search gives up on candidates whose cost
/// exceeds this multiple of the start node's heuristic.
pub const MAX_DISTANCE_SCALE: f64 = 3.0;

/// Per-node search state.
#[derive(Clone, Copy)]
struct SearchState {
    /// Best known cost from the start.
    distance: f64,
    /// Whether the node has been expanded.
    visited: bool,
    /// The node this one was best reached from.
    predecessor: Option<usize>,
}

/// A frontier entry; ordered so the binary heap pops the minimum
/// `f = distance + heuristic`, breaking ties on insertion order.
struct QueueEntry {
    f: f64,
    seq: usize,
    node: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap's max-pop yields the minimum.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Finds the cheapest route from `start` to `goal`, inclusive of both
/// endpoints, as traffic graph indices.
///
/// Returns the empty route when the goal is unreachable, when the
/// cheapest path would exceed the pruning bound, or when
/// `start == goal` (routing is only defined between distinct
/// endpoints).
pub fn find_index_route(traffic: &TrafficGraph, start: usize, goal: usize) -> IndexRoute {
    if traffic.is_empty() || start == goal {
        return IndexRoute::new();
    }

    let goal_plane = traffic.node(goal).plane;
    let heuristic = |index: usize| plane_distance(traffic.node(index).plane, goal_plane);

    let mut states = vec![
        SearchState {
            distance: f64::INFINITY,
            visited: false,
            predecessor: None,
        };
        traffic.len()
    ];
    states[start].distance = 0.0;
    let max_distance = heuristic(start) * MAX_DISTANCE_SCALE;

    let mut queue = BinaryHeap::new();
    let mut seq = 0usize;
    queue.push(QueueEntry {
        f: heuristic(start),
        seq,
        node: start,
    });

    while let Some(entry) = queue.pop() {
        let current = entry.node;
        // Duplicate queue entries are permitted; the visited flag
        // gates re-expansion.
        if states[current].visited {
            continue;
        }
        states[current].visited = true;

        if current == goal {
            return backtrack(&states, start, goal);
        }

        for edge in &traffic.node(current).connections {
            let neighbor = edge.goal_index;
            let candidate = states[current].distance + edge.weight;
            if candidate > max_distance {
                continue;
            }
            if candidate < states[neighbor].distance {
                states[neighbor].distance = candidate;
                states[neighbor].predecessor = Some(current);
                seq += 1;
                queue.push(QueueEntry {
                    f: candidate + heuristic(neighbor),
                    seq,
                    node: neighbor,
                });
            }
        }
    }

    IndexRoute::new()
}

/// Walks the predecessor links back from the goal and reverses the
/// accumulated tail into start-to-goal order.
fn backtrack(states: &[SearchState], start: usize, goal: usize) -> IndexRoute {
    let mut route = vec![goal];
    let mut current = goal;
    while current != start {
        match states[current].predecessor {
            Some(previous) => {
                route.push(previous);
                current = previous;
            }
            None => return IndexRoute::new(),
        }
    }
    route.reverse();
    route
}

/// Euclidean distance between two plane positions.
fn plane_distance(a: Point2f, b: Point2f) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    (dx * dx + dy * dy).sqrt()
}
