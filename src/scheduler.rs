//! Per-intersection gate scheduling policies.

use crate::traffic::{GateMatrix, TrafficGraph};
use crate::AgentSet;
use std::f64::consts::PI;

/// How close to the edge end an agent must be, in metres, to count as
/// waiting at the stop line. Smaller than the following gap, so a
/// queued follower never counts as the lane head.
pub const STOP_LINE_EPSILON: f32 = 0.5;

/// Angular slack excluding same-direction and oncoming approaches
/// from the right-of test, in radians.
const BEARING_EPSILON: f64 = 1e-3;

/// A per-node gate policy, dispatched as a tagged sum so future
/// phase-based policies don't pay for virtual dispatch on the hot
/// path.
///
/// A scheduler is owned by exactly one traffic node and rewrites only
/// that node's gate matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scheduler {
    /// Every gate is open, every tick.
    AllOpen,
    /// Priority to the right: a lane may proceed only when no
    /// approach on its geometric right has an agent waiting at the
    /// stop line.
    #[default]
    RightBeforeLeft,
}

impl Scheduler {
    /// Rewrites the gate matrix of the owning node for this tick.
    ///
    /// Decisions are based on the state observed when the scheduler
    /// runs; the world runs all schedulers before any agent moves, so
    /// within one step every gate reflects beginning-of-step state.
    pub fn update(
        self,
        _dt: f32,
        node_index: usize,
        traffic: &TrafficGraph,
        agents: &AgentSet,
        gates: &mut GateMatrix,
    ) {
        match self {
            Scheduler::AllOpen => gates.open_all(),
            Scheduler::RightBeforeLeft => {
                right_before_left(node_index, traffic, agents, gates)
            }
        }
    }
}

/// Opens each incoming lane iff no approach to its right is waiting.
fn right_before_left(
    node_index: usize,
    traffic: &TrafficGraph,
    agents: &AgentSet,
    gates: &mut GateMatrix,
) {
    let node = traffic.node(node_index);
    let lanes = node.incoming.len();

    let mut bearings = Vec::with_capacity(lanes);
    let mut waiting = Vec::with_capacity(lanes);
    for edge_ref in &node.incoming {
        let from = traffic.node(edge_ref.node);
        // The travel direction of the approach: from the neighbor's
        // plane position toward this node, CCW from east. Plane x is
        // scaled latitude (north) and plane y is longitude (east).
        let north = (node.plane.x - from.plane.x) as f64;
        let east = (node.plane.y - from.plane.y) as f64;
        bearings.push(north.atan2(east));

        let edge = traffic.edge(*edge_ref);
        let at_stop_line = edge.agents.iter().any(|id| {
            agents
                .get(*id)
                .map(|agent| agent.edge_position() >= edge.distance - STOP_LINE_EPSILON)
                .unwrap_or(false)
        });
        waiting.push(at_stop_line);
    }

    for i in 0..lanes {
        let blocked = (0..lanes)
            .filter(|j| *j != i)
            .any(|j| waiting[j] && is_right_of(bearings[i], bearings[j]));
        gates.set_row(i, !blocked);
    }
}

/// Whether the approach at `other` is geometrically to the right of
/// the approach at `own`: strictly clockwise of it, short of oncoming.
fn is_right_of(own: f64, other: f64) -> bool {
    let clockwise = (own - other).rem_euclid(2.0 * PI);
    clockwise > BEARING_EPSILON && clockwise < PI - BEARING_EPSILON
}
