//! The world: the full pipeline state and the simulation step loop.

use crate::agent::{Agent, PhysicalAttributes, ReapCause};
use crate::error::{EntityKind, Error, Result};
use crate::geo::Projection;
use crate::graph::Graph;
use crate::osm::Segment;
use crate::route::{self, IndexRoute, Route};
use crate::scheduler::STOP_LINE_EPSILON;
use crate::traffic::{EdgeRef, TrafficGraph};
use crate::{AgentId, AgentSet};
use log::{debug, warn};
use rand::Rng;
use rand_distr::Distribution;

/// The gap an agent keeps to its leader on the same edge, in metres.
pub const AGENT_SPACING: f32 = 4.5;

/// The record of an agent reaped after a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReapedAgent {
    /// The agent's ordering id.
    pub serial: u64,
    /// The origin node index.
    pub origin: usize,
    /// The goal node index.
    pub goal: usize,
    /// Why the agent left the simulation.
    pub cause: ReapCause,
}

/// The complete state of one simulation run.
///
/// Construction runs the offline pipeline: filter the segment to
/// highway ways, distill the routing graph, pin the projection to the
/// segment's bounding-box center and build the traffic overlay. The
/// graphs are immutable afterwards; only gates, edge occupancy and
/// agents change during stepping.
pub struct World {
    /// The full ingested segment.
    map: Segment,
    /// The highway-filtered sub-segment the graphs derive from.
    highway_map: Segment,
    /// The distilled routing graph.
    graph: Graph,
    /// The traffic overlay.
    traffic: TrafficGraph,
    /// The agent population.
    agents: AgentSet,
    /// The single projection shared by all plane coordinates.
    projection: Projection,
    /// The current simulation frame.
    frame: usize,
    /// The next agent serial.
    next_serial: u64,
    /// The agents reaped by the most recent step.
    reaped: Vec<ReapedAgent>,
}

impl World {
    /// Builds a world from an ingested segment.
    pub fn new(map: Segment) -> Self {
        let highway_map = map.find_tag_ways("highway");
        let projection = Projection::new(map.bounding_box().center());
        let mut graph = Graph::distill(&highway_map, &projection);
        let traffic = TrafficGraph::build(&mut graph, &projection);
        Self {
            map,
            highway_map,
            graph,
            traffic,
            agents: AgentSet::default(),
            projection,
            frame: 0,
            next_serial: 0,
            reaped: Vec::new(),
        }
    }

    /// The full ingested segment.
    pub fn map(&self) -> &Segment {
        &self.map
    }

    /// The highway-filtered segment.
    pub fn highway_map(&self) -> &Segment {
        &self.highway_map
    }

    /// The routing graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The traffic overlay.
    pub fn traffic(&self) -> &TrafficGraph {
        &self.traffic
    }

    /// The world's projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// The current simulation frame.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// The agents reaped by the most recent step.
    pub fn reaped(&self) -> &[ReapedAgent] {
        &self.reaped
    }

    /// Returns an iterator over the living agents.
    pub fn iter_agents(&self) -> impl Iterator<Item = (AgentId, &Agent)> {
        self.agents.iter()
    }

    /// Gets a reference to an agent.
    pub fn get_agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// The number of living agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Finds a route between two OSM node ids, in identifier form.
    pub fn find_route(&self, origin_id: i64, goal_id: i64) -> Result<Route> {
        let index_route = self.find_index_route_ids(origin_id, goal_id)?;
        Ok(self.traffic.id_route(&self.graph, &index_route))
    }

    /// Finds a route between two OSM node ids, in index form.
    pub fn find_index_route_ids(&self, origin_id: i64, goal_id: i64) -> Result<IndexRoute> {
        let origin = self.node_index(origin_id)?;
        let goal = self.node_index(goal_id)?;
        Ok(route::find_index_route(&self.traffic, origin, goal))
    }

    /// Spawns an agent between two OSM node ids.
    pub fn spawn_agent(
        &mut self,
        origin_id: i64,
        goal_id: i64,
        attributes: &PhysicalAttributes,
    ) -> Result<AgentId> {
        let origin = self.node_index(origin_id)?;
        let goal = self.node_index(goal_id)?;
        Ok(self.spawn_agent_at(origin, goal, attributes))
    }

    /// Spawns an agent between two traffic graph node indices.
    ///
    /// The route is requested on the agent's first update; an
    /// unreachable goal leaves the agent dead after the first step.
    pub fn spawn_agent_at(
        &mut self,
        origin: usize,
        goal: usize,
        attributes: &PhysicalAttributes,
    ) -> AgentId {
        let serial = self.next_serial;
        self.next_serial += 1;
        let position = self.traffic.node(origin).plane;
        self.agents
            .insert(Agent::new(serial, origin, goal, position, attributes))
    }

    /// Spawns agents between randomly chosen distinct nodes.
    pub fn spawn_random_agents(
        &mut self,
        count: usize,
        attributes: &PhysicalAttributes,
        rng: &mut impl Rng,
    ) -> Vec<AgentId> {
        let nodes = self.traffic.len();
        if nodes < 2 {
            return Vec::new();
        }
        (0..count)
            .map(|_| {
                let origin = rng.gen_range(0..nodes);
                let goal = loop {
                    let candidate = rng.gen_range(0..nodes);
                    if candidate != origin {
                        break candidate;
                    }
                };
                self.spawn_agent_at(origin, goal, attributes)
            })
            .collect()
    }

    /// Randomly assigns a desired-speed adjustment factor to each
    /// agent, sampled from a normal distribution with mean 1 and the
    /// given standard deviation, clamped to `[0.75, 1.25]`.
    pub fn randomise_agent_speeds(&mut self, stddev: f32) {
        let mut rand = rand::thread_rng();
        let distr = rand_distr::Normal::new(1.0f32, stddev).expect("Invalid standard deviation");
        for (_, agent) in &mut self.agents {
            let factor = distr.sample(&mut rand).clamp(0.75, 1.25);
            agent.set_speed_adjust(factor);
        }
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// All schedulers run first, so every gate decision reflects the
    /// state at the beginning of the step; agents then run in
    /// ascending serial order; dead agents are reaped last and appear
    /// in [World::reaped] until the next step.
    pub fn step(&mut self, dt: f32) {
        self.reaped.clear();
        self.update_schedulers(dt);
        self.update_agents(dt);
        self.reap_agents();
        self.frame += 1;
    }

    /// Runs every node's scheduler against beginning-of-step state.
    fn update_schedulers(&mut self, dt: f32) {
        for index in 0..self.traffic.len() {
            let scheduler = self.traffic.node(index).scheduler;
            let mut gates = std::mem::take(&mut self.traffic.node_mut(index).gates);
            scheduler.update(dt, index, &self.traffic, &self.agents, &mut gates);
            self.traffic.node_mut(index).gates = gates;
        }
    }

    /// Steps every agent, in ascending serial order.
    fn update_agents(&mut self, dt: f32) {
        let mut order: Vec<(u64, AgentId)> = self
            .agents
            .iter()
            .map(|(key, agent)| (agent.serial, key))
            .collect();
        order.sort_unstable();
        for (_, key) in order {
            self.step_agent(key, dt);
        }
    }

    /// Removes dead agents from the population and edge occupancy.
    fn reap_agents(&mut self) {
        let dead: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|(_, agent)| !agent.is_alive())
            .map(|(key, _)| key)
            .collect();
        for key in dead {
            if let Some(agent) = self.agents.remove(key) {
                if let Some(edge_ref) = agent.current_edge {
                    self.traffic
                        .edge_mut(edge_ref)
                        .agents
                        .retain(|id| *id != key);
                }
                self.reaped.push(ReapedAgent {
                    serial: agent.serial,
                    origin: agent.origin,
                    goal: agent.goal,
                    cause: agent.cause.unwrap_or(ReapCause::Stuck),
                });
            }
        }
    }

    /// Advances a single agent.
    fn step_agent(&mut self, key: AgentId, dt: f32) {
        if !self.agents[key].is_alive() {
            return;
        }

        // Route on demand; an unreachable goal means the agent is
        // stuck and dies on its first step.
        if self.agents[key].current_edge.is_none() && !self.enter_first_edge(key) {
            return;
        }

        let edge_ref = self.agents[key].current_edge.unwrap();
        let (goal_index, distance, max_allowed, max_speed) = {
            let edge = self.traffic.edge(edge_ref);
            (
                edge.goal_index,
                edge.distance,
                edge.max_allowed_speed,
                edge.max_speed,
            )
        };

        // An agent already at the stop line resolves its node
        // transition; one that reaches it this step waits, so a gate
        // opened this step can never be passed in the same step.
        if self.agents[key].edge_position >= distance - STOP_LINE_EPSILON {
            self.resolve_transition(key, edge_ref, goal_index);
            return;
        }

        // Kinematics: accelerate, clamp by the speed limit, clamp by
        // spacing, integrate, then resolve end-of-edge.
        let agent = &self.agents[key];
        let limit = (max_allowed * agent.speed_adjust).min(max_speed);
        let mut speed = (agent.physical.speed + agent.physical.max_acc * dt).min(limit);
        let position = agent.edge_position;
        if let Some(lead) = self.leading_position(edge_ref, key) {
            let max_position = (lead - AGENT_SPACING).max(position);
            speed = speed.min((max_position - position) / dt);
        }
        let speed = speed.max(0.0);
        let reached_end = position + speed * dt >= distance;
        {
            let agent = &mut self.agents[key];
            agent.edge_position = (position + speed * dt).min(distance);
            agent.physical.speed = if reached_end { 0.0 } else { speed };
        }
        self.update_plane_position(key, edge_ref);

        // Arrival at the goal is not gated.
        if reached_end && goal_index == self.agents[key].goal {
            self.arrive(key, goal_index);
        }
    }

    /// Requests a route and places the agent on its first edge.
    /// Returns false if the agent died instead.
    fn enter_first_edge(&mut self, key: AgentId) -> bool {
        let (serial, origin, goal) = {
            let agent = &self.agents[key];
            (agent.serial, agent.origin, agent.goal)
        };
        let found = route::find_index_route(&self.traffic, origin, goal);
        if found.len() < 2 {
            debug!("agent {serial} is stuck: no route from {origin} to {goal}");
            self.agents[key].kill(ReapCause::Stuck);
            return false;
        }
        let Some(edge) = self.traffic.connection_to(found[0], found[1]) else {
            warn!("agent {serial}: missing edge {} -> {}; failing closed", found[0], found[1]);
            self.agents[key].kill(ReapCause::Stuck);
            return false;
        };
        let edge_ref = EdgeRef {
            node: found[0],
            edge,
        };
        self.traffic.edge_mut(edge_ref).agents.push(key);
        let agent = &mut self.agents[key];
        agent.route = found;
        agent.route_cursor = 0;
        agent.current_edge = Some(edge_ref);
        agent.edge_position = 0.0;
        true
    }

    /// Resolves a waiting agent's transition through a node.
    fn resolve_transition(&mut self, key: AgentId, edge_ref: EdgeRef, node_index: usize) {
        let (serial, goal) = {
            let agent = &self.agents[key];
            (agent.serial, agent.goal)
        };
        if node_index == goal {
            self.arrive(key, node_index);
            return;
        }

        // The next hop; replan when the route is exhausted short of
        // the goal.
        let next = {
            let agent = &self.agents[key];
            agent
                .route
                .get(agent.route_cursor + 2)
                .copied()
                .map(|hop| (hop, agent.route_cursor + 1))
        };
        let (next_hop, next_cursor) = match next {
            Some(pair) => pair,
            None => {
                let mut replanned = route::find_index_route(&self.traffic, node_index, goal);
                if replanned.len() < 2 {
                    debug!("agent {serial} is stuck at node {node_index}");
                    self.agents[key].kill(ReapCause::Stuck);
                    return;
                }
                // Prepend the departed node so the cursor invariant
                // (current edge = route[cursor] -> route[cursor + 1])
                // holds whether or not the gate opens this step.
                let hop = replanned[1];
                replanned.insert(0, self.agents[key].last_node);
                let agent = &mut self.agents[key];
                agent.route = replanned;
                agent.route_cursor = 0;
                (hop, 1)
            }
        };

        let Some(lane) = self.traffic.incoming_index(edge_ref) else {
            warn!("agent {serial}: edge has no incoming lane at node {node_index}; failing closed");
            self.agents[key].kill(ReapCause::Stuck);
            return;
        };
        let Some(connection) = self.traffic.connection_to(node_index, next_hop) else {
            warn!("agent {serial}: missing edge {node_index} -> {next_hop}; failing closed");
            self.agents[key].kill(ReapCause::Stuck);
            return;
        };

        if !self.traffic.node(node_index).gates.is_open(lane, connection) {
            self.agents[key].physical.speed = 0.0;
            return;
        }

        let next_ref = EdgeRef {
            node: node_index,
            edge: connection,
        };
        self.traffic.edge_mut(edge_ref).agents.retain(|id| *id != key);
        self.traffic.edge_mut(next_ref).agents.push(key);
        let plane = self.traffic.node(node_index).plane;
        let agent = &mut self.agents[key];
        agent.current_edge = Some(next_ref);
        agent.route_cursor = next_cursor;
        agent.edge_position = 0.0;
        agent.last_node = node_index;
        agent.physical.position = plane;
    }

    /// Marks an agent as arrived at its goal node.
    fn arrive(&mut self, key: AgentId, node_index: usize) {
        let plane = self.traffic.node(node_index).plane;
        let agent = &mut self.agents[key];
        agent.physical.position = plane;
        agent.last_node = node_index;
        agent.kill(ReapCause::Arrived);
        debug!("agent {} arrived at node {node_index}", agent.serial);
    }

    /// The edge position of the agent immediately ahead, if any.
    fn leading_position(&self, edge_ref: EdgeRef, key: AgentId) -> Option<f32> {
        let edge = self.traffic.edge(edge_ref);
        let own = edge.agents.iter().position(|id| *id == key)?;
        let lead = *edge.agents.get(own.checked_sub(1)?)?;
        self.agents.get(lead).map(|agent| agent.edge_position)
    }

    /// Interpolates the agent's plane position along its edge.
    fn update_plane_position(&mut self, key: AgentId, edge_ref: EdgeRef) {
        let edge = self.traffic.edge(edge_ref);
        let from = self.traffic.node(edge_ref.node).plane;
        let to = self.traffic.node(edge.goal_index).plane;
        let t = if edge.distance > 0.0 {
            (self.agents[key].edge_position / edge.distance).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.agents[key].physical.position = from + (to - from) * t;
    }

    /// Resolves an OSM node id to its traffic graph index.
    fn node_index(&self, id: i64) -> Result<usize> {
        self.graph.index_of(id).ok_or(Error::NotFound {
            id,
            kind: EntityKind::Node,
        })
    }
}
