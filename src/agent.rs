//! Simulated agents and their physical state.

use crate::geo::Point2f;
use crate::route::IndexRoute;
use crate::traffic::EdgeRef;

/// Standard gravity, in m/s^2.
pub const GRAVITY: f32 = 9.81;

/// The lifecycle state of an agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AgentState {
    /// Participating in the simulation.
    #[default]
    Alive,
    /// Finished or stuck; reaped at the end of the step.
    Dead,
}

/// Why an agent left the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReapCause {
    /// The agent reached its goal.
    Arrived,
    /// No route to the goal existed, or the route failed closed.
    Stuck,
}

/// The physical attributes an agent is created with.
#[derive(Clone, Copy, Debug)]
pub struct PhysicalAttributes {
    /// The mass in kg; must be positive.
    pub mass: f32,
    /// The tire friction coefficient.
    pub tire_friction: f32,
    /// The maximum acceleration in m/s^2.
    pub max_acc: f32,
    /// The maximum deceleration in m/s^2, a positive number.
    pub max_dec: f32,
}

impl Default for PhysicalAttributes {
    fn default() -> Self {
        Self {
            mass: 1200.0,
            tire_friction: 1.0,
            max_acc: 2.5,
            max_dec: 6.0,
        }
    }
}

/// The physical state of an agent.
///
/// Friction bounds both acceleration limits; the clamp happens once
/// at construction, not per step.
#[derive(Clone, Copy, Debug)]
pub struct PhysicalEntity {
    /// The position in plane coordinates.
    pub position: Point2f,
    /// The current speed; never negative.
    pub speed: f32,
    /// The mass in kg.
    pub mass: f32,
    /// The tire friction coefficient.
    pub tire_friction: f32,
    /// The maximum acceleration, clamped to `g * tire_friction`.
    pub max_acc: f32,
    /// The maximum deceleration, clamped to `g * tire_friction`.
    pub max_dec: f32,
}

impl PhysicalEntity {
    /// Creates a physical entity at rest at the given position.
    pub fn new(position: Point2f, attributes: &PhysicalAttributes) -> Self {
        assert!(attributes.mass > 0.0, "agent mass must be positive");
        let grip = GRAVITY * attributes.tire_friction;
        Self {
            position,
            speed: 0.0,
            mass: attributes.mass,
            tire_friction: attributes.tire_friction,
            max_acc: attributes.max_acc.min(grip),
            max_dec: attributes.max_dec.min(grip),
        }
    }
}

/// A simulated agent travelling across the traffic graph.
#[derive(Clone, Debug)]
pub struct Agent {
    /// A monotonically increasing id; the world steps agents in
    /// ascending id order for reproducibility.
    pub(crate) serial: u64,
    /// The physical state.
    pub(crate) physical: PhysicalEntity,
    /// The planned route, as traffic graph indices.
    pub(crate) route: IndexRoute,
    /// The route entry the current edge departs from.
    pub(crate) route_cursor: usize,
    /// The edge the agent is currently on, once routed.
    pub(crate) current_edge: Option<EdgeRef>,
    /// Progress along the current edge, in metres.
    pub(crate) edge_position: f32,
    /// The node most recently departed.
    pub(crate) last_node: usize,
    /// The origin node index.
    pub(crate) origin: usize,
    /// The goal node index.
    pub(crate) goal: usize,
    /// A desired-speed adjustment factor applied to speed limits.
    pub(crate) speed_adjust: f32,
    /// The lifecycle state.
    pub(crate) state: AgentState,
    /// Why the agent died, once it has.
    pub(crate) cause: Option<ReapCause>,
}

impl Agent {
    /// Creates an agent at its origin, not yet routed.
    pub(crate) fn new(
        serial: u64,
        origin: usize,
        goal: usize,
        position: Point2f,
        attributes: &PhysicalAttributes,
    ) -> Self {
        Self {
            serial,
            physical: PhysicalEntity::new(position, attributes),
            route: IndexRoute::new(),
            route_cursor: 0,
            current_edge: None,
            edge_position: 0.0,
            last_node: origin,
            origin,
            goal,
            speed_adjust: 1.0,
            state: AgentState::Alive,
            cause: None,
        }
    }

    /// The agent's ordering id.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// The physical state.
    pub fn physical(&self) -> &PhysicalEntity {
        &self.physical
    }

    /// The agent's position in plane coordinates.
    pub fn position(&self) -> Point2f {
        self.physical.position
    }

    /// The current speed.
    pub fn speed(&self) -> f32 {
        self.physical.speed
    }

    /// The planned route.
    pub fn route(&self) -> &IndexRoute {
        &self.route
    }

    /// The edge the agent is on, if routed.
    pub fn current_edge(&self) -> Option<EdgeRef> {
        self.current_edge
    }

    /// Progress along the current edge.
    pub fn edge_position(&self) -> f32 {
        self.edge_position
    }

    /// The origin node index.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// The goal node index.
    pub fn goal(&self) -> usize {
        self.goal
    }

    /// The lifecycle state.
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Whether the agent is alive.
    pub fn is_alive(&self) -> bool {
        self.state == AgentState::Alive
    }

    /// Sets the desired-speed adjustment factor.
    pub(crate) fn set_speed_adjust(&mut self, factor: f32) {
        self.speed_adjust = factor;
    }

    /// Transitions the agent to the dead state.
    pub(crate) fn kill(&mut self, cause: ReapCause) {
        self.state = AgentState::Dead;
        self.cause = Some(cause);
        self.physical.speed = 0.0;
    }
}
