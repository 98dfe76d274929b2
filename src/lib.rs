//! A city-scale road-network traffic simulator over OpenStreetMap
//! extracts: parallel XML ingest, routing-graph distillation, A*
//! route finding and a discrete-time agent simulation with
//! per-intersection gate scheduling.

pub use agent::{Agent, AgentState, PhysicalAttributes, PhysicalEntity, ReapCause};
pub use cgmath;
pub use error::{EntityKind, Error, Result};
pub use geo::{Circle, Point, Point2d, Point2f, Projection, Rect, EARTH_RADIUS_KM};
pub use graph::{AuditIssue, Graph, GraphEdge, GraphNode};
pub use osm::{parse_xml, Finder, Node, Relation, RelationMember, Segment, Tagged, Way};
pub use pool::{ScopedPool, TaskPool};
pub use route::{find_index_route, IndexRoute, Route, MAX_DISTANCE_SCALE};
pub use scheduler::Scheduler;
pub use slotmap::{Key, KeyData};
pub use traffic::{EdgeRef, GateMatrix, TrafficEdge, TrafficGraph, TrafficNode};
pub use world::{ReapedAgent, World, AGENT_SPACING};

use slotmap::{new_key_type, SlotMap};

mod agent;
mod error;
pub mod geo;
mod graph;
mod osm;
mod pool;
mod route;
mod scheduler;
mod traffic;
mod world;

new_key_type! {
    /// Unique ID of an [Agent].
    pub struct AgentId;
}

type AgentSet = SlotMap<AgentId, Agent>;
