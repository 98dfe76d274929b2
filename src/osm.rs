//! OpenStreetMap entities, segments and the XML parser.

pub use entity::{Node, Relation, RelationMember, Tagged, Way};
pub use parser::parse_xml;
pub use segment::{Finder, Segment};

mod entity;
mod parser;
mod segment;
