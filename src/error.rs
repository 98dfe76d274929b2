//! Crate-wide error type.

use std::fmt;
use thiserror::Error;

/// The kind of OSM entity an operation was looking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Way,
    Relation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Node => "node",
            EntityKind::Way => "way",
            EntityKind::Relation => "relation",
        };
        f.write_str(name)
    }
}

/// The errors surfaced by the crate.
///
/// Per-entity, per-agent and per-route conditions are not errors;
/// they are absorbed as sentinel values (a skipped entity, a `Dead`
/// agent, an empty route).
#[derive(Debug, Error)]
pub enum Error {
    /// The document has no readable `<osm>` root.
    #[error("malformed OSM document: {0}")]
    MalformedDocument(String),
    /// An id-keyed accessor did not resolve.
    #[error("{kind} {id} not found")]
    NotFound { id: i64, kind: EntityKind },
    /// A required tag is absent from an entity.
    #[error("missing tag {0:?}")]
    MissingTag(String),
}

pub type Result<T> = std::result::Result<T, Error>;
