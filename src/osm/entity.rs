use crate::error::{Error, Result};
use crate::geo::Point;
use serde::{Deserialize, Serialize};

/// An ordered bag of `(key, value)` tag pairs.
///
/// Tag counts are typically below ten, so lookups are linear scans;
/// a map would cost more in both memory and cache misses.
pub type Tags = Vec<(String, String)>;

/// Common accessors shared by all OSM entity kinds.
pub trait Tagged {
    /// The entity's tag bag, in document order.
    fn tags(&self) -> &Tags;

    /// Returns true if a tag with the given key exists.
    fn has_tag(&self, key: &str) -> bool {
        self.tags().iter().any(|(k, _)| k == key)
    }

    /// Returns true if a tag with the given key and value exists.
    fn has_tag_value(&self, key: &str, value: &str) -> bool {
        self.tags().iter().any(|(k, v)| k == key && v == value)
    }

    /// Gets the value of the tag with the given key.
    fn value(&self, key: &str) -> Result<&str> {
        self.tags()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| Error::MissingTag(key.to_owned()))
    }
}

/// A single OSM node: a tagged geographic position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// The OSM id; negative values are legal.
    pub id: i64,
    /// The OSM version.
    pub version: i32,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// The tag bag.
    #[serde(default)]
    pub tags: Tags,
}

impl Node {
    /// Creates an untagged node.
    pub fn new(id: i64, version: i32, lat: f64, lon: f64) -> Self {
        Self {
            id,
            version,
            lat,
            lon,
            tags: Tags::new(),
        }
    }

    /// The node's geographic position.
    pub fn position(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}

impl Tagged for Node {
    fn tags(&self) -> &Tags {
        &self.tags
    }
}

/// A single OSM way: an ordered polyline of node references.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Way {
    /// The OSM id.
    pub id: i64,
    /// The OSM version.
    pub version: i32,
    /// Distinguishes fragments of a way that was split during
    /// chunking; `(id, sub_index)` identifies a fragment.
    #[serde(rename = "subIndex", default)]
    pub sub_index: i32,
    /// Referenced node ids, in polyline order.
    #[serde(rename = "nodes", default)]
    pub refs: Vec<i64>,
    /// The tag bag.
    #[serde(default)]
    pub tags: Tags,
}

impl Way {
    /// Creates an untagged way.
    pub fn new(id: i64, version: i32) -> Self {
        Self {
            id,
            version,
            sub_index: 0,
            refs: Vec::new(),
            tags: Tags::new(),
        }
    }
}

impl Tagged for Way {
    fn tags(&self) -> &Tags {
        &self.tags
    }
}

/// A reference to another entity from within a relation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationMember {
    /// The id of the referenced entity.
    #[serde(rename = "index")]
    pub ref_id: i64,
    /// The member's role within the relation.
    #[serde(default)]
    pub role: String,
}

impl RelationMember {
    /// Creates a new member reference.
    pub fn new(ref_id: i64, role: impl Into<String>) -> Self {
        Self {
            ref_id,
            role: role.into(),
        }
    }
}

/// A single OSM relation: a tagged group of member entities.
///
/// Relations may reference other relations, including themselves
/// through a cycle; recursive copies must guard against that.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// The OSM id.
    pub id: i64,
    /// The OSM version.
    pub version: i32,
    /// Distinguishes fragments, as for [Way::sub_index].
    #[serde(rename = "subIndex", default)]
    pub sub_index: i32,
    /// The tag bag.
    #[serde(default)]
    pub tags: Tags,
    /// Node members.
    #[serde(rename = "nodes", default)]
    pub node_members: Vec<RelationMember>,
    /// Way members.
    #[serde(rename = "ways", default)]
    pub way_members: Vec<RelationMember>,
    /// Relation members.
    #[serde(rename = "relations", default)]
    pub relation_members: Vec<RelationMember>,
}

impl Relation {
    /// Creates an untagged relation with no members.
    pub fn new(id: i64, version: i32) -> Self {
        Self {
            id,
            version,
            ..Default::default()
        }
    }
}

impl Tagged for Relation {
    fn tags(&self) -> &Tags {
        &self.tags
    }
}
