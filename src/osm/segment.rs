use super::{Node, Relation, Tagged, Way};
use crate::error::{EntityKind, Error, Result};
use crate::geo::{Circle, Point, Projection, Rect};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A predicate set driving [Segment::find_nodes] selective copies.
///
/// The entity predicates decide which entities are copied at all; the
/// pair predicates decide which references survive on a copied entity.
/// Relation members additionally require their referent to exist in
/// the newly built segment.
pub struct Finder<'a> {
    /// Whether a node is copied on its own account.
    pub accept_node: Box<dyn Fn(&Node) -> bool + 'a>,
    /// Whether a way is copied.
    pub accept_way: Box<dyn Fn(&Way) -> bool + 'a>,
    /// Whether a relation is copied.
    pub accept_relation: Box<dyn Fn(&Relation) -> bool + 'a>,
    /// Whether a copied way keeps a given node reference.
    pub accept_way_node: Box<dyn Fn(&Way, &Node) -> bool + 'a>,
    /// Whether a copied relation keeps a given node member.
    pub accept_relation_node: Box<dyn Fn(&Relation, &Node) -> bool + 'a>,
    /// Whether a copied relation keeps a given way member.
    pub accept_relation_way: Box<dyn Fn(&Relation, &Way) -> bool + 'a>,
    /// Whether a copied relation keeps a given relation member.
    pub accept_relation_relation: Box<dyn Fn(&Relation, &Relation) -> bool + 'a>,
}

impl<'a> Finder<'a> {
    /// A finder that copies everything.
    pub fn accept_all() -> Self {
        Self {
            accept_node: Box::new(|_| true),
            accept_way: Box::new(|_| true),
            accept_relation: Box::new(|_| true),
            accept_way_node: Box::new(|_, _| true),
            accept_relation_node: Box::new(|_, _| true),
            accept_relation_way: Box::new(|_, _| true),
            accept_relation_relation: Box::new(|_, _| true),
        }
    }
}

impl Default for Finder<'_> {
    fn default() -> Self {
        Self::accept_all()
    }
}

/// An in-memory collection of OSM entities with id lookup maps
/// and a tight bounding box over its nodes.
///
/// A segment may be a filtered window over a larger dataset, so way
/// references are allowed to dangle; copies silently drop references
/// that do not resolve.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Segment {
    /// The nodes, in insertion order.
    nodes: Vec<Node>,
    /// The ways, in insertion order.
    ways: Vec<Way>,
    /// The relations, in insertion order.
    relations: Vec<Relation>,
    /// Node id to index; node ids are unique.
    #[serde(skip)]
    node_map: HashMap<i64, usize>,
    /// Way id to indices; split fragments share an id.
    #[serde(skip)]
    way_map: HashMap<i64, Vec<usize>>,
    /// Relation id to indices.
    #[serde(skip)]
    relation_map: HashMap<i64, Vec<usize>>,
    /// The tight bounding box over all nodes, if any.
    #[serde(skip)]
    bounds: Option<Rect>,
}

impl Segment {
    /// Creates an empty segment.
    pub fn new() -> Self {
        Default::default()
    }

    /// The nodes, in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The ways, in insertion order.
    pub fn ways(&self) -> &[Way] {
        &self.ways
    }

    /// The relations, in insertion order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// The tight bounding box over all contained nodes.
    /// An empty segment has a degenerate box at the origin.
    pub fn bounding_box(&self) -> Rect {
        self.bounds.unwrap_or_default()
    }

    /// Adds a node, unless a node with this id already exists.
    /// The bounding box is extended to include the new point.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.node_map.contains_key(&node.id) {
            return false;
        }
        self.extend_bounds(node.position());
        self.node_map.insert(node.id, self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Adds a way, unless a way with this `(id, sub_index)` exists.
    pub fn add_way(&mut self, way: Way) -> bool {
        if let Some(indices) = self.way_map.get(&way.id) {
            if indices.iter().any(|i| self.ways[*i].sub_index == way.sub_index) {
                return false;
            }
        }
        self.way_map.entry(way.id).or_default().push(self.ways.len());
        self.ways.push(way);
        true
    }

    /// Adds a relation, unless one with this `(id, sub_index)` exists.
    pub fn add_relation(&mut self, relation: Relation) -> bool {
        if let Some(indices) = self.relation_map.get(&relation.id) {
            if indices
                .iter()
                .any(|i| self.relations[*i].sub_index == relation.sub_index)
            {
                return false;
            }
        }
        self.relation_map
            .entry(relation.id)
            .or_default()
            .push(self.relations.len());
        self.relations.push(relation);
        true
    }

    /// Copies a way and every node it references from `source`.
    /// References that do not resolve in `source` are dropped silently.
    pub fn add_way_recursive(&mut self, way: &Way, source: &Segment) {
        for ref_id in &way.refs {
            if let Ok(node) = source.get_node(*ref_id) {
                self.add_node(node.clone());
            }
        }
        self.add_way(way.clone());
    }

    /// Copies a relation, its member nodes and ways (recursively for
    /// ways), and every transitively referenced relation from `source`.
    ///
    /// Real data contains relation cycles; recursion terminates on the
    /// already-present check, keyed by `(id, sub_index)`.
    pub fn add_relation_recursive(&mut self, relation: &Relation, source: &Segment) {
        if !self.add_relation(relation.clone()) {
            return;
        }
        for member in &relation.node_members {
            if let Ok(node) = source.get_node(member.ref_id) {
                self.add_node(node.clone());
            }
        }
        for member in &relation.way_members {
            for way in source.get_ways(member.ref_id) {
                self.add_way_recursive(way, source);
            }
        }
        for member in &relation.relation_members {
            let children: Vec<Relation> =
                source.get_relations(member.ref_id).into_iter().cloned().collect();
            for child in children {
                self.add_relation_recursive(&child, source);
            }
        }
    }

    /// Gets the node with the given id.
    pub fn get_node(&self, id: i64) -> Result<&Node> {
        self.node_map
            .get(&id)
            .map(|i| &self.nodes[*i])
            .ok_or(Error::NotFound {
                id,
                kind: EntityKind::Node,
            })
    }

    /// Gets the index of the node with the given id.
    pub fn node_index(&self, id: i64) -> Result<usize> {
        self.node_map.get(&id).copied().ok_or(Error::NotFound {
            id,
            kind: EntityKind::Node,
        })
    }

    /// Gets all fragments of the way with the given id, in index order.
    /// An unknown id yields an empty list.
    pub fn get_ways(&self, id: i64) -> Vec<&Way> {
        self.way_map
            .get(&id)
            .map(|indices| indices.iter().map(|i| &self.ways[*i]).collect())
            .unwrap_or_default()
    }

    /// Gets all fragments of the relation with the given id.
    pub fn get_relations(&self, id: i64) -> Vec<&Relation> {
        self.relation_map
            .get(&id)
            .map(|indices| indices.iter().map(|i| &self.relations[*i]).collect())
            .unwrap_or_default()
    }

    /// Performs a selective copy driven by the given finder.
    ///
    /// Accepted ways pull in their accepted referenced nodes; accepted
    /// relations keep only the members whose predicates pass and whose
    /// referents already exist in the result.
    pub fn find_nodes(&self, finder: &Finder) -> Segment {
        let mut result = Segment::new();

        for node in &self.nodes {
            if (finder.accept_node)(node) {
                result.add_node(node.clone());
            }
        }

        for way in &self.ways {
            if !(finder.accept_way)(way) {
                continue;
            }
            let mut copy = way.clone();
            copy.refs.retain(|ref_id| match self.get_node(*ref_id) {
                Ok(node) => {
                    if (finder.accept_way_node)(way, node) {
                        result.add_node(node.clone());
                        true
                    } else {
                        false
                    }
                }
                // A dangling ref; the segment may be a window.
                Err(_) => false,
            });
            result.add_way(copy);
        }

        for relation in &self.relations {
            if !(finder.accept_relation)(relation) {
                continue;
            }
            let mut copy = relation.clone();
            copy.node_members.retain(|m| match self.get_node(m.ref_id) {
                Ok(node) => {
                    (finder.accept_relation_node)(relation, node)
                        && result.node_map.contains_key(&m.ref_id)
                }
                Err(_) => false,
            });
            copy.way_members.retain(|m| {
                self.get_ways(m.ref_id)
                    .iter()
                    .any(|way| (finder.accept_relation_way)(relation, way))
                    && result.way_map.contains_key(&m.ref_id)
            });
            copy.relation_members.retain(|m| {
                self.get_relations(m.ref_id)
                    .iter()
                    .any(|rel| (finder.accept_relation_relation)(relation, rel))
                    && result.relation_map.contains_key(&m.ref_id)
            });
            result.add_relation(copy);
        }

        result
    }

    /// Copies the entities whose nodes lie within the rectangle.
    pub fn find_square_nodes(&self, rect: Rect) -> Segment {
        self.find_nodes(&Finder {
            accept_node: Box::new(move |n| rect.contains(n.position())),
            accept_way_node: Box::new(move |_, n| rect.contains(n.position())),
            accept_relation_node: Box::new(move |_, n| rect.contains(n.position())),
            ..Finder::accept_all()
        })
    }

    /// Copies the entities whose nodes lie within the circle.
    pub fn find_circle_node(&self, circle: Circle) -> Segment {
        self.find_nodes(&Finder {
            accept_node: Box::new(move |n| circle.contains(n.position())),
            accept_way_node: Box::new(move |_, n| circle.contains(n.position())),
            accept_relation_node: Box::new(move |_, n| circle.contains(n.position())),
            ..Finder::accept_all()
        })
    }

    /// Copies the nodes carrying a tag with the given key.
    pub fn find_tag_nodes(&self, key: &str) -> Segment {
        self.find_nodes(&Finder {
            accept_node: Box::new(move |n| n.has_tag(key)),
            accept_way: Box::new(|_| false),
            accept_relation: Box::new(|_| false),
            ..Finder::accept_all()
        })
    }

    /// Copies the ways carrying a tag with the given key,
    /// together with the nodes they reference.
    pub fn find_tag_ways(&self, key: &str) -> Segment {
        self.find_nodes(&Finder {
            accept_node: Box::new(|_| false),
            accept_way: Box::new(move |w| w.has_tag(key)),
            accept_relation: Box::new(|_| false),
            ..Finder::accept_all()
        })
    }

    /// Finds the ids of nodes whose address tags match every
    /// non-empty argument.
    pub fn find_address(
        &self,
        city: &str,
        postcode: &str,
        street: &str,
        housenumber: &str,
    ) -> Vec<i64> {
        let fields = [
            ("addr:city", city),
            ("addr:postcode", postcode),
            ("addr:street", street),
            ("addr:housenumber", housenumber),
        ];
        self.nodes
            .iter()
            .filter(|node| {
                fields
                    .iter()
                    .filter(|(_, value)| !value.is_empty())
                    .all(|(key, value)| node.has_tag_value(key, value))
            })
            .map(|node| node.id)
            .collect()
    }

    /// Finds the id of the node closest to the given position,
    /// by projected distance. Linear scan.
    pub fn find_closest_node(&self, lat: f64, lon: f64) -> Option<i64> {
        let projection = Projection::new(self.bounding_box().center());
        let target = Point::new(lat, lon);
        self.nodes
            .iter()
            .map(|node| (node.id, projection.distance(node.position(), target)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Rebuilds the three id maps from the entity vectors.
    /// With `merge`, existing entries are kept and missing ones added.
    pub fn reindex(&mut self, merge: bool) {
        if !merge {
            self.node_map.clear();
            self.way_map.clear();
            self.relation_map.clear();
        }
        for (index, node) in self.nodes.iter().enumerate() {
            self.node_map.entry(node.id).or_insert(index);
        }
        for (index, way) in self.ways.iter().enumerate() {
            let indices = self.way_map.entry(way.id).or_default();
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
        for (index, relation) in self.relations.iter().enumerate() {
            let indices = self.relation_map.entry(relation.id).or_default();
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
    }

    /// Recomputes the tight bounding box by sweeping all nodes.
    pub fn recalculate_boundaries(&mut self) {
        self.bounds = None;
        for index in 0..self.nodes.len() {
            let position = self.nodes[index].position();
            self.extend_bounds(position);
        }
    }

    /// Serializes the segment to its diagnostic JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Loads a segment from its diagnostic JSON form; id maps and the
    /// bounding box are reconstructed.
    pub fn from_json(json: &str) -> serde_json::Result<Segment> {
        let mut segment: Segment = serde_json::from_str(json)?;
        segment.reindex(false);
        segment.recalculate_boundaries();
        Ok(segment)
    }

    /// Appends a node without touching the id maps or bounds;
    /// used by the parser, which reindexes once at the end.
    pub(crate) fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Appends a way without touching the id maps.
    pub(crate) fn push_way(&mut self, way: Way) {
        self.ways.push(way);
    }

    /// Appends a relation without touching the id maps.
    pub(crate) fn push_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    /// Checks the internal consistency of the id maps: every entry
    /// must point at a valid index whose entity carries the mapped id.
    /// Diagnostic only.
    pub fn audit_maps(&self) -> bool {
        let nodes_ok = self
            .node_map
            .iter()
            .all(|(id, i)| self.nodes.get(*i).map(|n| n.id == *id).unwrap_or(false));
        let ways_ok = self.way_map.iter().all(|(id, indices)| {
            indices
                .iter()
                .all(|i| self.ways.get(*i).map(|w| w.id == *id).unwrap_or(false))
        });
        let relations_ok = self.relation_map.iter().all(|(id, indices)| {
            indices
                .iter()
                .all(|i| self.relations.get(*i).map(|r| r.id == *id).unwrap_or(false))
        });
        nodes_ok && ways_ok && relations_ok
    }

    /// The set of node ids referenced by ways but absent from the
    /// segment. Diagnostic only; a filtered segment legitimately
    /// dangles.
    pub fn dangling_refs(&self) -> HashSet<i64> {
        self.ways
            .iter()
            .flat_map(|way| way.refs.iter())
            .filter(|id| !self.node_map.contains_key(id))
            .copied()
            .collect()
    }

    fn extend_bounds(&mut self, point: Point) {
        match &mut self.bounds {
            Some(bounds) => bounds.extend(point),
            None => {
                self.bounds = Some(Rect::from_borders(point.lat, point.lat, point.lon, point.lon))
            }
        }
    }
}
