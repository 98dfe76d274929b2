use super::{Node, Relation, RelationMember, Segment, Way};
use crate::error::{Error, Result};
use crate::pool::TaskPool;
use log::warn;
use roxmltree::Document;
use std::str::FromStr;
use std::sync::Mutex;

/// The entities one worker produced, tagged with their output slots.
#[derive(Default)]
struct WorkerOutput {
    nodes: Vec<(usize, Node)>,
    ways: Vec<(usize, Way)>,
    relations: Vec<(usize, Relation)>,
}

/// Parses an OSM XML document into a segment, fanning the work out
/// across the given pool.
///
/// Worker `w` of `N` owns the same-kind children `w, w + N, w + 2N, …`
/// in document order, so the output is identical for any worker count.
/// A structurally broken entity is skipped with a log line; only an
/// unreadable document or a missing `<osm>` root fails the parse.
pub fn parse_xml(xml: &str, pool: &dyn TaskPool) -> Result<Segment> {
    let document =
        Document::parse(xml).map_err(|e| Error::MalformedDocument(e.to_string()))?;
    let osm = document
        .root()
        .children()
        .find(|child| child.has_tag_name("osm"))
        .ok_or_else(|| Error::MalformedDocument("missing <osm> root".to_owned()))?;

    // One counting pass to size the output vectors exactly.
    let mut counts = [0usize; 3];
    for child in osm.children() {
        match child.tag_name().name() {
            "node" => counts[0] += 1,
            "way" => counts[1] += 1,
            "relation" => counts[2] += 1,
            _ => {}
        }
    }

    let workers = pool.workers().max(1);
    let outputs: Vec<Mutex<WorkerOutput>> =
        (0..workers).map(|_| Mutex::new(Default::default())).collect();

    // Each worker walks the sibling list once, keeping per-kind
    // counters, and parses only the slots it owns. Slots are disjoint,
    // so no synchronization is needed beyond the join.
    pool.broadcast(&|worker| {
        let mut output = WorkerOutput::default();
        let mut slots = [0usize; 3];
        for child in osm.children() {
            match child.tag_name().name() {
                "node" => {
                    let slot = slots[0];
                    slots[0] += 1;
                    if slot % workers == worker {
                        if let Some(node) = parse_node(&child) {
                            output.nodes.push((slot, node));
                        }
                    }
                }
                "way" => {
                    let slot = slots[1];
                    slots[1] += 1;
                    if slot % workers == worker {
                        if let Some(way) = parse_way(&child) {
                            output.ways.push((slot, way));
                        }
                    }
                }
                "relation" => {
                    let slot = slots[2];
                    slots[2] += 1;
                    if slot % workers == worker {
                        if let Some(relation) = parse_relation(&child) {
                            output.relations.push((slot, relation));
                        }
                    }
                }
                _ => {}
            }
        }
        *outputs[worker].lock().expect("worker output poisoned") = output;
    });

    // Scatter into slot order; skipped slots stay empty and are
    // compacted out, preserving document order.
    let mut nodes: Vec<Option<Node>> = vec![None; counts[0]];
    let mut ways: Vec<Option<Way>> = vec![None; counts[1]];
    let mut relations: Vec<Option<Relation>> = vec![None; counts[2]];
    for output in outputs {
        let output = output.into_inner().expect("worker output poisoned");
        for (slot, node) in output.nodes {
            nodes[slot] = Some(node);
        }
        for (slot, way) in output.ways {
            ways[slot] = Some(way);
        }
        for (slot, relation) in output.relations {
            relations[slot] = Some(relation);
        }
    }

    let mut segment = Segment::new();
    for node in nodes.into_iter().flatten() {
        segment.push_node(node);
    }
    for way in ways.into_iter().flatten() {
        segment.push_way(way);
    }
    for relation in relations.into_iter().flatten() {
        segment.push_relation(relation);
    }
    segment.reindex(false);
    segment.recalculate_boundaries();
    Ok(segment)
}

/// Reads a typed attribute, if present and well formed.
fn attr<T: FromStr>(element: &roxmltree::Node, name: &str) -> Option<T> {
    element.attribute(name).and_then(|value| value.parse().ok())
}

/// Collects the `<tag k v>` children of an entity element.
fn parse_tags(element: &roxmltree::Node) -> Vec<(String, String)> {
    element
        .children()
        .filter(|child| child.has_tag_name("tag"))
        .filter_map(|tag| {
            let k = tag.attribute("k")?;
            let v = tag.attribute("v")?;
            Some((k.to_owned(), v.to_owned()))
        })
        .collect()
}

fn parse_node(element: &roxmltree::Node) -> Option<Node> {
    let (Some(id), Some(version), Some(lat), Some(lon)) = (
        attr::<i64>(element, "id"),
        attr::<i32>(element, "version"),
        attr::<f64>(element, "lat"),
        attr::<f64>(element, "lon"),
    ) else {
        warn!("skipping <node> with missing attributes: {:?}", element.attribute("id"));
        return None;
    };
    let mut node = Node::new(id, version, lat, lon);
    node.tags = parse_tags(element);
    Some(node)
}

fn parse_way(element: &roxmltree::Node) -> Option<Way> {
    let (Some(id), Some(version)) = (
        attr::<i64>(element, "id"),
        attr::<i32>(element, "version"),
    ) else {
        warn!("skipping <way> with missing attributes: {:?}", element.attribute("id"));
        return None;
    };
    let mut way = Way::new(id, version);
    way.refs = element
        .children()
        .filter(|child| child.has_tag_name("nd"))
        .filter_map(|nd| attr::<i64>(&nd, "ref"))
        .collect();
    way.tags = parse_tags(element);
    Some(way)
}

fn parse_relation(element: &roxmltree::Node) -> Option<Relation> {
    let (Some(id), Some(version)) = (
        attr::<i64>(element, "id"),
        attr::<i32>(element, "version"),
    ) else {
        warn!(
            "skipping <relation> with missing attributes: {:?}",
            element.attribute("id")
        );
        return None;
    };
    let mut relation = Relation::new(id, version);
    for member in element.children().filter(|c| c.has_tag_name("member")) {
        let Some(ref_id) = attr::<i64>(&member, "ref") else {
            warn!("skipping <member> without ref in relation {}", id);
            continue;
        };
        let role = member.attribute("role").unwrap_or_default().to_owned();
        match member.attribute("type") {
            Some("node") => relation.node_members.push(RelationMember::new(ref_id, role)),
            Some("way") => relation.way_members.push(RelationMember::new(ref_id, role)),
            Some("relation") => relation
                .relation_members
                .push(RelationMember::new(ref_id, role)),
            other => warn!("skipping <member> with type {:?} in relation {}", other, id),
        }
    }
    relation.tags = parse_tags(element);
    Some(relation)
}
