//! Graph normalization.
//!
//! Maps each [`RawGraph`] variant into the single [`CanonicalGraph`] shape.
//! LiteGraph documents are already canonical and pass through almost as-is;
//! API documents get nodes synthesized from their id-keyed entries and links
//! synthesized from inline `[node_id, slot]` references.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::decode::RawGraph;
use crate::graph::{
    CanonicalGraph, CanonicalGroup, CanonicalLink, CanonicalNode, WILDCARD_LINK_TYPE,
};
use crate::types::{LinkId, NodeId};

/// First id handed out to links synthesized from API references.
pub const FIRST_SYNTHETIC_LINK_ID: LinkId = 1;

/// Normalize a decoded document into canonical nodes, links and groups.
pub fn normalize(raw: &RawGraph) -> CanonicalGraph {
    match raw {
        RawGraph::Litegraph(root) => normalize_litegraph(root),
        RawGraph::Api(root) => normalize_api(root),
    }
}

// ---------------------------------------------------------------------------
// LiteGraph documents
// ---------------------------------------------------------------------------

fn normalize_litegraph(root: &Map<String, Value>) -> CanonicalGraph {
    let nodes = root
        .get("nodes")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let node = item
                        .as_object()
                        .cloned()
                        .and_then(CanonicalNode::from_litegraph);
                    if node.is_none() {
                        tracing::warn!("Skipping workflow node without a usable id");
                    }
                    node
                })
                .collect()
        })
        .unwrap_or_default();

    let links = root
        .get("links")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let link = CanonicalLink::from_value(item);
                    if link.is_none() {
                        tracing::debug!(link = %item, "Skipping malformed workflow link");
                    }
                    link
                })
                .collect()
        })
        .unwrap_or_default();

    CanonicalGraph {
        nodes,
        links,
        groups: groups_of(root),
    }
}

// ---------------------------------------------------------------------------
// API documents
// ---------------------------------------------------------------------------

fn normalize_api(root: &Map<String, Value>) -> CanonicalGraph {
    let entries = api_node_entries(root);
    let mut ids = NodeIds::assign(&entries);

    let mut nodes = Vec::with_capacity(entries.len());
    let mut links = Vec::new();
    let mut next_link_id = FIRST_SYNTHETIC_LINK_ID;

    for (key, details) in &entries {
        let id = ids.resolve(*key);
        let mut fields = (*details).clone();
        fields.remove("inputs");

        let mut node = CanonicalNode::new(id, class_type_of(details).unwrap_or_default());
        node.title = match fields.remove("title") {
            Some(Value::String(title)) => Some(title),
            _ => details
                .get("_meta")
                .and_then(|meta| meta.get("title"))
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        if let Some(order) = fields.remove("order") {
            node.order = crate::graph::value_as_int(&order).unwrap_or(0);
        }
        if let Some(Value::Array(values)) = fields.remove("widgets_values") {
            node.widgets_values = Some(values);
        }
        node.extra = fields;

        // Every reference becomes a link, dangling or not.
        let references = node_references(*details);
        for (target_slot, (source_key, source_slot)) in references.enumerate() {
            links.push(CanonicalLink {
                id: next_link_id,
                origin_id: ids.resolve(source_key),
                origin_slot: source_slot,
                target_id: id,
                target_slot: target_slot as i64,
                link_type: WILDCARD_LINK_TYPE.to_string(),
            });
            next_link_id += 1;
        }

        nodes.push(node);
    }

    CanonicalGraph {
        nodes,
        links,
        groups: groups_of(root),
    }
}

/// Entries that describe nodes, in traversal order: integer-like keys in
/// ascending numeric order first, then the remaining keys in document order.
fn api_node_entries(root: &Map<String, Value>) -> Vec<(&str, &Map<String, Value>)> {
    let mut numeric = Vec::new();
    let mut other = Vec::new();

    for (key, value) in root {
        let Some(details) = value.as_object() else {
            continue;
        };
        if class_type_of(details).is_none() {
            continue;
        }
        match array_index_key(key) {
            Some(index) => numeric.push((index, key.as_str(), details)),
            None => other.push((key.as_str(), details)),
        }
    }

    numeric.sort_by_key(|(index, _, _)| *index);
    numeric
        .into_iter()
        .map(|(_, key, details)| (key, details))
        .chain(other)
        .collect()
}

/// `[source_node_id, source_slot]` inputs of one entry, in input order.
fn node_references<'a>(details: &'a Map<String, Value>) -> impl Iterator<Item = (&'a str, i64)> {
    details
        .get("inputs")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|inputs| inputs.values())
        .filter_map(as_node_reference)
}

/// Key to node id mapping for one API document.
///
/// Entry keys that parse as integers keep their value. Every other key, and
/// every referenced key that names no entry and is not an integer, gets a
/// synthetic id no other node or reference uses.
struct NodeIds<'a> {
    by_key: HashMap<&'a str, NodeId>,
    allocator: IdAllocator,
}

impl<'a> NodeIds<'a> {
    fn assign(entries: &[(&'a str, &'a Map<String, Value>)]) -> Self {
        let mut by_key = HashMap::with_capacity(entries.len());
        let mut used = HashSet::with_capacity(entries.len());

        for (key, _) in entries {
            if let Ok(id) = key.parse::<NodeId>() {
                // "07" and "7" both parse to 7; the later one is synthetic.
                if used.insert(id) {
                    by_key.insert(*key, id);
                }
            }
        }
        let largest = used.iter().copied().max();

        // Dangling numeric references keep their value, so keep it free.
        for (_, details) in entries {
            for (source_key, _) in node_references(*details) {
                if let Ok(id) = source_key.parse::<NodeId>() {
                    used.insert(id);
                }
            }
        }

        let mut ids = Self {
            by_key,
            allocator: IdAllocator {
                used,
                next: largest.map_or(Some(0), |id| id.checked_add(1)),
                lowest_free: 0,
            },
        };
        for (key, _) in entries {
            if !ids.by_key.contains_key(key) {
                let id = ids.allocator.allocate();
                ids.by_key.insert(*key, id);
            }
        }
        ids
    }

    fn resolve(&mut self, key: &'a str) -> NodeId {
        if let Some(id) = self.by_key.get(key) {
            return *id;
        }
        let id = match key.parse::<NodeId>() {
            Ok(id) => id,
            Err(_) => {
                let id = self.allocator.allocate();
                tracing::debug!(key, id, "Assigned synthetic node id");
                id
            }
        };
        self.by_key.insert(key, id);
        id
    }
}

/// Hands out ids above the largest numeric key, then the lowest free ids
/// once that range runs out.
struct IdAllocator {
    used: HashSet<NodeId>,
    next: Option<NodeId>,
    lowest_free: NodeId,
}

impl IdAllocator {
    fn allocate(&mut self) -> NodeId {
        while let Some(candidate) = self.next {
            self.next = candidate.checked_add(1);
            if self.used.insert(candidate) {
                return candidate;
            }
        }
        // `used` is finite, so a free id always exists below it.
        loop {
            let candidate = self.lowest_free;
            self.lowest_free = self.lowest_free.wrapping_add(1);
            if self.used.insert(candidate) {
                return candidate;
            }
        }
    }
}

/// A `[source_node_id, source_slot]` pair: first element a string, second a
/// number.
fn as_node_reference(value: &Value) -> Option<(&str, i64)> {
    match value.as_array()?.as_slice() {
        [Value::String(source), Value::Number(slot)] => {
            let slot = slot.as_i64().or_else(|| slot.as_f64().map(|f| f as i64))?;
            Some((source.as_str(), slot))
        }
        _ => None,
    }
}

fn class_type_of(details: &Map<String, Value>) -> Option<String> {
    details
        .get("class_type")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Keys a JavaScript engine would treat as array indices.
fn array_index_key(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index.to_string() == key && index != u32::MAX).then_some(index)
}

fn groups_of(root: &Map<String, Value>) -> Vec<CanonicalGroup> {
    root.get("groups")
        .and_then(Value::as_array)
        .map(|groups| {
            groups
                .iter()
                .cloned()
                .filter_map(CanonicalGroup::from_value)
                .collect()
        })
        .unwrap_or_default()
}
