//! Canonical workflow graph types.
//!
//! Both source encodings are normalized into these shapes. Serialization
//! follows the LiteGraph document layout (`type`, `widgets_values`, links as
//! 6-element arrays) so a graph renderer can load the result directly.
//! Fields the pipeline does not interpret (`pos`, `size`, `flags`, `mode`,
//! `properties`, ...) are carried through untouched in `extra`.

use serde::ser::{SerializeTuple, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{LinkId, NodeId};

/// Link payload type used when the source does not declare one.
pub const WILDCARD_LINK_TYPE: &str = "*";

/// Group font size LiteGraph applies when a group omits it.
pub const DEFAULT_GROUP_FONT_SIZE: f64 = 24.0;

/// Group color LiteGraph applies when a group omits it.
pub const DEFAULT_GROUP_COLOR: &str = "#3f789e";

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// A named, typed connection slot on a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSlot {
    pub name: String,
    /// Declared payload type. Usually a string such as `"MODEL"`, but
    /// producers are free to write other JSON values here.
    #[serde(rename = "type", skip_serializing_if = "Value::is_null")]
    pub slot_type: Value,
    /// `link`, `links`, `slot_index`, `widget`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeSlot {
    /// Build a slot from a name and a declared type.
    pub fn new(name: impl Into<String>, slot_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot_type: Value::String(slot_type.into()),
            extra: Map::new(),
        }
    }

    fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self {
                name: String::new(),
                slot_type: Value::Null,
                extra: Map::new(),
            };
        };
        let name = match fields.remove("name") {
            Some(Value::String(name)) => name,
            _ => String::new(),
        };
        let slot_type = fields.remove("type").unwrap_or(Value::Null);
        Self {
            name,
            slot_type,
            extra: fields,
        }
    }
}

/// One node of the normalized graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalNode {
    pub id: NodeId,
    /// Class name (`"KSampler"`) or, for subgraph instances, the opaque id of
    /// a subgraph definition. Determines how `widgets_values` is read.
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Creation/execution order. Only used to make traversal deterministic.
    pub order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<NodeSlot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<NodeSlot>>,
    /// Positional user-set parameters. Only array-shaped values are read
    /// here; anything else stays in `extra` untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widgets_values: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalNode {
    /// Create a bare node with no slots, widgets or extra fields.
    pub fn new(id: NodeId, node_type: impl Into<String>) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            title: None,
            order: 0,
            inputs: None,
            outputs: None,
            widgets_values: None,
            extra: Map::new(),
        }
    }

    /// Build a node from a LiteGraph node object.
    ///
    /// Returns `None` when the object has no usable integer `id`. Every other
    /// missing or oddly-shaped field falls back to a default.
    pub fn from_litegraph(mut fields: Map<String, Value>) -> Option<Self> {
        let id = fields.get("id").and_then(value_as_int)?;
        fields.remove("id");

        let node_type = take_string(&mut fields, "type").unwrap_or_default();
        let title = take_string(&mut fields, "title");
        let order = fields
            .remove("order")
            .as_ref()
            .and_then(value_as_int)
            .unwrap_or(0);
        let inputs = take_slots(&mut fields, "inputs");
        let outputs = take_slots(&mut fields, "outputs");
        let widgets_values = match fields.remove("widgets_values") {
            Some(Value::Array(values)) => Some(values),
            Some(other) => {
                fields.insert("widgets_values".to_string(), other);
                None
            }
            None => None,
        };

        Some(Self {
            id,
            node_type,
            title,
            order,
            inputs,
            outputs,
            widgets_values,
            extra: fields,
        })
    }

    /// Positional widget value, if present.
    pub fn widget(&self, slot: usize) -> Option<&Value> {
        self.widgets_values.as_ref().and_then(|values| values.get(slot))
    }

    /// Legacy `class_type` field, if the producer wrote one.
    pub fn class_type(&self) -> Option<&str> {
        self.extra.get("class_type").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// A directed edge from an output slot to an input slot.
///
/// Serialized as the LiteGraph 6-tuple
/// `[id, origin_id, origin_slot, target_id, target_slot, type]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalLink {
    pub id: LinkId,
    pub origin_id: NodeId,
    pub origin_slot: i64,
    pub target_id: NodeId,
    pub target_slot: i64,
    pub link_type: String,
}

impl CanonicalLink {
    /// Parse a link written either as a 6-element array or as an object with
    /// `id`/`origin_id`/`origin_slot`/`target_id`/`target_slot`/`type`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) if items.len() >= 5 => Some(Self {
                id: value_as_int(&items[0])?,
                origin_id: value_as_int(&items[1])?,
                origin_slot: value_as_int(&items[2])?,
                target_id: value_as_int(&items[3])?,
                target_slot: value_as_int(&items[4])?,
                link_type: link_type_of(items.get(5)),
            }),
            Value::Object(fields) => Some(Self {
                id: fields.get("id").and_then(value_as_int)?,
                origin_id: fields.get("origin_id").and_then(value_as_int)?,
                origin_slot: fields.get("origin_slot").and_then(value_as_int)?,
                target_id: fields.get("target_id").and_then(value_as_int)?,
                target_slot: fields.get("target_slot").and_then(value_as_int)?,
                link_type: link_type_of(fields.get("type")),
            }),
            _ => None,
        }
    }
}

impl Serialize for CanonicalLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(6)?;
        tuple.serialize_element(&self.id)?;
        tuple.serialize_element(&self.origin_id)?;
        tuple.serialize_element(&self.origin_slot)?;
        tuple.serialize_element(&self.target_id)?;
        tuple.serialize_element(&self.target_slot)?;
        tuple.serialize_element(&self.link_type)?;
        tuple.end()
    }
}

fn link_type_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => WILDCARD_LINK_TYPE.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Visual grouping rectangle. Purely cosmetic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalGroup {
    pub title: String,
    /// `[x, y, width, height]`.
    pub bounding: [f64; 4],
    pub color: String,
    pub font_size: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalGroup {
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let title = take_string(&mut fields, "title").unwrap_or_default();
        let color =
            take_string(&mut fields, "color").unwrap_or_else(|| DEFAULT_GROUP_COLOR.to_string());
        let font_size = fields
            .remove("font_size")
            .and_then(|v| v.as_f64())
            .unwrap_or(DEFAULT_GROUP_FONT_SIZE);

        let mut bounding = [0.0; 4];
        if let Some(Value::Array(items)) = fields.remove("bounding") {
            for (slot, item) in bounding.iter_mut().zip(items.iter()) {
                *slot = item.as_f64().unwrap_or(0.0);
            }
        }

        Some(Self {
            title,
            bounding,
            color,
            font_size,
            extra: fields,
        })
    }
}

/// Nodes, links and groups of one normalized document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CanonicalGraph {
    pub nodes: Vec<CanonicalNode>,
    pub links: Vec<CanonicalLink>,
    pub groups: Vec<CanonicalGroup>,
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Read an integer from a JSON number (integral floats included) or a
/// numeric string.
pub fn value_as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn take_slots(fields: &mut Map<String, Value>, key: &str) -> Option<Vec<NodeSlot>> {
    match fields.remove(key) {
        Some(Value::Array(items)) => Some(items.into_iter().map(NodeSlot::from_value).collect()),
        Some(other) => {
            fields.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}
