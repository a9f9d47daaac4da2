//! Node-type catalog (ComfyUI `object_info`) and embedded subgraph
//! definitions.
//!
//! The catalog is fetched once at startup and is read-only afterwards. The
//! pipeline only needs display names from it; slot schemas feed the node-type
//! registry the renderer draws from.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::graph::NodeSlot;

/// Declared type for inputs whose schema is a list of choices.
pub const COMBO_TYPE: &str = "COMBO";

/// Display name used for subgraph definitions that carry no name.
pub const DEFAULT_SUBGRAPH_NAME: &str = "Subgraph";

/// Input schema of a catalog entry: ordered `name -> [type, options]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogInputs {
    #[serde(default)]
    pub required: Map<String, Value>,
    #[serde(default)]
    pub optional: Map<String, Value>,
}

/// One node type as described by the catalog.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeCatalogEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input: CatalogInputs,
    /// Output types; choice-list outputs appear as arrays.
    #[serde(default)]
    pub output: Vec<Value>,
    #[serde(default)]
    pub output_name: Vec<String>,
}

impl NodeCatalogEntry {
    /// Display name, falling back to the canonical name.
    pub fn label(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.name.as_str()).filter(|s| !s.is_empty()))
    }

    /// Input slots: required inputs first, then optional ones, in declared
    /// order.
    pub fn input_slots(&self) -> Vec<NodeSlot> {
        self.input
            .required
            .iter()
            .chain(self.input.optional.iter())
            .map(|(name, schema)| NodeSlot::new(name.clone(), declared_input_type(schema)))
            .collect()
    }

    /// Output slots named by `output_name`, falling back to the type.
    pub fn output_slots(&self) -> Vec<NodeSlot> {
        self.output
            .iter()
            .enumerate()
            .map(|(i, output)| {
                let slot_type = match output {
                    Value::String(s) => s.clone(),
                    _ => COMBO_TYPE.to_string(),
                };
                let name = self
                    .output_name
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| slot_type.clone());
                NodeSlot::new(name, slot_type)
            })
            .collect()
    }
}

fn declared_input_type(schema: &Value) -> String {
    match schema.get(0) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(_)) => COMBO_TYPE.to_string(),
        _ => "*".to_string(),
    }
}

/// The node-type catalog, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct NodeCatalog {
    entries: HashMap<String, NodeCatalogEntry>,
}

impl NodeCatalog {
    /// Parse the catalog document text.
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CoreError::Catalog(format!("Catalog is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Build the catalog from an already-parsed document.
    ///
    /// The document must be an object of objects; entries with a malformed
    /// shape reject the whole catalog.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let Value::Object(root) = value else {
            return Err(CoreError::Catalog(
                "Catalog must be a JSON object keyed by node type".to_string(),
            ));
        };

        let mut entries = HashMap::with_capacity(root.len());
        for (type_name, raw) in root {
            if !raw.is_object() {
                return Err(CoreError::Catalog(format!(
                    "Catalog entry '{type_name}' must be an object"
                )));
            }
            let mut entry: NodeCatalogEntry = serde_json::from_value(raw).map_err(|e| {
                CoreError::Catalog(format!("Catalog entry '{type_name}' is malformed: {e}"))
            })?;
            if entry.name.is_empty() {
                entry.name = type_name.clone();
            }
            entries.insert(type_name, entry);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, type_name: &str) -> Option<&NodeCatalogEntry> {
        self.entries.get(type_name)
    }

    /// Display name for a type, if the catalog knows it.
    pub fn display_name(&self, type_name: &str) -> Option<&str> {
        self.get(type_name).and_then(NodeCatalogEntry::label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodeCatalogEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A subgraph definition embedded in a workflow document.
///
/// Nodes whose `type` equals `id` are instances of this subgraph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubgraphDefinition {
    pub id: String,
    pub name: Option<String>,
    pub inputs: Vec<NodeSlot>,
    pub outputs: Vec<NodeSlot>,
}

impl SubgraphDefinition {
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value.get("id").and_then(Value::as_str)?.to_string();
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Some(Self {
            id,
            name,
            inputs: subgraph_slots(value.get("inputs")),
            outputs: subgraph_slots(value.get("outputs")),
        })
    }

    /// Name to show for instances of this subgraph.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_SUBGRAPH_NAME)
    }
}

fn subgraph_slots(value: Option<&Value>) -> Vec<NodeSlot> {
    value
        .and_then(Value::as_array)
        .map(|slots| {
            slots
                .iter()
                .map(|slot| {
                    let name = slot.get("name").and_then(Value::as_str).unwrap_or_default();
                    let slot_type = slot.get("type").and_then(Value::as_str).unwrap_or("*");
                    NodeSlot::new(name, slot_type)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn sample_catalog() -> NodeCatalog {
        NodeCatalog::from_value(json!({
            "KSampler": {
                "input": {
                    "required": {
                        "model": ["MODEL"],
                        "seed": ["INT", {"default": 0}],
                        "sampler_name": [["euler", "dpmpp_2m"]]
                    },
                    "optional": {"noise_mask": ["MASK"]}
                },
                "output": ["LATENT"],
                "output_name": ["LATENT"],
                "name": "KSampler",
                "display_name": "KSampler",
                "category": "sampling"
            },
            "CLIPTextEncode": {
                "input": {"required": {"text": ["STRING", {"multiline": true}], "clip": ["CLIP"]}},
                "output": ["CONDITIONING"],
                "name": "CLIPTextEncode",
                "display_name": "CLIP Text Encode (Prompt)"
            },
            "SaveImage": {"name": "SaveImage", "display_name": ""},
            "Untitled": {}
        }))
        .unwrap()
    }

    #[test]
    fn display_name_prefers_display_name() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.display_name("CLIPTextEncode"),
            Some("CLIP Text Encode (Prompt)")
        );
    }

    #[test]
    fn empty_display_name_falls_back_to_name() {
        assert_eq!(sample_catalog().display_name("SaveImage"), Some("SaveImage"));
    }

    #[test]
    fn missing_name_defaults_to_key() {
        assert_eq!(sample_catalog().display_name("Untitled"), Some("Untitled"));
    }

    #[test]
    fn unknown_type_has_no_display_name() {
        assert_eq!(sample_catalog().display_name("NoSuchNode"), None);
    }

    #[test]
    fn input_slots_keep_declared_order_and_map_choices_to_combo() {
        let catalog = sample_catalog();
        let slots = catalog.get("KSampler").unwrap().input_slots();
        let names: Vec<_> = slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["model", "seed", "sampler_name", "noise_mask"]);
        assert_eq!(slots[2].slot_type, json!(COMBO_TYPE));
        assert_eq!(slots[3].slot_type, json!("MASK"));
    }

    #[test]
    fn output_slots_fall_back_to_type_name() {
        let catalog = sample_catalog();
        let outputs = catalog.get("CLIPTextEncode").unwrap().output_slots();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name, "CONDITIONING");
    }

    #[test]
    fn non_object_catalog_is_rejected() {
        assert_matches!(NodeCatalog::from_json("[]"), Err(CoreError::Catalog(_)));
        assert_matches!(NodeCatalog::from_json("not json"), Err(CoreError::Catalog(_)));
    }

    #[test]
    fn non_object_entry_is_rejected() {
        let result = NodeCatalog::from_value(json!({"KSampler": "oops"}));
        assert_matches!(result, Err(CoreError::Catalog(msg)) if msg.contains("KSampler"));
    }

    #[test]
    fn subgraph_definition_defaults_name() {
        let def = SubgraphDefinition::from_value(&json!({"id": "9f3c", "name": ""})).unwrap();
        assert_eq!(def.display_name(), DEFAULT_SUBGRAPH_NAME);
        assert!(def.inputs.is_empty());
    }
}
