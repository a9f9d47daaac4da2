//! Node-type registry consumed by the graph renderer.
//!
//! Maps a node type id to the slot layout the renderer needs to draw
//! instances of it. The registry is owned by whoever renders graphs (the API
//! state); the extraction pipeline only talks to it through
//! [`NodeTypeRegistrar`] so it never holds global mutable state of its own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::catalog::{NodeCatalog, NodeCatalogEntry, SubgraphDefinition};
use crate::graph::NodeSlot;

/// Free-text annotation node types.
pub const NOTE_TYPES: &[&str] = &["Note", "MarkdownNote"];

/// Type id of the primitive value node.
pub const PRIMITIVE_TYPE: &str = "PrimitiveNode";

/// Type id of the pass-through reroute node.
pub const REROUTE_TYPE: &str = "Reroute";

/// How the renderer should treat instances of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTypeKind {
    /// Built from a catalog entry.
    Generic,
    /// Free-text annotation with a single multiline text widget.
    Note,
    Primitive,
    Reroute,
    /// Instance of a subgraph definition embedded in a workflow.
    Subgraph,
}

/// A widget the renderer should create on every instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetSpec {
    pub name: String,
    pub widget_type: String,
    pub multiline: bool,
}

/// Everything the renderer needs to know about one node type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeTypeDefinition {
    pub type_name: String,
    pub display_name: String,
    pub kind: NodeTypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub inputs: Vec<NodeSlot>,
    pub outputs: Vec<NodeSlot>,
    pub widgets: Vec<WidgetSpec>,
}

impl NodeTypeDefinition {
    fn bare(type_name: &str, kind: NodeTypeKind) -> Self {
        Self {
            type_name: type_name.to_string(),
            display_name: type_name.to_string(),
            kind,
            category: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            widgets: Vec::new(),
        }
    }

    pub fn from_catalog_entry(type_name: &str, entry: &NodeCatalogEntry) -> Self {
        Self {
            type_name: type_name.to_string(),
            display_name: entry.label().unwrap_or(type_name).to_string(),
            kind: NodeTypeKind::Generic,
            category: entry.category.clone(),
            inputs: entry.input_slots(),
            outputs: entry.output_slots(),
            widgets: Vec::new(),
        }
    }

    pub fn from_subgraph(definition: &SubgraphDefinition) -> Self {
        Self {
            type_name: definition.id.clone(),
            display_name: definition.display_name().to_string(),
            kind: NodeTypeKind::Subgraph,
            category: None,
            inputs: definition.inputs.clone(),
            outputs: definition.outputs.clone(),
            widgets: Vec::new(),
        }
    }

    pub fn note(type_name: &str) -> Self {
        Self {
            widgets: vec![WidgetSpec {
                name: String::new(),
                widget_type: "string".to_string(),
                multiline: true,
            }],
            ..Self::bare(type_name, NodeTypeKind::Note)
        }
    }
}

/// Registration seam between the pipeline and the registry owner.
#[async_trait]
pub trait NodeTypeRegistrar: Send + Sync {
    /// Register `definition` under `id` unless something is already
    /// registered there. Returns `true` when this call inserted it.
    async fn ensure_registered(&self, id: &str, definition: NodeTypeDefinition) -> bool;
}

/// In-memory node-type registry.
///
/// Thread-safe via interior `RwLock`; wrap in `Arc` to share.
#[derive(Default)]
pub struct NodeTypeRegistry {
    types: RwLock<HashMap<String, NodeTypeDefinition>>,
    catalog_registered: AtomicBool,
}

impl NodeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every catalog entry plus the special node kinds.
    ///
    /// Runs once per registry; later calls return 0 without touching it.
    /// Returns the number of types registered.
    pub async fn register_catalog(&self, catalog: &NodeCatalog) -> usize {
        if self.catalog_registered.swap(true, Ordering::SeqCst) {
            return 0;
        }

        let mut types = self.types.write().await;
        let before = types.len();

        for (type_name, entry) in catalog.iter() {
            if is_special_type(type_name) {
                continue;
            }
            types
                .entry(type_name.clone())
                .or_insert_with(|| NodeTypeDefinition::from_catalog_entry(type_name, entry));
        }

        let special = NOTE_TYPES
            .iter()
            .map(|name| NodeTypeDefinition::note(name))
            .chain([
                NodeTypeDefinition::bare(PRIMITIVE_TYPE, NodeTypeKind::Primitive),
                NodeTypeDefinition::bare(REROUTE_TYPE, NodeTypeKind::Reroute),
            ]);
        for definition in special {
            types.insert(definition.type_name.clone(), definition);
        }

        let registered = types.len() - before;
        tracing::info!(registered, "Registered node types from catalog");
        registered
    }

    pub async fn get(&self, id: &str) -> Option<NodeTypeDefinition> {
        self.types.read().await.get(id).cloned()
    }

    /// All definitions, sorted by type id.
    pub async fn list(&self) -> Vec<NodeTypeDefinition> {
        let mut all: Vec<_> = self.types.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        all
    }

    pub async fn len(&self) -> usize {
        self.types.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.types.read().await.is_empty()
    }
}

#[async_trait]
impl NodeTypeRegistrar for NodeTypeRegistry {
    async fn ensure_registered(&self, id: &str, definition: NodeTypeDefinition) -> bool {
        let mut types = self.types.write().await;
        if types.contains_key(id) {
            return false;
        }
        tracing::info!(type_id = id, name = %definition.display_name, "Registered node type");
        types.insert(id.to_string(), definition);
        true
    }
}

fn is_special_type(type_name: &str) -> bool {
    NOTE_TYPES.contains(&type_name) || type_name == PRIMITIVE_TYPE || type_name == REROUTE_TYPE
}
