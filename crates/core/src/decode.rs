//! JSON/graph decoding.
//!
//! Turns the raw text pulled out of a container into one of the two graph
//! encodings. The encoding is decided here, once, and carried as a
//! [`RawGraph`] variant so later stages never re-inspect field shapes.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::catalog::SubgraphDefinition;
use crate::error::CoreError;

/// Wrapper keys some producers nest the graph under, in lookup order.
const GRAPH_WRAPPER_KEYS: &[&str] = &["prompt", "workflow"];

/// Which on-disk encoding a document used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphSchema {
    /// Node array plus a separate link array (LiteGraph document).
    Litegraph,
    /// Flat id-keyed mapping with inline `[node_id, slot]` references.
    Api,
}

/// A decoded but not yet normalized graph document.
#[derive(Debug, Clone, PartialEq)]
pub enum RawGraph {
    Litegraph(Map<String, Value>),
    Api(Map<String, Value>),
}

impl RawGraph {
    pub fn schema(&self) -> GraphSchema {
        match self {
            RawGraph::Litegraph(_) => GraphSchema::Litegraph,
            RawGraph::Api(_) => GraphSchema::Api,
        }
    }

    /// Subgraph definitions embedded under `definitions.subgraphs`.
    ///
    /// Entries that lack a string `id` are skipped.
    pub fn subgraph_definitions(&self) -> Vec<SubgraphDefinition> {
        let root = match self {
            RawGraph::Litegraph(root) | RawGraph::Api(root) => root,
        };
        root.get("definitions")
            .and_then(|d| d.get("subgraphs"))
            .and_then(Value::as_array)
            .map(|defs| defs.iter().filter_map(SubgraphDefinition::from_value).collect())
            .unwrap_or_default()
    }
}

/// Decode raw text into a graph document.
///
/// Tolerates one level of string-in-string encoding, unwraps the `prompt` or
/// `workflow` wrapper, and picks the schema by the presence of a `nodes`
/// array.
pub fn decode(raw: &str) -> Result<RawGraph, CoreError> {
    let mut data = parse_json(raw)?;

    // Some producers JSON-encode the document a second time.
    if let Value::String(inner) = &data {
        data = parse_json(inner)?;
    }

    let mut source = resolve_graph_root(data);
    if let Value::String(inner) = &source {
        source = parse_json(inner)?;
    }

    let Value::Object(root) = source else {
        return Err(CoreError::MalformedInput(
            "Workflow document must be a JSON object".to_string(),
        ));
    };

    if root.get("nodes").is_some_and(Value::is_array) {
        Ok(RawGraph::Litegraph(root))
    } else {
        Ok(RawGraph::Api(root))
    }
}

fn parse_json(text: &str) -> Result<Value, CoreError> {
    serde_json::from_str(text.trim())
        .map_err(|e| CoreError::MalformedInput(format!("Invalid workflow JSON: {e}")))
}

fn resolve_graph_root(data: Value) -> Value {
    let Value::Object(mut root) = data else {
        return data;
    };
    for key in GRAPH_WRAPPER_KEYS {
        match root.remove(*key) {
            Some(Value::Null) | None => continue,
            Some(inner) => return inner,
        }
    }
    Value::Object(root)
}
