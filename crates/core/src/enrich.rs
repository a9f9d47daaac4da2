//! Node enrichment and classification.
//!
//! Resolves a human-readable name for every node, fills in missing titles and
//! splits nodes into content nodes and free-text notes.

use serde::Serialize;
use serde_json::Value;

use crate::catalog::{NodeCatalog, SubgraphDefinition};
use crate::graph::CanonicalNode;
use crate::registry::NOTE_TYPES;
use crate::types::NodeId;

/// A content node as listed for the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentEntry {
    pub id: NodeId,
    pub name: String,
}

/// Free text attached to a note node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEntry {
    pub id: NodeId,
    pub text: String,
    /// The note node's type (`Note` or `MarkdownNote`).
    pub kind: String,
}

/// Result of enriching one graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub node_list: Vec<ContentEntry>,
    pub notes: Vec<NoteEntry>,
    /// Subgraph definitions that at least one node instantiates, in first
    /// encounter order.
    pub used_subgraphs: Vec<SubgraphDefinition>,
}

/// Stable ascending sort by `order`. Nodes without one already carry 0.
pub fn sort_by_order(nodes: &mut [CanonicalNode]) {
    nodes.sort_by_key(|node| node.order);
}

/// Enrich nodes in place, in their current order.
///
/// Callers sort with [`sort_by_order`] first.
pub fn enrich(
    nodes: &mut [CanonicalNode],
    catalog: &NodeCatalog,
    subgraphs: &[SubgraphDefinition],
) -> Enrichment {
    let mut result = Enrichment::default();

    for node in nodes.iter_mut() {
        if node.node_type.is_empty() {
            if let Some(class_type) = node.class_type() {
                node.node_type = class_type.to_string();
            }
        }

        let display_name = match catalog.display_name(&node.node_type) {
            Some(name) => name.to_string(),
            None => match subgraphs.iter().find(|def| def.id == node.node_type) {
                Some(def) => {
                    if !result.used_subgraphs.iter().any(|used| used.id == def.id) {
                        result.used_subgraphs.push(def.clone());
                    }
                    def.display_name().to_string()
                }
                None => node.node_type.clone(),
            },
        };

        if node
            .title
            .as_deref()
            .map_or(true, |title| title == node.node_type)
        {
            node.title = Some(display_name);
        }

        if NOTE_TYPES.contains(&node.node_type.as_str()) {
            let text = node.widget(0).map(note_text).unwrap_or_default();
            if !text.is_empty() {
                result.notes.push(NoteEntry {
                    id: node.id,
                    text,
                    kind: node.node_type.clone(),
                });
            }
        } else {
            result.node_list.push(ContentEntry {
                id: node.id,
                name: node.title.clone().unwrap_or_default(),
            });
        }
    }

    result
}

/// Note text from the first widget. `null`, `false` and zero count as empty.
fn note_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null | Value::Bool(false) => String::new(),
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> NodeCatalog {
        NodeCatalog::from_value(json!({
            "CLIPTextEncode": {"name": "CLIPTextEncode", "display_name": "CLIP Text Encode (Prompt)"},
            "KSampler": {"name": "KSampler"}
        }))
        .unwrap()
    }

    fn node(id: NodeId, node_type: &str) -> CanonicalNode {
        CanonicalNode::new(id, node_type)
    }

    fn with_widgets(mut node: CanonicalNode, values: Value) -> CanonicalNode {
        node.widgets_values = values.as_array().cloned();
        node
    }

    #[test]
    fn sort_is_stable_for_missing_order() {
        let mut a = node(1, "A");
        a.order = 2;
        let b = node(2, "B");
        let c = node(3, "C");
        let mut d = node(4, "D");
        d.order = -1;
        let mut nodes = vec![a, b, c, d];

        sort_by_order(&mut nodes);

        let ids: Vec<_> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
    }

    #[test]
    fn catalog_display_name_replaces_missing_title() {
        let mut nodes = vec![node(6, "CLIPTextEncode")];
        let result = enrich(&mut nodes, &catalog(), &[]);
        assert_eq!(nodes[0].title.as_deref(), Some("CLIP Text Encode (Prompt)"));
        assert_eq!(
            result.node_list,
            vec![ContentEntry {
                id: 6,
                name: "CLIP Text Encode (Prompt)".to_string()
            }]
        );
    }

    #[test]
    fn title_equal_to_type_is_replaced() {
        let mut n = node(6, "CLIPTextEncode");
        n.title = Some("CLIPTextEncode".to_string());
        let mut nodes = vec![n];
        enrich(&mut nodes, &catalog(), &[]);
        assert_eq!(nodes[0].title.as_deref(), Some("CLIP Text Encode (Prompt)"));
    }

    #[test]
    fn custom_title_is_kept() {
        let mut n = node(6, "CLIPTextEncode");
        n.title = Some("Positive".to_string());
        let mut nodes = vec![n];
        let result = enrich(&mut nodes, &catalog(), &[]);
        assert_eq!(nodes[0].title.as_deref(), Some("Positive"));
        assert_eq!(result.node_list[0].name, "Positive");
    }

    #[test]
    fn unknown_type_uses_raw_type() {
        let mut nodes = vec![node(1, "MyCustomNode")];
        enrich(&mut nodes, &catalog(), &[]);
        assert_eq!(nodes[0].title.as_deref(), Some("MyCustomNode"));
    }

    #[test]
    fn legacy_class_type_fills_empty_type() {
        let mut n = node(3, "");
        n.extra.insert("class_type".to_string(), json!("KSampler"));
        let mut nodes = vec![n];
        enrich(&mut nodes, &catalog(), &[]);
        assert_eq!(nodes[0].node_type, "KSampler");
        assert_eq!(nodes[0].title.as_deref(), Some("KSampler"));
    }

    #[test]
    fn subgraph_instance_is_named_and_reported() {
        let defs = vec![
            SubgraphDefinition::from_value(&json!({"id": "aa11", "name": "Face Detailer"})).unwrap(),
            SubgraphDefinition::from_value(&json!({"id": "bb22"})).unwrap(),
        ];
        let mut nodes = vec![node(1, "aa11"), node(2, "bb22"), node(3, "aa11")];

        let result = enrich(&mut nodes, &catalog(), &defs);

        assert_eq!(nodes[0].title.as_deref(), Some("Face Detailer"));
        assert_eq!(nodes[1].title.as_deref(), Some("Subgraph"));
        let used: Vec<_> = result.used_subgraphs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(used, vec!["aa11", "bb22"]);
    }

    #[test]
    fn note_with_text_is_listed_as_note_only() {
        let mut nodes = vec![with_widgets(node(9, "Note"), json!(["hello"]))];
        let result = enrich(&mut nodes, &catalog(), &[]);
        assert_eq!(
            result.notes,
            vec![NoteEntry {
                id: 9,
                text: "hello".to_string(),
                kind: "Note".to_string()
            }]
        );
        assert!(result.node_list.is_empty());
    }

    #[test]
    fn empty_note_is_dropped() {
        let mut nodes = vec![
            with_widgets(node(9, "Note"), json!([""])),
            node(10, "MarkdownNote"),
        ];
        let result = enrich(&mut nodes, &catalog(), &[]);
        assert!(result.notes.is_empty());
        assert!(result.node_list.is_empty());
    }

    #[test]
    fn markdown_note_kind_is_reported() {
        let mut nodes = vec![with_widgets(node(4, "MarkdownNote"), json!(["# Usage"]))];
        let result = enrich(&mut nodes, &catalog(), &[]);
        assert_eq!(result.notes[0].kind, "MarkdownNote");
    }

    #[test]
    fn non_string_note_value_is_stringified() {
        let mut nodes = vec![with_widgets(node(4, "Note"), json!([42]))];
        let result = enrich(&mut nodes, &catalog(), &[]);
        assert_eq!(result.notes[0].text, "42");
    }

    #[test]
    fn falsy_note_values_are_dropped() {
        let mut nodes = vec![
            with_widgets(node(1, "Note"), json!([0])),
            with_widgets(node(2, "Note"), json!([false])),
            with_widgets(node(3, "Note"), json!([0.0])),
            with_widgets(node(4, "Note"), json!([null])),
            with_widgets(node(5, "Note"), json!([true])),
        ];
        let result = enrich(&mut nodes, &catalog(), &[]);
        assert_eq!(result.notes.len(), 1);
        assert_eq!(result.notes[0].id, 5);
        assert_eq!(result.notes[0].text, "true");
    }
}
