//! Generation parameter extraction.
//!
//! Heuristic: prompts are recognised by node type plus a title keyword, and
//! sampler settings are read from fixed `widgets_values` slots. All slot
//! knowledge lives in the tables below.

use serde::Serialize;
use serde_json::Value;

use crate::graph::CanonicalNode;
use crate::types::NodeId;

// ---------------------------------------------------------------------------
// Node types used for heuristic detection
// ---------------------------------------------------------------------------

/// Substring identifying text-encoding nodes (covers SDXL/Flux variants).
const CLIP_TEXT_ENCODE_CLASS: &str = "CLIPTextEncode";

const POSITIVE_KEYWORD: &str = "positive";
const NEGATIVE_KEYWORD: &str = "negative";

/// Widget slots holding sampler settings for one sampler node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSlots {
    pub node_type: &'static str,
    pub steps: usize,
    pub cfg: usize,
    pub sampler_name: usize,
    pub scheduler: usize,
}

/// `KSampler`: seed, control_after_generate, steps, cfg, sampler, scheduler, denoise.
pub const KSAMPLER_SLOTS: SamplerSlots = SamplerSlots {
    node_type: "KSampler",
    steps: 2,
    cfg: 3,
    sampler_name: 4,
    scheduler: 5,
};

/// `KSamplerAdvanced` carries `add_noise` first, so everything shifts by one.
pub const KSAMPLER_ADVANCED_SLOTS: SamplerSlots = SamplerSlots {
    node_type: "KSamplerAdvanced",
    steps: 3,
    cfg: 4,
    sampler_name: 5,
    scheduler: 6,
};

const SAMPLER_TABLES: &[SamplerSlots] = &[KSAMPLER_SLOTS, KSAMPLER_ADVANCED_SLOTS];

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Settings read from one sampler node. Values are passed through as found.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SamplerParameters {
    pub node_id: NodeId,
    pub node_title: String,
    pub steps: Option<Value>,
    pub cfg: Option<Value>,
    pub sampler_name: Option<Value>,
    pub scheduler: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterSummary {
    pub positive_prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub samplers: Vec<SamplerParameters>,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Summarize prompts and sampler settings from sorted, enriched nodes.
pub fn extract_parameters(nodes: &[CanonicalNode]) -> ParameterSummary {
    let mut summary = ParameterSummary::default();

    for node in nodes {
        let Some(widgets) = node.widgets_values.as_deref() else {
            continue;
        };

        if node.node_type.contains(CLIP_TEXT_ENCODE_CLASS) {
            let title = node.title.as_deref().unwrap_or_default().to_lowercase();
            let text = widgets
                .first()
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty());
            if let Some(text) = text {
                if title.contains(POSITIVE_KEYWORD) {
                    summary.positive_prompt = Some(text.to_string());
                }
                if title.contains(NEGATIVE_KEYWORD) {
                    summary.negative_prompt = Some(text.to_string());
                }
            }
        }

        if let Some(slots) = SAMPLER_TABLES.iter().find(|t| t.node_type == node.node_type) {
            summary.samplers.push(read_sampler(node, widgets, slots));
        }
    }

    summary
}

fn read_sampler(node: &CanonicalNode, widgets: &[Value], slots: &SamplerSlots) -> SamplerParameters {
    let at = |slot: usize| widgets.get(slot).filter(|v| !v.is_null()).cloned();
    SamplerParameters {
        node_id: node.id,
        node_title: node.title.clone().unwrap_or_default(),
        steps: at(slots.steps),
        cfg: at(slots.cfg),
        sampler_name: at(slots.sampler_name),
        scheduler: at(slots.scheduler),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: NodeId, node_type: &str, title: &str, widgets: Value) -> CanonicalNode {
        let mut node = CanonicalNode::new(id, node_type);
        node.title = Some(title.to_string());
        node.widgets_values = widgets.as_array().cloned();
        node
    }

    #[test]
    fn prompts_are_detected_by_title() {
        let nodes = vec![
            node(6, "CLIPTextEncode", "Positive Prompt", json!(["a castle"])),
            node(7, "CLIPTextEncode", "NEGATIVE", json!(["blurry"])),
            node(8, "CLIPTextEncode", "Style", json!(["ignored"])),
        ];
        let summary = extract_parameters(&nodes);
        assert_eq!(summary.positive_prompt.as_deref(), Some("a castle"));
        assert_eq!(summary.negative_prompt.as_deref(), Some("blurry"));
    }

    #[test]
    fn encoder_variants_match_by_substring() {
        let nodes = vec![node(1, "CLIPTextEncodeSDXL", "positive", json!(["sdxl prompt"]))];
        let summary = extract_parameters(&nodes);
        assert_eq!(summary.positive_prompt.as_deref(), Some("sdxl prompt"));
    }

    #[test]
    fn last_non_empty_prompt_wins() {
        let nodes = vec![
            node(1, "CLIPTextEncode", "positive", json!(["first"])),
            node(2, "CLIPTextEncode", "positive", json!(["second"])),
            node(3, "CLIPTextEncode", "positive", json!([""])),
        ];
        let summary = extract_parameters(&nodes);
        assert_eq!(summary.positive_prompt.as_deref(), Some("second"));
    }

    #[test]
    fn sampler_slots_are_read() {
        let nodes = vec![node(
            3,
            "KSampler",
            "KSampler",
            json!([156680208700286_i64, "randomize", 25, 7.5, "euler", "normal", 1.0]),
        )];
        let summary = extract_parameters(&nodes);
        let sampler = &summary.samplers[0];
        assert_eq!(sampler.node_id, 3);
        assert_eq!(sampler.steps, Some(json!(25)));
        assert_eq!(sampler.cfg, Some(json!(7.5)));
        assert_eq!(sampler.sampler_name, Some(json!("euler")));
        assert_eq!(sampler.scheduler, Some(json!("normal")));
    }

    #[test]
    fn advanced_sampler_shift_yields_same_settings() {
        let standard = node(1, "KSampler", "s", json!(["a", "b", 25, 7.5, "euler", "normal"]));
        let advanced = node(
            1,
            "KSamplerAdvanced",
            "s",
            json!(["enable", "a", "b", 25, 7.5, "euler", "normal"]),
        );

        let a = extract_parameters(&[standard]).samplers.remove(0);
        let b = extract_parameters(&[advanced]).samplers.remove(0);
        assert_eq!(
            (a.steps, a.cfg, a.sampler_name, a.scheduler),
            (b.steps, b.cfg, b.sampler_name, b.scheduler)
        );
    }

    #[test]
    fn every_sampler_is_kept_in_order() {
        let nodes = vec![
            node(3, "KSampler", "Base", json!([0, "fixed", 20, 7.0, "euler", "normal"])),
            node(9, "KSampler", "Refiner", json!([0, "fixed", 10, 5.0, "dpmpp_2m", "karras"])),
        ];
        let titles: Vec<_> = extract_parameters(&nodes)
            .samplers
            .into_iter()
            .map(|s| s.node_title)
            .collect();
        assert_eq!(titles, vec!["Base", "Refiner"]);
    }

    #[test]
    fn nodes_without_widgets_are_skipped() {
        let mut sampler = CanonicalNode::new(3, "KSampler");
        sampler.title = Some("KSampler".to_string());
        let summary = extract_parameters(&[sampler]);
        assert!(summary.samplers.is_empty());
        assert_eq!(summary.positive_prompt, None);
    }

    #[test]
    fn short_widget_list_leaves_fields_empty() {
        let nodes = vec![node(3, "KSampler", "KSampler", json!([1, "fixed", 20]))];
        let sampler = &extract_parameters(&nodes).samplers[0];
        assert_eq!(sampler.steps, Some(json!(20)));
        assert_eq!(sampler.cfg, None);
    }
}
