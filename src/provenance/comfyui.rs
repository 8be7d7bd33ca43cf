//! ComfyUI node graphs.
//!
//! The `prompt` keyword holds the executed graph: a JSON object keyed by
//! node id whose values look like `{"class_type": "...", "inputs": {...}}`.
//! Inputs are either literal values or links to other nodes (`["4", 0]`);
//! only literals are extracted.

use serde_json::{Map, Value};

use super::{Dialect, Param, PromptFragment, ProvenanceRecord, json_text};

/// Parse a `prompt` payload into a node map.
pub fn parse_graph(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(graph)) => Ok(graph),
        Ok(_) => Err("expected a JSON object of nodes".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Extract parameters from every node of `graph`.
///
/// Prompt text has no canonical slot in this format (any number of encoder
/// nodes may hold positive or negative text), so each `text` input becomes
/// a [`PromptFragment`]. Scalar fields take the first literal found in
/// graph order.
pub fn parse(raw: &str, graph: Map<String, Value>, workflow: Option<&str>) -> ProvenanceRecord {
    let mut record = ProvenanceRecord {
        dialect: Dialect::ComfyUI,
        raw_text: Some(raw.to_string()),
        ..Default::default()
    };

    for (node_id, node) in &graph {
        let Some(node) = node.as_object() else {
            continue;
        };
        let class_type = node
            .get("class_type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Some(inputs) = node.get("inputs").and_then(Value::as_object) else {
            continue;
        };

        if let Some(text) = inputs.get("text").and_then(Value::as_str) {
            record.prompt_fragments.push(PromptFragment {
                node_id: node_id.clone(),
                class_type: class_type.to_string(),
                text: text.to_string(),
            });
        }

        fill(&mut record.model, || {
            inputs.get("ckpt_name").and_then(json_text)
        });
        fill(&mut record.sampler, || {
            inputs.get("sampler_name").and_then(json_text)
        });
        fill(&mut record.seed, || {
            scalar(inputs, "seed").or_else(|| scalar(inputs, "noise_seed"))
        });
        fill(&mut record.steps, || scalar(inputs, "steps"));
        fill(&mut record.cfg_scale, || scalar(inputs, "cfg"));
    }

    if let Some(text) = workflow {
        match serde_json::from_str::<Value>(text) {
            Ok(ui) => record.workflow_ui = Some(ui),
            Err(e) => log::debug!("ComfyUI workflow chunk is not JSON: {e}"),
        }
    }

    record.workflow_graph = Some(Value::Object(graph));
    record
}

fn scalar(inputs: &Map<String, Value>, key: &str) -> Option<Param> {
    inputs.get(key).and_then(Param::from_json)
}

fn fill<T>(slot: &mut Option<T>, value: impl FnOnce() -> Option<T>) {
    if slot.is_none() {
        *slot = value();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const GRAPH: &str = r#"{
        "4": {"class_type": "CheckpointLoaderSimple", "inputs": {"ckpt_name": "sd_xl_base_1.0.safetensors"}},
        "6": {"class_type": "CLIPTextEncode", "inputs": {"text": "a cute cat", "clip": ["4", 1]}},
        "7": {"class_type": "CLIPTextEncode", "inputs": {"text": "ugly", "clip": ["4", 1]}},
        "3": {"class_type": "KSampler", "inputs": {"seed": 156680208700286, "steps": 20, "cfg": 8.0,
              "sampler_name": "euler", "model": ["4", 0], "positive": ["6", 0], "negative": ["7", 0]}}
    }"#;

    fn run(text: &str) -> ProvenanceRecord {
        parse(text, parse_graph(text).unwrap(), None)
    }

    #[test]
    fn extracts_nodes() {
        let r = run(GRAPH);
        assert_eq!(r.dialect, Dialect::ComfyUI);
        assert_eq!(r.model.as_deref(), Some("sd_xl_base_1.0.safetensors"));
        assert_eq!(r.seed, Some(Param::from(156680208700286i64)));
        assert_eq!(r.steps, Some(Param::from(20i64)));
        assert_eq!(r.cfg_scale.as_ref().and_then(Param::as_f64), Some(8.0));
        assert_eq!(r.sampler.as_deref(), Some("euler"));
        assert!(r.prompt.is_none());
        assert!(r.error.is_none());
    }

    #[test]
    fn fragments_in_graph_order() {
        let r = run(GRAPH);
        let keys: Vec<String> = r.prompt_fragments.iter().map(PromptFragment::key).collect();
        assert_eq!(keys, vec!["CLIPTextEncode:6", "CLIPTextEncode:7"]);
        assert_eq!(r.prompt_fragments[0].text, "a cute cat");
        assert_eq!(r.prompt_fragments[1].text, "ugly");
    }

    #[test]
    fn keeps_graph() {
        let r = run(r#"{"a":1}"#);
        assert_eq!(r.workflow_graph, Some(json!({"a": 1})));
        assert!(r.prompt_fragments.is_empty());
        assert_eq!(r.raw_text.as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn noise_seed_fallback() {
        let r = run(r#"{"10": {"class_type": "KSamplerAdvanced", "inputs": {"noise_seed": 7}}}"#);
        assert_eq!(r.seed, Some(Param::from(7i64)));
    }

    #[test]
    fn linked_inputs_are_not_values() {
        let r = run(r#"{"3": {"class_type": "KSampler", "inputs": {"seed": ["12", 0], "text": ["5", 0]}}}"#);
        assert!(r.seed.is_none());
        assert!(r.prompt_fragments.is_empty());
    }

    #[test]
    fn first_value_wins() {
        let r = run(r#"{
            "1": {"class_type": "KSampler", "inputs": {"steps": 10}},
            "2": {"class_type": "KSampler", "inputs": {"steps": 30}}
        }"#);
        assert_eq!(r.steps, Some(Param::from(10i64)));
    }

    #[test]
    fn malformed_nodes_are_skipped() {
        let r = run(r#"{"1": 5, "2": {"class_type": "X"}, "3": {"inputs": {"text": "orphan"}}}"#);
        assert_eq!(r.prompt_fragments.len(), 1);
        assert_eq!(r.prompt_fragments[0].key(), ":3");
    }

    #[test]
    fn workflow_chunk_is_attached() {
        let r = parse("{}", Map::new(), Some(r#"{"nodes": []}"#));
        assert_eq!(r.workflow_ui, Some(json!({"nodes": []})));

        let r = parse("{}", Map::new(), Some("not json"));
        assert!(r.workflow_ui.is_none());
    }

    #[test]
    fn parse_graph_rejects_non_objects() {
        assert!(parse_graph("[1, 2]").is_err());
        assert!(parse_graph("{broken").is_err());
        assert!(parse_graph("").is_err());
        assert!(parse_graph(r#"{"1": {}}"#).is_ok());
    }
}
