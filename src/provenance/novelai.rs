//! NovelAI `Comment` payloads: a flat JSON object.

use serde_json::{Map, Value};

use super::{Dialect, Param, ProvenanceRecord, json_text};

/// The payload as a JSON object, if it is one and carries a `prompt`.
pub fn parse_payload(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(data)) if data.get("prompt").is_some_and(|p| !p.is_null()) => Some(data),
        _ => None,
    }
}

pub fn parse(text: &str, data: &Map<String, Value>) -> ProvenanceRecord {
    let field = |key: &str| data.get(key).and_then(Param::from_json);
    let text_field = |key: &str| data.get(key).and_then(json_text);

    let size = match (text_field("width"), text_field("height")) {
        (Some(w), Some(h)) => Some(format!("{w}x{h}")),
        _ => None,
    };

    ProvenanceRecord {
        dialect: Dialect::NovelAI,
        prompt: text_field("prompt").filter(|s| !s.is_empty()),
        negative_prompt: text_field("uc").filter(|s| !s.is_empty()),
        steps: field("steps"),
        sampler: text_field("sampler"),
        cfg_scale: field("scale"),
        seed: field("seed"),
        size,
        model: text_field("Source"),
        raw_text: Some(text.to_string()),
        ..Default::default()
    }
}
