//! A1111 / Forge / Civitai `parameters` text.
//!
//! ```text
//! a red fox in the snow
//! Negative prompt: blurry, lowres
//! Steps: 20, Sampler: Euler a, CFG scale: 7, Seed: 42, Size: 512x768, Model: dreamshaper_8
//! ```

use super::{Dialect, Param, ProvenanceRecord, non_empty};

const NEGATIVE_MARKER: &str = "\nNegative prompt:";
const STEPS_LABEL: &str = "Steps:";

pub fn parse(text: &str) -> ProvenanceRecord {
    let mut record = ProvenanceRecord {
        dialect: Dialect::A1111,
        raw_text: Some(text.to_string()),
        ..Default::default()
    };

    match text.find(NEGATIVE_MARKER) {
        Some(idx) => {
            record.prompt = non_empty(text[..idx].trim());
            let rest = &text[idx + NEGATIVE_MARKER.len()..];
            let negative = rest.split('\n').next().unwrap_or_default();
            record.negative_prompt = non_empty(negative.trim());
        }
        None => {
            let first = text.split('\n').next().unwrap_or_default().trim();
            // Civitai JPEG UserComments often hold only the settings line.
            // Reading it as the prompt would echo the settings back twice.
            let settings_only = !text.trim().contains('\n') && first.starts_with(STEPS_LABEL);
            if !settings_only {
                record.prompt = non_empty(first);
            }
        }
    }

    let settings = settings_line(text);
    if !settings.contains(STEPS_LABEL) {
        record.error = Some("Could not parse parameters: missing Steps".to_string());
    }
    apply_settings(&mut record, settings);

    record
}

/// The last non-blank line.
fn settings_line(text: &str) -> &str {
    text.trim_end().rsplit('\n').next().unwrap_or_default()
}

/// `Key: value, Key: value, ...`. Unknown keys are ignored.
fn apply_settings(record: &mut ProvenanceRecord, line: &str) {
    for pair in line.split(", ") {
        let Some((key, value)) = pair.split_once(": ") else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "Steps" => record.steps = Some(Param::from(value)),
            "Sampler" => record.sampler = Some(value.to_string()),
            "CFG scale" => record.cfg_scale = Some(Param::from(value)),
            "Seed" => record.seed = Some(Param::from(value)),
            "Size" => record.size = Some(value.to_string()),
            "Model" => record.model = Some(value.to_string()),
            _ => {}
        }
    }
}
