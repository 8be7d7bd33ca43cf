//! Normalisation of generator-specific text into one [`ProvenanceRecord`].
//!
//! Generators embed their parameters in incompatible ways:
//!
//! | Dialect | Keyword | Payload |
//! |---------|---------|---------|
//! | [`Dialect::A1111`] | `parameters` | prompt lines + `Key: value, ...` settings line |
//! | [`Dialect::ComfyUI`] | `prompt` (+ `workflow`) | JSON node graph |
//! | [`Dialect::NovelAI`] | `Comment` / `Description` | flat JSON object |
//!
//! [`parse`] picks the dialect from the keywords present and runs the
//! matching sub-parser. Nothing here fails: malformed payloads produce a
//! partial record with [`ProvenanceRecord::error`] set.

pub mod a1111;
pub mod comfyui;
pub mod novelai;

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::container::TextChunkMap;

pub const PARAMETERS_KEY: &str = "parameters";
pub const PROMPT_KEY: &str = "prompt";
pub const WORKFLOW_KEY: &str = "workflow";
pub const COMMENT_KEY: &str = "Comment";
pub const DESCRIPTION_KEY: &str = "Description";

/// The convention a payload was written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Dialect {
    A1111,
    ComfyUI,
    NovelAI,
    #[default]
    Unknown,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A1111 => "A1111",
            Self::ComfyUI => "ComfyUI",
            Self::NovelAI => "NovelAI",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// A numeric-ish generation parameter kept in the form it was found.
///
/// JSON dialects hand us real numbers; A1111 hands us text. Neither is
/// coerced, so large seeds never lose precision and values like `7.0` or
/// `"20 (hires)"` survive untouched. `serde_json` is built with
/// `arbitrary_precision`, so a [`serde_json::Number`] keeps the digits it
/// was parsed from even past the `u64` range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Param {
    Number(serde_json::Number),
    Text(String),
}

impl Param {
    /// Accept a JSON scalar. Links (`["4", 0]`), objects and `null` are not parameters.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Text(b.to_string())),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Param {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Param {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

/// A text input found on a ComfyUI node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptFragment {
    pub node_id: String,
    pub class_type: String,
    pub text: String,
}

impl PromptFragment {
    /// `class_type:node_id`, e.g. `CLIPTextEncode:6`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.class_type, self.node_id)
    }
}

/// Generation parameters normalised across dialects.
///
/// Every field is optional: no dialect guarantees any of them, and a
/// missing field is not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProvenanceRecord {
    pub dialect: Dialect,
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub steps: Option<Param>,
    pub sampler: Option<String>,
    pub cfg_scale: Option<Param>,
    pub seed: Option<Param>,
    /// `WIDTHxHEIGHT`, e.g. `512x768`.
    pub size: Option<String>,
    pub model: Option<String>,
    /// ComfyUI only: every `text` input, in graph order.
    pub prompt_fragments: Vec<PromptFragment>,
    /// ComfyUI only: the executed node graph (`prompt` keyword).
    pub workflow_graph: Option<Value>,
    /// ComfyUI only: the editor graph (`workflow` keyword).
    pub workflow_ui: Option<Value>,
    /// The payload the record was parsed from.
    pub raw_text: Option<String>,
    /// Why parsing was partial, if it was.
    pub error: Option<String>,
}

/// Which optional parts of a record go into the flat `ai` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiMapOptions {
    /// Put the ComfyUI graphs into the `ai` map.
    pub include_workflow: bool,
    /// Put the raw payload text into the `ai` map.
    pub include_raw_text: bool,
}

impl Default for AiMapOptions {
    fn default() -> Self {
        Self {
            include_workflow: true,
            include_raw_text: false,
        }
    }
}

impl ProvenanceRecord {
    /// `true` when nothing at all was recovered.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `(WIDTH, HEIGHT)` parsed from [`size`](Self::size).
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let (w, h) = self.size.as_deref()?.split_once('x')?;
        Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
    }

    /// Flatten into the snake_case key/value map exposed as `ImageMetadata::ai`.
    ///
    /// An empty record produces an empty map.
    pub fn to_ai_map(&self, options: AiMapOptions) -> Map<String, Value> {
        let mut map = Map::new();
        if self.is_empty() {
            return map;
        }

        map.insert("dialect".into(), Value::String(self.dialect.to_string()));

        let text_fields = [
            ("prompt", &self.prompt),
            ("negative_prompt", &self.negative_prompt),
            ("sampler", &self.sampler),
            ("size", &self.size),
            ("model", &self.model),
        ];
        for (key, value) in text_fields {
            if let Some(v) = value {
                map.insert(key.into(), Value::String(v.clone()));
            }
        }

        let params = [
            ("steps", &self.steps),
            ("cfg_scale", &self.cfg_scale),
            ("seed", &self.seed),
        ];
        for (key, value) in params {
            if let Some(v) = value {
                map.insert(key.into(), v.to_json());
            }
        }

        if !self.prompt_fragments.is_empty() {
            let fragments: Map<String, Value> = self
                .prompt_fragments
                .iter()
                .map(|f| (f.key(), Value::String(f.text.clone())))
                .collect();
            map.insert("prompt_fragments".into(), Value::Object(fragments));
        }

        if options.include_workflow {
            if let Some(graph) = &self.workflow_graph {
                map.insert("comfyui_workflow".into(), graph.clone());
            }
            if let Some(ui) = &self.workflow_ui {
                map.insert("comfyui_workflow_ui".into(), ui.clone());
            }
        }

        if options.include_raw_text {
            if let Some(raw) = &self.raw_text {
                map.insert("raw_text".into(), Value::String(raw.clone()));
            }
        }

        if let Some(error) = &self.error {
            map.insert("error".into(), Value::String(error.clone()));
        }

        map
    }

    /// Human-readable rendering: a `Format:` header and one row per field.
    pub fn display_rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![("Format".to_string(), self.dialect.to_string())];
        let mut push = |label: &str, value: Option<String>| {
            if let Some(v) = value {
                rows.push((label.to_string(), v));
            }
        };

        push("Prompt", self.prompt.clone());
        push("Negative Prompt", self.negative_prompt.clone());
        push("Steps", self.steps.as_ref().map(Param::to_string));
        push("Sampler", self.sampler.clone());
        push("CFG scale", self.cfg_scale.as_ref().map(Param::to_string));
        push("Seed", self.seed.as_ref().map(Param::to_string));
        push("Size", self.size.clone());
        push("Model", self.model.clone());
        for fragment in &self.prompt_fragments {
            push(&fragment.key(), Some(fragment.text.clone()));
        }
        push("Error", self.error.clone());

        rows
    }
}

/// A payload matched to its dialect, ready for the sub-parser.
enum Detected<'a> {
    A1111(&'a str),
    ComfyUI {
        prompt: &'a str,
        graph: Map<String, Value>,
        workflow: Option<&'a str>,
    },
    NovelAI {
        text: &'a str,
        data: Map<String, Value>,
    },
    Unknown {
        /// A `prompt` value that was present but not a node graph.
        stray_prompt: Option<(&'a str, String)>,
    },
}

/// First match wins: `parameters`, then a JSON `prompt`, then a JSON
/// `Comment`/`Description` carrying a `prompt` field.
fn detect(chunks: &TextChunkMap) -> Detected<'_> {
    if let Some(text) = chunks.get(PARAMETERS_KEY) {
        return Detected::A1111(text);
    }

    let mut stray_prompt = None;
    if let Some(prompt) = chunks.get(PROMPT_KEY) {
        match comfyui::parse_graph(prompt) {
            Ok(graph) => {
                return Detected::ComfyUI {
                    prompt,
                    graph,
                    workflow: chunks.get(WORKFLOW_KEY),
                };
            }
            Err(reason) => stray_prompt = Some((prompt, reason)),
        }
    }

    for key in [COMMENT_KEY, DESCRIPTION_KEY] {
        if let Some(text) = chunks.get(key) {
            if let Some(data) = novelai::parse_payload(text) {
                return Detected::NovelAI { text, data };
            }
        }
    }

    Detected::Unknown { stray_prompt }
}

/// Classify a keyword map without extracting fields.
pub fn classify(chunks: &TextChunkMap) -> Dialect {
    match detect(chunks) {
        Detected::A1111(_) => Dialect::A1111,
        Detected::ComfyUI { .. } => Dialect::ComfyUI,
        Detected::NovelAI { .. } => Dialect::NovelAI,
        Detected::Unknown { .. } => Dialect::Unknown,
    }
}

/// Classify a keyword map and extract a normalised record.
///
/// ```rust
/// use genmeta::container::TextChunkMap;
/// use genmeta::provenance::{parse, Dialect};
///
/// let chunks: TextChunkMap = [(
///     "parameters",
///     "a red fox\nNegative prompt: blurry\nSteps: 20, Sampler: Euler a, Seed: 42",
/// )]
/// .into_iter()
/// .collect();
///
/// let record = parse(&chunks);
/// assert_eq!(record.dialect, Dialect::A1111);
/// assert_eq!(record.prompt.as_deref(), Some("a red fox"));
/// assert_eq!(record.seed.unwrap().to_string(), "42");
/// ```
pub fn parse(chunks: &TextChunkMap) -> ProvenanceRecord {
    match detect(chunks) {
        Detected::A1111(text) => a1111::parse(text),
        Detected::ComfyUI {
            prompt,
            graph,
            workflow,
        } => comfyui::parse(prompt, graph, workflow),
        Detected::NovelAI { text, data } => novelai::parse(text, &data),
        Detected::Unknown {
            stray_prompt: Some((prompt, reason)),
        } => ProvenanceRecord {
            raw_text: Some(prompt.to_string()),
            error: Some(format!("prompt is not a ComfyUI graph: {reason}")),
            ..Default::default()
        },
        Detected::Unknown { stray_prompt: None } => ProvenanceRecord::default(),
    }
}

/// `Some(s)` unless `s` is empty.
pub(crate) fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// A JSON scalar rendered as text (strings unquoted).
pub(crate) fn json_text(value: &Value) -> Option<String> {
    Param::from_json(value).map(|p| p.to_string())
}
