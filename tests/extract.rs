use genmeta::container::png::read_text_chunks;
use genmeta::metadata::{Diagnostic, ExternalTags, FileInfo, extract};
use genmeta::provenance::{self, Dialect};
use pretty_assertions::assert_eq;
use serde_json::json;

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

fn chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = (data.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    out
}

fn text_chunk(keyword: &str, text: &str) -> Vec<u8> {
    chunk(b"tEXt", format!("{keyword}\0{text}").as_bytes())
}

fn itxt_chunk(keyword: &str, text: &str) -> Vec<u8> {
    let mut data = keyword.as_bytes().to_vec();
    data.extend_from_slice(&[0, 0, 0, 0, 0]);
    data.extend_from_slice(text.as_bytes());
    chunk(b"iTXt", &data)
}

fn png(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = PNG_SIGNATURE.to_vec();
    out.extend(chunk(b"IHDR", &[0, 0, 2, 0, 0, 0, 3, 0, 8, 6, 0, 0, 0]));
    for c in chunks {
        out.extend_from_slice(c);
    }
    out.extend(chunk(b"IDAT", &[0x78, 0x9C, 0x03, 0x00]));
    out.extend(chunk(b"IEND", &[]));
    out
}

fn civitai_jpeg(comment: &str) -> Vec<u8> {
    let mut body = b"Exif\0\0MM\0*\0\0\0\x08".to_vec();
    body.extend_from_slice(b"UNICODE\0");
    body.extend(comment.bytes().flat_map(|b| [b, 0]));

    let mut out = vec![0xFF, 0xD8];
    // JFIF APP0 before the EXIF segment, as most encoders write it
    out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    out.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn run(bytes: &[u8], name: &str) -> genmeta::ImageMetadata {
    extract(bytes, FileInfo::new(name, bytes.len() as u64), ExternalTags::default())
}

// ── PNG ──────────────────────────────────────────────────────────────

#[test]
fn png_parameters_chunk_is_a1111() {
    let bytes = png(&[text_chunk(
        "parameters",
        "masterpiece, 1girl, cherry blossoms\nNegative prompt: lowres, bad hands\nSteps: 28, Sampler: DPM++ 2M Karras, CFG scale: 6.5, Seed: 2718281828, Size: 832x1216, Model: animagine-xl-3.1",
    )]);
    let meta = run(&bytes, "render.png");

    assert_eq!(meta.provenance.dialect, Dialect::A1111);
    assert_eq!(
        serde_json::Value::Object(meta.ai),
        json!({
            "dialect": "A1111",
            "prompt": "masterpiece, 1girl, cherry blossoms",
            "negative_prompt": "lowres, bad hands",
            "sampler": "DPM++ 2M Karras",
            "size": "832x1216",
            "model": "animagine-xl-3.1",
            "steps": "28",
            "cfg_scale": "6.5",
            "seed": "2718281828",
        })
    );
}

#[test]
fn itxt_prompt_is_comfyui_graph() {
    let bytes = png(&[itxt_chunk("prompt", r#"{"a":1}"#)]);

    let scan = read_text_chunks(&bytes).unwrap();
    assert_eq!(scan.chunks.get("prompt"), Some(r#"{"a":1}"#));

    let meta = run(&bytes, "comfy.png");
    assert_eq!(meta.provenance.dialect, Dialect::ComfyUI);
    assert_eq!(meta.provenance.workflow_graph, Some(json!({"a": 1})));
    assert_eq!(meta.ai["comfyui_workflow"], json!({"a": 1}));
}

#[test]
fn comfyui_prompt_and_workflow() {
    let graph = r#"{"4":{"class_type":"CheckpointLoaderSimple","inputs":{"ckpt_name":"v1-5.safetensors"}},"6":{"class_type":"CLIPTextEncode","inputs":{"text":"a castle","clip":["4",1]}},"3":{"class_type":"KSampler","inputs":{"seed":99,"steps":25,"cfg":7.5,"sampler_name":"dpmpp_2m","model":["4",0]}}}"#;
    let bytes = png(&[
        text_chunk("prompt", graph),
        text_chunk("workflow", r#"{"last_node_id":6,"nodes":[]}"#),
    ]);
    let meta = run(&bytes, "comfy.png");

    assert_eq!(meta.ai["model"], json!("v1-5.safetensors"));
    assert_eq!(meta.ai["seed"], json!(99));
    assert_eq!(meta.ai["steps"], json!(25));
    assert_eq!(meta.ai["cfg_scale"], json!(7.5));
    assert_eq!(meta.ai["prompt_fragments"], json!({"CLIPTextEncode:6": "a castle"}));
    assert_eq!(meta.ai["comfyui_workflow_ui"]["last_node_id"], json!(6));
}

#[test]
fn novelai_comment() {
    let bytes = png(&[
        text_chunk("Software", "NovelAI"),
        text_chunk(
            "Comment",
            r#"{"prompt":"cat","uc":"dog","steps":28,"scale":11,"seed":42,"sampler":"k_euler","width":512,"height":768}"#,
        ),
    ]);
    let record = run(&bytes, "nai.png").provenance;

    assert_eq!(record.dialect, Dialect::NovelAI);
    assert_eq!(record.prompt.as_deref(), Some("cat"));
    assert_eq!(record.negative_prompt.as_deref(), Some("dog"));
    assert_eq!(record.steps.unwrap().as_i64(), Some(28));
    assert_eq!(record.cfg_scale.unwrap().as_f64(), Some(11.0));
    assert_eq!(record.seed.unwrap().as_i64(), Some(42));
    assert_eq!(record.sampler.as_deref(), Some("k_euler"));
    assert_eq!(record.size.as_deref(), Some("512x768"));
}

#[test]
fn novelai_seed_beyond_u64_survives_serialization() {
    let bytes = png(&[text_chunk("Comment", r#"{"prompt":"x","seed":98765432109876543210}"#)]);
    let meta = run(&bytes, "nai.png");

    let json = serde_json::to_string(&meta).unwrap();
    assert!(json.contains(r#""seed":98765432109876543210"#));
    assert_eq!(meta.provenance.seed.unwrap().to_string(), "98765432109876543210");
}

#[test]
fn png_without_text_is_unknown_and_empty() {
    let bytes = png(&[]);
    let meta = run(&bytes, "plain.png");

    assert_eq!(meta.provenance.dialect, Dialect::Unknown);
    assert!(meta.provenance.is_empty());
    assert!(meta.ai.is_empty());
    assert!(meta.diagnostics.is_empty());
}

#[test]
fn parameters_wins_regardless_of_chunk_order() {
    let bytes = png(&[
        text_chunk("prompt", r#"{"1":{}}"#),
        text_chunk("parameters", "cat\nSteps: 3"),
    ]);
    assert_eq!(run(&bytes, "both.png").provenance.dialect, Dialect::A1111);
}

#[test]
fn truncated_png_keeps_earlier_chunks() {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend(text_chunk("parameters", "fox\nSteps: 10"));
    // a chunk claiming far more data than the file holds
    bytes.extend_from_slice(&0x7FFF_FFFFu32.to_be_bytes());
    bytes.extend_from_slice(b"tEXt");
    bytes.extend_from_slice(b"Comment\0{\"prompt\"");

    let meta = run(&bytes, "cut.png");
    assert_eq!(meta.provenance.dialect, Dialect::A1111);
    assert_eq!(meta.ai["prompt"], json!("fox"));
    assert!(matches!(meta.diagnostics[..], [Diagnostic::MalformedContainer(_)]));
}

#[test]
fn garbage_after_signature_does_not_panic() {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(&[0xFF; 3]);
    let meta = run(&bytes, "junk.png");
    assert!(meta.ai.is_empty());
    assert_eq!(meta.diagnostics.len(), 1);
}

// ── JPEG ─────────────────────────────────────────────────────────────

#[test]
fn civitai_jpeg_user_comment() {
    let bytes = civitai_jpeg("Steps: 20, Sampler: Euler a");
    let meta = run(&bytes, "civitai.jpg");

    assert_eq!(meta.file_type, "image/jpeg");
    assert_eq!(meta.provenance.dialect, Dialect::A1111);
    assert_eq!(meta.ai["steps"], json!("20"));
    assert_eq!(meta.ai["sampler"], json!("Euler a"));
    assert!(meta.provenance.prompt.is_none());
}

#[test]
fn civitai_jpeg_full_parameters() {
    let bytes = civitai_jpeg("portrait of a knight\nNegative prompt: blurry\nSteps: 35, Seed: 123456789012, Model: juggernaut");
    let record = run(&bytes, "civitai.jpg").provenance;

    assert_eq!(record.prompt.as_deref(), Some("portrait of a knight"));
    assert_eq!(record.negative_prompt.as_deref(), Some("blurry"));
    assert_eq!(record.seed.unwrap().to_string(), "123456789012");
    assert_eq!(record.model.as_deref(), Some("juggernaut"));
}

#[test]
fn jpeg_comment_without_markers_is_ignored() {
    let bytes = civitai_jpeg("Taken on holiday");
    let meta = run(&bytes, "photo.jpg");
    assert!(meta.ai.is_empty());
}

// ── assembly ─────────────────────────────────────────────────────────

#[test]
fn extraction_is_idempotent() {
    let bytes = png(&[text_chunk("parameters", "a\nNegative prompt: b\nSteps: 1, Seed: 2")]);
    let first = run(&bytes, "a.png");
    let second = run(&bytes, "a.png");

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn classify_matches_parse() {
    let bytes = png(&[text_chunk("Comment", r#"{"prompt":"owl"}"#)]);
    let chunks = read_text_chunks(&bytes).unwrap().chunks;
    assert_eq!(provenance::classify(&chunks), provenance::parse(&chunks).dialect);
}

#[test]
fn unknown_container_only_reports() {
    let meta = run(b"RIFF\0\0\0\0WEBPVP8 ", "a.webp");
    assert_eq!(meta.diagnostics, vec![Diagnostic::NotRecognizedContainer]);
    assert_eq!(meta.file_type, "application/octet-stream");
    assert!(meta.xmp.is_empty());
}
