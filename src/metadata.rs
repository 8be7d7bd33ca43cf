//! Assembly of the caller-facing [`ImageMetadata`] record.
//!
//! [`extract`] is the single entry point of the engine. It sniffs the
//! container, pulls the generator text out of it, normalises that text and
//! merges the result with file facts and tag maps supplied by the caller.
//! It never fails; anything that went wrong is listed in
//! [`ImageMetadata::diagnostics`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::container::{ContainerKind, TextChunkMap, jpeg, png};
use crate::provenance::{self, PARAMETERS_KEY, PROMPT_KEY, ProvenanceRecord};

pub use crate::provenance::AiMapOptions;

/// Tag name → rendered value.
pub type TagMap = BTreeMap<String, String>;

/// Facts about the file that the caller already knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    /// MIME type hint. When absent the type is taken from the magic number.
    pub mime_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            ..Default::default()
        }
    }
}

/// Tag maps produced by an external decoder, passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalTags {
    pub exif: TagMap,
    pub iptc: TagMap,
}

/// Something that limited what could be extracted. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum Diagnostic {
    /// Neither PNG nor JPEG magic matched.
    NotRecognizedContainer,
    /// Chunk or segment framing ran past the end of the buffer.
    MalformedContainer(String),
    /// Text was found but could not be read as any dialect.
    UnparseableDialectPayload(String),
    /// The external tag decoder failed; its maps are empty.
    ExternalTagDecodeFailure(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRecognizedContainer => f.write_str("not a PNG or JPEG file"),
            Self::MalformedContainer(detail) => write!(f, "malformed container: {detail}"),
            Self::UnparseableDialectPayload(detail) => write!(f, "unparseable payload: {detail}"),
            Self::ExternalTagDecodeFailure(detail) => write!(f, "tag decoding failed: {detail}"),
        }
    }
}

/// Everything known about one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub exif: TagMap,
    pub iptc: TagMap,
    /// Always empty; XMP packets are not parsed.
    pub xmp: TagMap,
    /// Flat, snake_case view of [`provenance`](Self::provenance).
    pub ai: Map<String, Value>,
    #[serde(skip)]
    pub provenance: ProvenanceRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl ImageMetadata {
    /// `true` when any generation metadata was recovered.
    pub fn has_ai(&self) -> bool {
        !self.ai.is_empty()
    }
}

/// Extract with [`AiMapOptions::default`].
///
/// ```rust
/// use genmeta::metadata::{extract, ExternalTags, FileInfo};
///
/// let meta = extract(b"GIF89a", FileInfo::new("anim.gif", 6), ExternalTags::default());
/// assert_eq!(meta.file_type, "application/octet-stream");
/// assert!(!meta.has_ai());
/// ```
pub fn extract(bytes: &[u8], file: FileInfo, tags: ExternalTags) -> ImageMetadata {
    extract_with(bytes, file, tags, &AiMapOptions::default())
}

/// Build the [`ImageMetadata`] for a fully buffered image.
///
/// The output depends only on the arguments.
pub fn extract_with(
    bytes: &[u8],
    file: FileInfo,
    tags: ExternalTags,
    options: &AiMapOptions,
) -> ImageMetadata {
    let kind = ContainerKind::sniff(bytes);
    let mut diagnostics = Vec::new();

    let chunks = match kind {
        ContainerKind::Png => png_chunks(bytes, &mut diagnostics),
        ContainerKind::Jpeg => jpeg_chunks(bytes, &mut diagnostics),
        ContainerKind::Unknown => {
            log::debug!("{}: unrecognised container", file.name);
            diagnostics.push(Diagnostic::NotRecognizedContainer);
            TextChunkMap::new()
        }
    };

    let record = provenance::parse(&chunks);
    if let Some(error) = &record.error {
        diagnostics.push(Diagnostic::UnparseableDialectPayload(error.clone()));
    }

    let file_type = file
        .mime_type
        .unwrap_or_else(|| kind.mime_type().to_string());

    ImageMetadata {
        file_name: file.name,
        file_size: file.size,
        file_type,
        last_modified: file.last_modified,
        exif: tags.exif,
        iptc: tags.iptc,
        xmp: TagMap::new(),
        ai: record.to_ai_map(*options),
        provenance: record,
        diagnostics,
    }
}

fn png_chunks(bytes: &[u8], diagnostics: &mut Vec<Diagnostic>) -> TextChunkMap {
    let scan = match png::read_text_chunks(bytes) {
        Ok(scan) => scan,
        Err(e) => {
            diagnostics.push(Diagnostic::MalformedContainer(e.to_string()));
            return TextChunkMap::new();
        }
    };
    if let Some(e) = scan.truncated {
        diagnostics.push(Diagnostic::MalformedContainer(e.to_string()));
    }
    for keyword in scan.compressed {
        diagnostics.push(Diagnostic::UnparseableDialectPayload(format!(
            "compressed iTXt chunk '{keyword}' not decoded"
        )));
    }
    scan.chunks
}

/// A JSON comment is offered as a ComfyUI `prompt`, anything else as A1111 `parameters`.
fn jpeg_chunks(bytes: &[u8], diagnostics: &mut Vec<Diagnostic>) -> TextChunkMap {
    let found = match jpeg::find_user_comment(bytes) {
        Ok(found) => found,
        Err(e) => {
            diagnostics.push(Diagnostic::MalformedContainer(e.to_string()));
            return TextChunkMap::new();
        }
    };
    if let Some(e) = found.truncated {
        diagnostics.push(Diagnostic::MalformedContainer(e.to_string()));
    }

    let mut chunks = TextChunkMap::new();
    if let Some(comment) = found.comment {
        let key = if comment.trim_start().starts_with('{') {
            PROMPT_KEY
        } else {
            PARAMETERS_KEY
        };
        chunks.insert(key, comment);
    }
    chunks
}
