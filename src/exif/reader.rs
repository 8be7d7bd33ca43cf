use anyhow::{Context, Result};
use nom_exif::{EntryValue, ExifIter, MediaParser, MediaSource};
use std::io::Cursor;

use crate::container::{ContainerKind, JPEG_SOI};
use crate::metadata::{ExternalTags, TagMap};

const APP1: [u8; 2] = [0xFF, 0xE1];
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Decode the EXIF entries of a buffered image into a tag map.
///
/// Only JPEG input with an `Exif` APP1 segment is handed to the decoder.
/// Anything else yields empty maps: PNG keeps its generator text outside
/// EXIF, and plenty of JPEGs carry no EXIF at all. An error therefore
/// means the EXIF block exists but is unreadable. IPTC is not decoded and
/// always comes back empty.
pub fn decode_tags(bytes: &[u8]) -> Result<ExternalTags> {
    if ContainerKind::sniff(bytes) != ContainerKind::Jpeg || !has_exif_segment(bytes) {
        log::debug!("No EXIF data found");
        return Ok(ExternalTags::default());
    }

    let ms = MediaSource::seekable(Cursor::new(bytes.to_vec()))
        .context("Failed to open image buffer")?;
    let mut parser = MediaParser::new();
    let iter: ExifIter = parser.parse(ms).context("Failed to parse EXIF data")?;

    let mut exif = TagMap::new();
    for entry in iter {
        let Some(value) = entry.get_value().and_then(entry_to_string) else {
            continue;
        };
        let name = match entry.tag() {
            Some(tag) => format!("{tag:?}"),
            None => format!("0x{:04X}", entry.tag_code()),
        };
        // IFD0 comes first; thumbnail IFD duplicates don't override it.
        exif.entry(name).or_insert(value);
    }

    log::debug!("Decoded {} EXIF tag(s)", exif.len());
    Ok(ExternalTags {
        exif,
        iptc: TagMap::new(),
    })
}

/// Whether any APP1 segment starts with the `Exif\0\0` header.
fn has_exif_segment(bytes: &[u8]) -> bool {
    let Some(body) = bytes.get(JPEG_SOI.len()..) else {
        return false;
    };
    body.windows(APP1.len() + 2 + EXIF_HEADER.len())
        .any(|w| w.starts_with(&APP1) && w.ends_with(EXIF_HEADER))
}

/// Render an entry value as trimmed text, `None` if nothing is left.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}
