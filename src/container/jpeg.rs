use super::JPEG_SOI;
use super::cursor::ByteCursor;
use crate::error::{Error, Result};

const APP1: [u8; 2] = [0xFF, 0xE1];
const UNICODE_MARKER: &[u8] = b"UNICODE";
// 7-byte "UNICODE" token plus one pad byte.
const PAYLOAD_OFFSET: usize = 8;

/// Outcome of scanning a JPEG for a generator UserComment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JpegComment {
    /// Decoded payload, present only when it looks like generation metadata.
    pub comment: Option<String>,
    /// Set when the APP1 segment claims more bytes than the file holds.
    pub truncated: Option<Error>,
}

/// Find the first APP1 segment and decode the `UNICODE` UserComment in it.
///
/// Only the first APP1 segment is inspected. The payload after the marker
/// is decoded by dropping every zero byte, which matches the encoder that
/// writes these comments (ASCII text stored as UTF-16LE) but is not a
/// general EXIF UserComment decoder: genuine non-Latin UTF-16 text comes
/// out garbled.
///
/// Fails only with [`Error::NotJpeg`].
pub fn find_user_comment(bytes: &[u8]) -> Result<JpegComment> {
    if !bytes.starts_with(&JPEG_SOI) {
        return Err(Error::NotJpeg);
    }

    let mut out = JpegComment::default();

    let Some(marker) = find_app1(bytes) else {
        log::debug!("No APP1 segment found");
        return Ok(out);
    };

    let mut cur = ByteCursor::at(bytes, marker + APP1.len());
    let length = match cur.read_u16_be() {
        Ok(len) => len as usize,
        Err(e) => {
            out.truncated = Some(e);
            return Ok(out);
        }
    };

    // The length field counts itself.
    let body = match cur.read_bytes(length.saturating_sub(2)) {
        Ok(body) => body,
        Err(e) => {
            log::debug!("APP1 segment truncated: {e}");
            out.truncated = Some(e);
            cur.read_bytes(cur.remaining()).unwrap_or_default()
        }
    };

    let Some(start) = find(body, UNICODE_MARKER) else {
        log::debug!("APP1 segment has no UNICODE UserComment");
        return Ok(out);
    };

    let payload = body.get(start + PAYLOAD_OFFSET..).unwrap_or_default();
    let comment = decode_null_interleaved(payload);

    if looks_like_generation_metadata(&comment) {
        out.comment = Some(comment);
    } else {
        log::debug!("UserComment does not look like generation metadata, ignoring");
    }

    Ok(out)
}

/// Drop every zero byte and read the rest as UTF-8 (lossy).
pub fn decode_null_interleaved(payload: &[u8]) -> String {
    let stripped: Vec<u8> = payload.iter().copied().filter(|&b| b != 0).collect();
    String::from_utf8_lossy(&stripped).into_owned()
}

fn looks_like_generation_metadata(comment: &str) -> bool {
    comment.contains("Steps:") || comment.trim().starts_with('{')
}

fn find_app1(bytes: &[u8]) -> Option<usize> {
    bytes
        .get(JPEG_SOI.len()..)?
        .windows(APP1.len())
        .position(|w| w == APP1)
        .map(|p| p + JPEG_SOI.len())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
