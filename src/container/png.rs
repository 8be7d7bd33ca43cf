use super::cursor::{ByteCursor, latin1};
use super::{PNG_SIGNATURE, TextChunkMap};
use crate::error::{Error, Result};

// PNG chunk framing: [length: u32 BE][type: 4 ASCII][data: length bytes][crc: 4 bytes].
// CRCs are not verified.
const TEXT: &[u8; 4] = b"tEXt";
const INTERNATIONAL_TEXT: &[u8; 4] = b"iTXt";
const END: &[u8; 4] = b"IEND";
const CRC_LEN: usize = 4;

/// Text pulled out of a PNG chunk stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PngText {
    /// `tEXt` and `iTXt` payloads keyed by keyword (later chunks overwrite earlier ones).
    pub chunks: TextChunkMap,
    /// Set when the chunk walk ran off the end of the buffer before `IEND`.
    pub truncated: Option<Error>,
    /// Keywords of compressed `iTXt` chunks that were skipped.
    pub compressed: Vec<String>,
}

struct Chunk<'a> {
    kind: &'a [u8],
    data: &'a [u8],
}

enum Decoded {
    Text(String, String),
    Compressed(String),
    Malformed,
}

/// Walk the PNG chunk stream and collect the text chunks.
///
/// Fails only with [`Error::NotPng`]. Framing that runs past the buffer
/// ends the walk and is reported through [`PngText::truncated`], keeping
/// every chunk that was read in full.
pub fn read_text_chunks(bytes: &[u8]) -> Result<PngText> {
    let signature_ok = ByteCursor::new(bytes)
        .peek_bytes(PNG_SIGNATURE.len())
        .map(|sig| sig == PNG_SIGNATURE)
        .unwrap_or(false);
    if !signature_ok {
        return Err(Error::NotPng);
    }

    let mut cur = ByteCursor::at(bytes, PNG_SIGNATURE.len());
    let mut out = PngText::default();

    while !cur.is_empty() {
        let chunk = match read_chunk(&mut cur) {
            Ok(chunk) => chunk,
            Err(e) => {
                log::debug!("PNG chunk stream truncated: {e}");
                out.truncated = Some(e);
                break;
            }
        };

        if chunk.kind == END {
            break;
        }

        let decoded = if chunk.kind == TEXT {
            Some(decode_text(chunk.data))
        } else if chunk.kind == INTERNATIONAL_TEXT {
            Some(decode_international_text(chunk.data))
        } else {
            None
        };

        match decoded {
            Some(Decoded::Text(keyword, text)) => out.chunks.insert(keyword, text),
            Some(Decoded::Compressed(keyword)) => {
                log::debug!("Skipping compressed iTXt chunk '{keyword}'");
                out.compressed.push(keyword);
            }
            Some(Decoded::Malformed) => {
                log::debug!("Skipping malformed {} chunk", latin1(chunk.kind));
            }
            None => {}
        }

        if let Err(e) = cur.skip(CRC_LEN) {
            log::debug!("PNG chunk CRC cut off: {e}");
            out.truncated = Some(e);
            break;
        }
    }

    Ok(out)
}

fn read_chunk<'a>(cur: &mut ByteCursor<'a>) -> Result<Chunk<'a>> {
    let length = cur.read_u32_be()? as usize;
    let kind = cur.read_bytes(4)?;
    let data = cur.read_bytes(length)?;
    Ok(Chunk { kind, data })
}

/// `keyword \0 text`
fn decode_text(data: &[u8]) -> Decoded {
    let Some(nul) = data.iter().position(|&b| b == 0) else {
        return Decoded::Malformed;
    };
    let keyword = latin1(&data[..nul]);
    let text = String::from_utf8_lossy(&data[nul + 1..]).into_owned();
    Decoded::Text(keyword, text)
}

/// `keyword \0 flag method language \0 translated \0 text`
fn decode_international_text(data: &[u8]) -> Decoded {
    let Some(nul) = data.iter().position(|&b| b == 0) else {
        return Decoded::Malformed;
    };
    let keyword = latin1(&data[..nul]);

    let mut cur = ByteCursor::at(data, nul + 1);
    let Ok(flags) = cur.read_bytes(2) else {
        return Decoded::Malformed;
    };
    if flags[0] != 0 {
        return Decoded::Compressed(keyword);
    }

    // language tag, then translated keyword
    for _ in 0..2 {
        if skip_nul_terminated(&mut cur).is_err() {
            return Decoded::Malformed;
        }
    }

    let rest = cur.read_bytes(cur.remaining()).unwrap_or_default();
    Decoded::Text(keyword, String::from_utf8_lossy(rest).into_owned())
}

fn skip_nul_terminated(cur: &mut ByteCursor<'_>) -> Result<()> {
    let rest = cur.peek_bytes(cur.remaining())?;
    match rest.iter().position(|&b| b == 0) {
        Some(n) => cur.skip(n + 1),
        None => Err(Error::OutOfBounds {
            offset: cur.position(),
            wanted: rest.len() + 1,
            remaining: rest.len(),
        }),
    }
}
