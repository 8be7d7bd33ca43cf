//! Container-level readers for the two image formats that carry generation
//! metadata in practice.
//!
//! - [`png`] walks the chunk stream and collects `tEXt` / `iTXt` payloads.
//! - [`jpeg`] finds the first APP1 segment and decodes the vendor
//!   `UNICODE` UserComment payload.
//!
//! Both work on a fully buffered file through [`ByteCursor`] and never read
//! past the end of the buffer.

pub mod cursor;
pub mod jpeg;
pub mod png;

pub use cursor::ByteCursor;

use serde::Serialize;
use std::collections::BTreeMap;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Container format detected from the leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContainerKind {
    Png,
    Jpeg,
    Unknown,
}

impl ContainerKind {
    /// Detect the container from its magic number.
    ///
    /// ```rust
    /// use genmeta::container::ContainerKind;
    ///
    /// assert_eq!(ContainerKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), ContainerKind::Jpeg);
    /// assert_eq!(ContainerKind::sniff(b"GIF89a"), ContainerKind::Unknown);
    /// ```
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&PNG_SIGNATURE) {
            Self::Png
        } else if bytes.starts_with(&JPEG_SOI) {
            Self::Jpeg
        } else {
            Self::Unknown
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Keyword → text pairs pulled out of a container.
///
/// Keywords are case-sensitive. Inserting a keyword that is already present
/// replaces its value, so the last chunk of a given keyword wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TextChunkMap(BTreeMap<String, String>);

impl TextChunkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, keyword: impl Into<String>, text: impl Into<String>) {
        self.0.insert(keyword.into(), text.into());
    }

    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.0.get(keyword).map(String::as_str)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains_key(keyword)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TextChunkMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
