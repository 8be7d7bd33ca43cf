use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::exif;
use crate::metadata::{self, Diagnostic, ExternalTags, FileInfo, ImageMetadata};

/// Image formats that can carry generation metadata, judged by extension.
///
/// The extractor itself goes by magic number; this only supplies the MIME
/// hint for a file on disk.
///
/// # Example
///
/// ```rust
/// use genmeta::pipeline::ImageKind;
/// use std::path::Path;
///
/// assert_eq!(ImageKind::from_path(Path::new("render.PNG")), Some(ImageKind::Png));
/// assert_eq!(ImageKind::from_path(Path::new("photo.jpeg")), Some(ImageKind::Jpeg));
/// assert_eq!(ImageKind::from_path(Path::new("clip.webp")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// The outcome of extracting one file.
///
/// `error` is only set when the file itself could not be read; problems
/// inside the file are reported through [`ImageMetadata::diagnostics`].
///
/// # Example
///
/// ```rust,no_run
/// # use genmeta::pipeline::process_image;
/// # use genmeta::config::Config;
/// let result = process_image("render.png".as_ref(), &Config::default());
///
/// if let Some(meta) = &result.metadata {
///     println!("{}: {:?}", meta.file_name, meta.ai.get("prompt"));
/// }
/// ```
#[derive(Debug)]
pub struct ProcessResult {
    pub path: PathBuf,
    pub metadata: Option<ImageMetadata>,
    pub error: Option<String>,
}

/// Collect image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively and filtered by `config.scan.extensions`. Explicitly named
/// files are filtered the same way.
///
/// # Example
///
/// ```rust,no_run
/// use genmeta::config::Config;
/// use genmeta::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(
///     &[
///         PathBuf::from("render.png"),  // single file
///         PathBuf::from("./outputs/"),  // entire directory
///     ],
///     &Config::default(),
/// );
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf], config: &Config) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_wanted(path, config) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(config.scan.follow_links)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_wanted(p, config) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

fn is_wanted(path: &Path, config: &Config) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| config.accepts_extension(ext))
        .unwrap_or(false)
}

/// Read a file from disk and extract its metadata.
pub fn process_image(path: &Path, config: &Config) -> ProcessResult {
    match read_image(path, config) {
        Ok(metadata) => {
            log::debug!(
                "{}: {} ({} diagnostic(s))",
                path.display(),
                metadata.provenance.dialect,
                metadata.diagnostics.len()
            );
            ProcessResult {
                path: path.to_path_buf(),
                metadata: Some(metadata),
                error: None,
            }
        }
        Err(e) => ProcessResult {
            path: path.to_path_buf(),
            metadata: None,
            error: Some(format!("{e:#}")),
        },
    }
}

fn read_image(path: &Path, config: &Config) -> Result<ImageMetadata> {
    let stat = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let file = FileInfo {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        size: stat.len(),
        mime_type: ImageKind::from_path(path).map(|k| k.mime_type().to_string()),
        last_modified: stat.modified().ok().map(DateTime::<Utc>::from),
    };

    Ok(process_bytes(&bytes, file, config))
}

/// Extract from an already buffered upload.
///
/// Decodes the EXIF tags (when enabled) and runs the extractor. A tag
/// decoder failure is recorded as a diagnostic and leaves the tag maps
/// empty.
pub fn process_bytes(bytes: &[u8], file: FileInfo, config: &Config) -> ImageMetadata {
    let mut failure = None;
    let tags = if config.extraction.decode_exif {
        exif::decode_tags(bytes).unwrap_or_else(|e| {
            log::debug!("{}: EXIF decoding failed: {e:#}", file.name);
            failure = Some(Diagnostic::ExternalTagDecodeFailure(format!("{e:#}")));
            ExternalTags::default()
        })
    } else {
        ExternalTags::default()
    };

    let mut meta = metadata::extract_with(bytes, file, tags, &config.extraction.extract_options());
    meta.diagnostics.extend(failure);
    meta
}
