//! # genmeta
//!
//! Extract AI image-generation provenance (prompt, negative prompt, sampler,
//! seed, model, workflow graph) embedded in PNG and JPEG files by A1111 /
//! Forge, ComfyUI, NovelAI and Civitai re-encodes.
//!
//! ## Quick Start
//!
//! The simplest way to use the library is through the pipeline module, which
//! reads a file, decodes its EXIF tags and runs the extractor:
//!
//! ```rust,no_run
//! use genmeta::config::Config;
//! use genmeta::pipeline::{collect_images, process_image};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     // Collect images from paths (files or directories)
//!     let images = collect_images(&[PathBuf::from("./outputs")], &config);
//!
//!     for path in &images {
//!         let result = process_image(path, &config);
//!         match (&result.metadata, &result.error) {
//!             (Some(meta), _) => println!("{}: {:?}", meta.file_name, meta.ai.get("prompt")),
//!             (None, Some(err)) => eprintln!("Error processing {}: {err}", path.display()),
//!             _ => {}
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The engine itself does no I/O. Hand it a buffer and whatever the caller
//! knows about the file:
//!
//! ```rust
//! use genmeta::{extract, ExternalTags, FileInfo};
//!
//! let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
//! let text = b"parameters\0a lighthouse\nSteps: 30, Seed: 1234";
//! png.extend_from_slice(&(text.len() as u32).to_be_bytes());
//! png.extend_from_slice(b"tEXt");
//! png.extend_from_slice(text);
//! png.extend_from_slice(&[0; 4]);
//!
//! let meta = extract(&png, FileInfo::new("render.png", png.len() as u64), ExternalTags::default());
//! assert_eq!(meta.ai["prompt"], "a lighthouse");
//! assert_eq!(meta.ai["seed"], "1234");
//! ```
//!
//! ## Where the metadata lives
//!
//! | Generator | Container | Location |
//! |-----------|-----------|----------|
//! | A1111 / Forge | PNG | `tEXt`/`iTXt` keyword `parameters` |
//! | ComfyUI | PNG | keywords `prompt` (graph) and `workflow` (editor) |
//! | NovelAI | PNG | keyword `Comment` (JSON) |
//! | Civitai | JPEG | EXIF `UserComment`, `UNICODE` encoded |
//!
//! ## Modules
//!
//! - [`container`]: PNG chunk and JPEG segment readers
//! - [`provenance`]: dialect detection and the normalised record
//! - [`metadata`]: the [`extract`] entry point and the output record
//! - [`exif`]: standard EXIF tags via `nom-exif`
//! - [`pipeline`]: file collection and reading from disk
//! - [`config`]: configuration types and loading/saving

pub mod config;
pub mod container;
pub mod error;
pub mod exif;
pub mod metadata;
pub mod pipeline;
pub mod provenance;

pub use error::{Error, Result};
pub use metadata::{ExternalTags, FileInfo, ImageMetadata, extract};
