use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::metadata::AiMapOptions;

/// Top-level configuration for the genmeta library and CLI.
///
/// Controls which files are collected from directories, what goes into the
/// `ai` map, and how results are printed.
///
/// # Loading
///
/// ```rust,no_run
/// use genmeta::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.extraction.include_raw_text = true;
/// config.scan.extensions.push("jfif".into());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which files are picked up when walking directories.
    pub scan: ScanConfig,
    /// What the extractor decodes and keeps.
    pub extraction: ExtractionConfig,
    /// How results are printed.
    pub output: OutputConfig,
}

/// Directory walking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Follow symlinks while walking.
    pub follow_links: bool,
    /// Lower-case file extensions to collect, without the dot.
    pub extensions: Vec<String>,
}

/// Controls what each extraction produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Decode the standard EXIF tags with `nom-exif`.
    pub decode_exif: bool,
    /// Keep the ComfyUI graphs in the `ai` map. They can be large.
    pub include_workflow: bool,
    /// Keep the raw payload text in the `ai` map.
    pub include_raw_text: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print JSON instead of a table.
    pub json: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_links: true,
            extensions: ["png", "jpg", "jpeg"].map(String::from).to_vec(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            decode_exif: true,
            include_workflow: true,
            include_raw_text: false,
        }
    }
}

impl ExtractionConfig {
    /// The `ai` map switches for [`crate::metadata::extract_with`].
    pub fn extract_options(&self) -> AiMapOptions {
        AiMapOptions {
            include_workflow: self.include_workflow,
            include_raw_text: self.include_raw_text,
        }
    }
}

impl Config {
    /// Resolve the config file path: `config.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Whether `ext` (any case, no dot) is one of the scanned extensions.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.scan.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.scan.follow_links);
        assert_eq!(config.scan.extensions, vec!["png", "jpg", "jpeg"]);
        assert!(config.extraction.decode_exif);
        assert!(config.extraction.include_workflow);
        assert!(!config.extraction.include_raw_text);
        assert!(!config.output.json);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.json"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.output.json = true;
        config.scan.extensions = vec!["png".into()];
        config.save(Some(&path)).unwrap();

        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"extraction": {"include_raw_text": true}}"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.extraction.include_raw_text);
        assert!(config.extraction.decode_exif);
        assert_eq!(config.scan, ScanConfig::default());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn extension_matching_ignores_case() {
        let config = Config::default();
        assert!(config.accepts_extension("PNG"));
        assert!(config.accepts_extension("Jpeg"));
        assert!(!config.accepts_extension("webp"));
    }

    #[test]
    fn extract_options_follow_config() {
        let mut config = Config::default();
        config.extraction.include_workflow = false;
        let options = config.extraction.extract_options();
        assert!(!options.include_workflow);
        assert!(!options.include_raw_text);
    }
}
