//! Configuration file handling for spectra-studio.
//!
//! Loads configuration from `~/.config/spectra-studio/config.toml` or a
//! custom path. API keys never live here; they come from the environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::export::DEFAULT_TARGET_DIM;
use crate::services::{
    CODEGEN_API_BASE_URL, DEFAULT_IMAGE_MODEL, IMAGE_API_BASE_URL, METADATA_API_BASE_URL,
    UPSCALE_API_BASE_URL,
};

/// Configuration file structure for spectra-studio.
/// Loaded from ~/.config/spectra-studio/config.toml (or custom path via --config).
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_metadata_base_url")]
    pub metadata_base_url: String,
    #[serde(default = "default_upscale_base_url")]
    pub upscale_base_url: String,
    #[serde(default = "default_codegen_base_url")]
    pub codegen_base_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            image_base_url: default_image_base_url(),
            image_model: default_image_model(),
            metadata_base_url: default_metadata_base_url(),
            upscale_base_url: default_upscale_base_url(),
            codegen_base_url: default_codegen_base_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_jpg_target_dim")]
    pub jpg_target_dim: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            jpg_target_dim: default_jpg_target_dim(),
        }
    }
}

fn default_image_base_url() -> String {
    IMAGE_API_BASE_URL.to_string()
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_metadata_base_url() -> String {
    METADATA_API_BASE_URL.to_string()
}

fn default_upscale_base_url() -> String {
    UPSCALE_API_BASE_URL.to_string()
}

fn default_codegen_base_url() -> String {
    CODEGEN_API_BASE_URL.to_string()
}

fn default_jpg_target_dim() -> u32 {
    DEFAULT_TARGET_DIM
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("spectra-studio/config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/spectra-studio/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.services.image_base_url, IMAGE_API_BASE_URL);
        assert_eq!(config.export.jpg_target_dim, DEFAULT_TARGET_DIM);
    }

    #[test]
    fn test_partial_file_keeps_section_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[export]\njpg_target_dim = 2048").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.export.jpg_target_dim, 2048);
        assert_eq!(config.services.image_model, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml [[").unwrap();

        let result = Config::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
