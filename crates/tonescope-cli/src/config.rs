//! Analyzer configuration files.
//!
//! The analyzer settings live in a TOML file with one table per pipeline
//! stage. Missing keys fall back to the defaults, and the loaded settings are
//! validated before use.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tonescope_core::AnalyzerConfig;

/// Errors that can occur while loading or saving a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path to the file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path to the file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize to TOML.
    #[error("failed to serialize to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The file parsed but holds unusable settings.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] tonescope_core::Error),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFile {
            path: path.into(),
            source,
        }
    }
}

/// Parse and validate configuration text.
pub fn parse_config(text: &str) -> Result<AnalyzerConfig, ConfigError> {
    let config: AnalyzerConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<AnalyzerConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let config = parse_config(&text)?;
    tracing::debug!(path = %path.display(), ?config, "loaded analyzer config");
    Ok(config)
}

/// Render a configuration as TOML.
pub fn to_toml(config: &AnalyzerConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

/// Write a configuration file.
pub fn save_config(path: &Path, config: &AnalyzerConfig) -> Result<(), ConfigError> {
    let text = to_toml(config)?;
    std::fs::write(path, text).map_err(|e| ConfigError::write_file(path, e))
}
