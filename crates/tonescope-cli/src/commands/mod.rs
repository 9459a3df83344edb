//! CLI command implementations.

pub mod analyze;
pub mod config;
pub mod generate;
pub mod lut;
pub mod simulate;

use std::path::Path;
use tonescope_core::AnalyzerConfig;

/// Analyzer settings from `--config`, or the defaults.
fn analyzer_config(path: Option<&Path>) -> anyhow::Result<AnalyzerConfig> {
    match path {
        Some(path) => Ok(crate::config::load_config(path)?),
        None => Ok(AnalyzerConfig::default()),
    }
}

/// The analyzer's sample rate as stored in WAV headers.
fn sample_rate_hz() -> u32 {
    tonescope_core::SAMPLE_RATE as u32
}
