// Tunable limits for decoding and search, loadable from a JSON file
use crate::error::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    pub max_results: usize,
    pub max_matches_per_line: usize,
    pub max_matches_per_file: usize,
    /// Characters kept on each side of a match in its context snippet.
    pub context_radius: usize,
    pub preview_chars: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_results: 50,
            max_matches_per_line: 3,
            max_matches_per_file: 20,
            context_radius: 20,
            preview_chars: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderLimits {
    /// Decoded text longer than this (in characters) is not analyzed.
    pub max_analyze_chars: usize,
    pub binary_sample_size: usize,
    /// Fraction of non-printable bytes above which content counts as binary.
    pub binary_threshold: f64,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self {
            max_analyze_chars: 1024 * 1024,
            binary_sample_size: 1000,
            binary_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub search: SearchLimits,
    pub decoder: DecoderLimits,
}

impl ScopeConfig {
    /// Default location: `<config dir>/archscope/config.json`
    pub fn config_file_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("archscope")
            .join("config.json")
    }

    /// Load from an explicit path, or from the default location when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Self::config_file_path();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    debug!("No config file at {}, using defaults", default_path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ArchiveError::Config(format!("{}: {}", path.display(), e)))?;
        let config: ScopeConfig = serde_json::from_str(&content)
            .map_err(|e| ArchiveError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: ScopeConfig =
            serde_json::from_str(content).map_err(|e| ArchiveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.decoder.binary_threshold) {
            return Err(ArchiveError::Config(
                "decoder.binary_threshold must be between 0 and 1".to_string(),
            ));
        }
        if self.decoder.binary_sample_size == 0 {
            return Err(ArchiveError::Config(
                "decoder.binary_sample_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
