// Configuration loading and parsing (consensus.toml).

use crate::combine::{CombinationMethod, CombineSettings};
use crate::matching::{MatchThresholds, MergeStrategy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("unknown combination method `{0}` (expected one of: average, weighted_average, median, drop_high_low, confidence_bands)")]
    UnknownMethod(String),

    #[error("unknown merge strategy `{0}` (expected one of: prefer_source1, prefer_source2, combine)")]
    UnknownMergeStrategy(String),
}

// ---------------------------------------------------------------------------
// Top-level assembled config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusConfig {
    pub matching: MatchThresholds,
    pub combine: CombineSettings,
    /// Align sources with the fuzzy matcher instead of exact names.
    pub fuzzy_matching: bool,
    /// Strategy used by [`crate::matching::merge_sources`].
    pub merge_strategy: MergeStrategy,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            matching: MatchThresholds::default(),
            combine: CombineSettings::default(),
            fuzzy_matching: true,
            merge_strategy: MergeStrategy::PreferSource1,
        }
    }
}

// ---------------------------------------------------------------------------
// consensus.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the whole file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    matching: MatchThresholds,
    #[serde(default)]
    combine: CombineSection,
    #[serde(default)]
    merge: MergeSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct CombineSection {
    method: String,
    weights: Option<Vec<f64>>,
    confidence_level: f64,
    fuzzy_matching: bool,
}

impl Default for CombineSection {
    fn default() -> Self {
        Self {
            method: CombinationMethod::Average.as_str().to_string(),
            weights: None,
            confidence_level: crate::combine::DEFAULT_CONFIDENCE_LEVEL,
            fuzzy_matching: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct MergeSection {
    strategy: String,
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            strategy: MergeStrategy::PreferSource1.as_str().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from a TOML file.
pub fn load_config_from(path: &Path) -> Result<ConsensusConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = assemble(file)?;
    debug!("Loaded consensus config from {}", path.display());
    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(text: &str) -> Result<ConsensusConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: PathBuf::from("<inline>"),
        source: e,
    })?;
    assemble(file)
}

fn assemble(file: ConfigFile) -> Result<ConsensusConfig, ConfigError> {
    let method: CombinationMethod = file.combine.method.parse()?;
    let merge_strategy: MergeStrategy = file.merge.strategy.parse()?;

    let config = ConsensusConfig {
        matching: file.matching,
        combine: CombineSettings {
            method,
            weights: file.combine.weights,
            confidence_level: file.combine.confidence_level,
        },
        fuzzy_matching: file.combine.fuzzy_matching,
        merge_strategy,
    };

    validate(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &ConsensusConfig) -> Result<(), ConfigError> {
    config.matching.validate()?;

    let level = config.combine.confidence_level;
    if !(level > 0.0 && level < 1.0) {
        return Err(ConfigError::ValidationError {
            field: "combine.confidence_level".into(),
            message: format!("must be strictly between 0.0 and 1.0, got {level}"),
        });
    }

    if let Some(weights) = &config.combine.weights {
        if weights.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "combine.weights".into(),
                message: "must list at least one weight when present".into(),
            });
        }
        for (i, w) in weights.iter().enumerate() {
            if !w.is_finite() || *w < 0.0 {
                return Err(ConfigError::ValidationError {
                    field: format!("combine.weights[{i}]"),
                    message: format!("must be a finite value >= 0, got {w}"),
                });
            }
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::ValidationError {
                field: "combine.weights".into(),
                message: "must sum to a positive value".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
