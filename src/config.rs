//! Engine configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::functions::FunctionRegistry;
use crate::parser::{ParserOptions, DEFAULT_MAX_DEPTH};
use crate::value::Version;

/// Largest accepted nesting limit.
pub const MAX_DEPTH_LIMIT: usize = 64;

/// Errors loading or validating an [`EngineConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("max_depth must be between 1 and 64, got {0}")]
    InvalidDepth(usize),

    #[error("feature_wave must be a version such as \"17.4\", got \"{0}\"")]
    InvalidFeatureWave(String),
}

/// How conditions are parsed and which functions they may call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// What conditions may reference (`allow_all` or `allow_properties`)
    pub options: ParserOptions,

    /// Nesting limit of parentheses, `!` and function arguments
    pub max_depth: usize,

    /// Enables `AreFeaturesEnabled` for waves up to this version
    pub feature_wave: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            options: ParserOptions::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            feature_wave: None,
        }
    }
}

impl EngineConfig {

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_DEPTH_LIMIT).contains(&self.max_depth) {
            return Err(ConfigError::InvalidDepth(self.max_depth));
        }
        self.feature_wave()?;
        Ok(())
    }

    pub fn feature_wave(&self) -> Result<Option<Version>, ConfigError> {
        match &self.feature_wave {
            Some(wave) => Version::parse(wave).map(Some).ok_or_else(|| ConfigError::InvalidFeatureWave(wave.clone())),
            None => Ok(None),
        }
    }

    /// Built-in functions, plus the feature gate when a wave is configured.
    pub fn functions(&self) -> Result<FunctionRegistry, ConfigError> {
        let registry = FunctionRegistry::builtins();
        Ok(match self.feature_wave()? {
            Some(wave) => registry.with_feature_wave(wave),
            None => registry,
        })
    }
}
