//! Engine configuration
//!
//! Loaded from YAML or JSON; every field has a default so an empty file is
//! a valid configuration.

use crate::adapter::AdapterError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading configuration or declaration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Declaration(#[from] AdapterError),
}

impl ConfigError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Reserved method name returning the backing resource
    pub backing_resource_method: String,
    /// Character standing in for the namespace separator in method names
    pub namespace_placeholder: char,
    pub namespace_separator: char,
    /// Fall back to case-insensitive, separator-blind key matching for
    /// convention-derived keys
    pub lenient_keys: bool,
    /// Child name skipped by `exclude_content_node` filters
    pub content_node: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backing_resource_method: "getBackingResource".to_string(),
            namespace_placeholder: '_',
            namespace_separator: ':',
            lenient_keys: false,
            content_node: "jcr:content".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.backing_resource_method.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "backing_resource_method must not be empty".to_string(),
            ));
        }
        if self.namespace_placeholder == self.namespace_separator {
            return Err(ConfigError::Invalid(format!(
                "namespace_placeholder and namespace_separator are both '{}'",
                self.namespace_separator
            )));
        }
        if self.content_node.is_empty() || self.content_node.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "content_node must be a single path segment, got '{}'",
                self.content_node
            )));
        }
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }
}
