//! Driver configuration.
//!
//! A [`DriverConfig`] tunes how a [`crate::engine::Normalizer`] runs; rule
//! content lives in [`crate::rules::RuleTable`]. Both load from YAML or JSON.

use crate::position::PositionFill;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default bound on tree nesting.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// What to do when a node-local error (e.g. a malformed literal) occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Leave the node untransformed, record the error and continue.
    #[default]
    Isolate,
    /// Stop the transformation at the first error.
    Abort,
}

/// Options of one normalizer instance.
///
/// # Examples
///
/// ```rust
/// use arbor::config::{DriverConfig, ErrorPolicy};
/// let config = DriverConfig::from_yaml_str("error-policy: abort\nmax-depth: 64\n").unwrap();
/// assert_eq!(config.error_policy, ErrorPolicy::Abort);
/// assert_eq!(config.max_depth, 64);
/// assert!(config.mark_unannotated);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DriverConfig {
    /// How positions are completed when source text is supplied.
    pub position_fill: PositionFill,
    pub error_policy: ErrorPolicy,
    /// Tag nodes that received no role with `Unannotated`.
    pub mark_unannotated: bool,
    pub max_depth: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            position_fill: PositionFill::default(),
            error_policy: ErrorPolicy::default(),
            mark_unannotated: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Errors raised while loading configuration or rule tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl DriverConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads a configuration file; `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let (text, is_json) = read_config_file(path.as_ref())?;
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }
}

/// Reads a file and reports whether it has a `.json` extension.
pub(crate) fn read_config_file(path: &Path) -> Result<(String, bool), ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    Ok((text, is_json))
}
