use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Severity of a condition raised by a template through `strict()`,
/// `notice()`, `deprecated()` or `warn()`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Strict,
    Notice,
    Deprecated,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Strict => "strict",
            Severity::Notice => "notice",
            Severity::Deprecated => "deprecated",
            Severity::Warning => "warning",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    /// Conditions at or above this severity abort the render. The default
    /// only lets `strict` and `notice` through.
    #[serde(default = "default_escalate_at")]
    pub escalate_at: Severity,

    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,

    #[serde(default = "default_max_capture_depth")]
    pub max_capture_depth: usize,

    /// Variables assigned to every engine built from this config.
    #[serde(default)]
    pub globals: HashMap<String, serde_json::Value>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_dir: None,
            escalate_at: default_escalate_at(),
            max_nesting: default_max_nesting(),
            max_capture_depth: default_max_capture_depth(),
            globals: HashMap::new(),
        }
    }
}

fn default_escalate_at() -> Severity {
    Severity::Deprecated
}

fn default_max_nesting() -> usize {
    16
}

fn default_max_capture_depth() -> usize {
    64
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
