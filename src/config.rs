use crate::services::records::SlowBackendConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tree engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TreeConfig {
    /// Simulated data source latency
    #[serde(default)]
    pub fetch: FetchConfig,

    /// What "expand all" does with branches whose children are not loaded yet
    #[serde(default)]
    pub expand_all: ExpandAllMode,

    /// Window used to pick the rows handed to the renderer
    #[serde(default)]
    pub viewport: ViewportConfig,
}

/// Latency applied to every child lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FetchConfig {
    /// Minimum delay per lookup, in milliseconds
    #[serde(default)]
    pub latency_ms: u64,

    /// Upper bound of the extra per-node delay, in milliseconds
    #[serde(default)]
    pub jitter_ms: u64,
}

impl FetchConfig {
    pub fn is_instant(&self) -> bool {
        self.latency_ms == 0 && self.jitter_ms == 0
    }

    pub fn to_backend_config(&self) -> SlowBackendConfig {
        SlowBackendConfig {
            latency: Duration::from_millis(self.latency_ms),
            jitter: Duration::from_millis(self.jitter_ms),
            ..SlowBackendConfig::none()
        }
    }
}

/// Behavior of expand-all for unloaded branches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExpandAllMode {
    /// Expand what is already loaded; never fetch
    #[default]
    LoadedOnly,
    /// Also start one fetch for each expanded node whose children are missing
    FetchFrontier,
}

/// Row window configuration, in the renderer's units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViewportConfig {
    #[serde(default = "default_row_height")]
    pub row_height: u32,

    #[serde(default = "default_viewport_height")]
    pub height: u32,

    /// Extra rows materialized above and below the visible range
    #[serde(default = "default_overscan")]
    pub overscan: u32,
}

fn default_row_height() -> u32 {
    1
}

fn default_viewport_height() -> u32 {
    20
}

fn default_overscan() -> u32 {
    2
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            row_height: default_row_height(),
            height: default_viewport_height(),
            overscan: default_overscan(),
        }
    }
}

impl TreeConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: TreeConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.row_height == 0 {
            return Err(ConfigError::ValidationError(
                "viewport.row_height must be greater than 0".to_string(),
            ));
        }

        if self.viewport.height < self.viewport.row_height {
            return Err(ConfigError::ValidationError(
                "viewport.height must fit at least one row".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
