//! Configuration loading and management

use crate::core::error::{ConfigError, ScaffoldResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default pattern for date-and-time values
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default pattern for date-only values
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default pattern for time-only values
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// chrono format strings applied by the value normalizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub datetime: String,
    pub date: String,
    pub time: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            datetime: DATETIME_FORMAT.to_string(),
            date: DATE_FORMAT.to_string(),
            time: TIME_FORMAT.to_string(),
        }
    }
}

/// Paging limits enforced by the data-access engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Upper bound applied to any requested page size. `None` leaves the
    /// caller's page size untouched.
    pub max_page_size: Option<usize>,
}

impl PaginationConfig {
    /// Apply the configured cap to a requested page size
    pub fn page_size(&self, requested: usize) -> usize {
        match self.max_page_size {
            Some(max) => requested.min(max),
            None => requested,
        }
    }
}

/// Complete configuration for the scaffold layer
///
/// # Example
///
/// ```yaml
/// formats:
///   datetime: "%Y-%m-%dT%H:%M:%S"
/// pagination:
///   max_page_size: 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldConfig {
    pub formats: FormatConfig,
    pub pagination: PaginationConfig,
}

impl ScaffoldConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ScaffoldResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> ScaffoldResult<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(ConfigError::from)?;
        Ok(config)
    }
}
