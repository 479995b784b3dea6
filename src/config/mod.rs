//! Configuration loading and management

use crate::core::date_format::DateFormat;
use crate::core::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// MongoDB connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    /// Connection string (e.g., "mongodb://localhost:27017")
    pub uri: String,

    /// Default database; repositories and stores use it unless told otherwise
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "app".to_string(),
        }
    }
}

/// Limits applied to offset pagination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Limit used when a request does not give one
    pub default_limit: u64,

    /// Upper bound for requested limits
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

/// Defaults of the date range constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRangeConfig {
    /// Bound format, in format letters (e.g., "Y-m-d")
    pub format: DateFormat,

    /// Whether `from == to` is accepted
    pub allow_equal: bool,
}

impl Default for DateRangeConfig {
    fn default() -> Self {
        Self {
            format: DateFormat::default(),
            allow_equal: true,
        }
    }
}

/// Complete toolkit configuration
///
/// ```yaml
/// mongodb:
///   uri: mongodb://localhost:27017
///   database: shop
/// pagination:
///   default_limit: 20
///   max_limit: 100
/// date_range:
///   format: Y-m-d
///   allow_equal: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdmConfig {
    #[serde(default)]
    pub mongodb: MongoConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub date_range: DateRangeConfig,
}

impl OdmConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.to_string(),
            },
            _ => ConfigError::IoError {
                message: format!("Failed to read config file '{}': {}", path, e),
            },
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pagination.default_limit".to_string(),
                value: "0".to_string(),
                message: "must be positive".to_string(),
            });
        }

        if self.pagination.max_limit < self.pagination.default_limit {
            return Err(ConfigError::InvalidValue {
                field: "pagination.max_limit".to_string(),
                value: self.pagination.max_limit.to_string(),
                message: format!(
                    "must not be lower than default_limit ({})",
                    self.pagination.default_limit
                ),
            });
        }

        if self.mongodb.database.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "mongodb.database".to_string(),
                value: String::new(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
