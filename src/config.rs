//! Configuration management for the model builder
//!
//! This module provides configuration file support with TOML format,
//! environment variable override for the file location, and sensible
//! defaults for every field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Record source configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Source column naming
    #[serde(default)]
    pub columns: ColumnConfig,

    /// Output directory configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Aggregation tuning
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Logging configuration
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Record source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Host name or address of the upstream data source
    #[serde(default = "default_server")]
    pub server: String,

    /// Database name at the source
    #[serde(default = "default_database")]
    pub database: String,

    /// Table holding the raw tag records
    #[serde(default = "default_table")]
    pub table: String,

    /// User name for connection reporting
    #[serde(default = "default_user")]
    pub user: String,

    /// Rows fetched per page
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Source column naming
///
/// The upstream table uses underscore-prefixed column names; these are
/// carried through to the raw dump header and the pivot index column.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColumnConfig {
    /// Column holding the tag name
    #[serde(default = "default_tag_column")]
    pub tag: String,

    /// Column holding the record timestamp, used as the pivot row index
    #[serde(default = "default_index_column")]
    pub index: String,
}

/// Output directory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory for pivoted model CSVs; defaults under the home directory
    #[serde(default)]
    pub model_dir: Option<PathBuf>,

    /// Directory for raw query dump CSVs; defaults under the home directory
    #[serde(default)]
    pub query_dir: Option<PathBuf>,
}

/// Aggregation tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregationConfig {
    /// Maximum bucket workers running at once
    #[serde(default = "default_max_workers")]
    pub max_concurrent_workers: usize,

    /// Optional overall deadline for a run, in seconds (absent = no timeout)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_database() -> String {
    "runtime".to_string()
}

fn default_table() -> String {
    "tag_data".to_string()
}

fn default_user() -> String {
    "reader".to_string()
}

fn default_chunk_size() -> usize {
    100_000
}

fn default_tag_column() -> String {
    "_NAME".to_string()
}

fn default_index_column() -> String {
    "_TIMESTAMP".to_string()
}

fn default_max_workers() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            database: default_database(),
            table: default_table(),
            user: default_user(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            tag: default_tag_column(),
            index: default_index_column(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            query_dir: None,
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: default_max_workers(),
            timeout_secs: None,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            columns: ColumnConfig::default(),
            output: OutputConfig::default(),
            aggregation: AggregationConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&contents)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from the standard locations
    ///
    /// Checked in order:
    /// 1. `TAGPIVOT_CONFIG` environment variable (path to TOML file)
    /// 2. `./tagpivot.toml` in the current directory
    /// 3. Built-in defaults
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("TAGPIVOT_CONFIG") {
            return Self::from_file(path);
        }
        let local = Path::new("tagpivot.toml");
        if local.exists() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    /// Validate field constraints
    pub fn validate(&self) -> Result<()> {
        if self.source.chunk_size == 0 {
            return Err(Error::Configuration(
                "source.chunk_size must be positive".to_string(),
            ));
        }
        if self.aggregation.max_concurrent_workers == 0 {
            return Err(Error::Configuration(
                "aggregation.max_concurrent_workers must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.source.chunk_size, 100_000);
        assert_eq!(config.columns.index, "_TIMESTAMP");
        assert_eq!(config.columns.tag, "_NAME");
        assert!(config.aggregation.timeout_secs.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [source]
            table = "plant_tags"
            chunk_size = 5000

            [aggregation]
            max_concurrent_workers = 8
            timeout_secs = 300
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.source.table, "plant_tags");
        assert_eq!(config.source.chunk_size, 5000);
        assert_eq!(config.aggregation.max_concurrent_workers, 8);
        assert_eq!(config.aggregation.timeout_secs, Some(300));
        // Untouched sections fall back to defaults
        assert_eq!(config.columns.tag, "_NAME");
        assert_eq!(config.monitoring.log_level, "info");
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = Config::default();
        config.aggregation.max_concurrent_workers = 0;
        assert!(config.validate().is_err());
    }
}
