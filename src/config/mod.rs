//! Configuration management for the ingestion pipeline
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Document store configuration
    pub store: StoreConfig,

    /// Ingestion configuration
    pub ingest: IngestConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

/// Ingestion-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// How existing documents are merged on update
    pub merge_policy: MergePolicy,

    /// Emit a progress log line every N records
    pub progress_interval: usize,

    /// Attempts for an upsert that keeps hitting write conflicts
    pub max_write_attempts: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

/// Merge behavior when an establishment already exists
///
/// Overwrite matches the directory-site semantics (the scrape is the
/// authoritative current state); Append accumulates reviews and schedules
/// across scrapes instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    #[default]
    Overwrite,
    Append,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Append => "append",
        }
    }
}

impl FromStr for MergePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "append" => Ok(Self::Append),
            other => anyhow::bail!("unknown merge policy: {other:?} (overwrite|append)"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let sqlite_path = std::env::var("ANNUAIRE_SQLITE_PATH")
            .unwrap_or_else(|_| String::from("data/annuaire.db"))
            .into();

        let merge_policy = match std::env::var("ANNUAIRE_MERGE_POLICY") {
            Ok(v) => v.parse()?,
            Err(_) => MergePolicy::default(),
        };

        let progress_interval = std::env::var("ANNUAIRE_PROGRESS_INTERVAL")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(50);

        let max_write_attempts = std::env::var("ANNUAIRE_MAX_WRITE_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let level = std::env::var("ANNUAIRE_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let format = std::env::var("ANNUAIRE_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            store: StoreConfig { sqlite_path },
            ingest: IngestConfig {
                merge_policy,
                progress_interval,
                max_write_attempts,
            },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.ingest.progress_interval == 0 {
            anyhow::bail!("progress_interval must be greater than 0");
        }

        if self.ingest.max_write_attempts == 0 {
            anyhow::bail!("max_write_attempts must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                sqlite_path: PathBuf::from("data/annuaire.db"),
            },
            ingest: IngestConfig {
                merge_policy: MergePolicy::Overwrite,
                progress_interval: 50,
                max_write_attempts: 3,
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_progress_interval_invalid() {
        let mut config = Config::default();
        config.ingest.progress_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_write_attempts_invalid() {
        let mut config = Config::default();
        config.ingest.max_write_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_policy_parse() {
        assert_eq!(
            "overwrite".parse::<MergePolicy>().unwrap(),
            MergePolicy::Overwrite
        );
        assert_eq!(
            " Append ".parse::<MergePolicy>().unwrap(),
            MergePolicy::Append
        );
        assert!("replace".parse::<MergePolicy>().is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_overrides() {
        std::env::set_var("ANNUAIRE_MERGE_POLICY", "append");
        std::env::set_var("ANNUAIRE_PROGRESS_INTERVAL", "10");

        let config = Config::from_env().unwrap();
        assert_eq!(config.ingest.merge_policy, MergePolicy::Append);
        assert_eq!(config.ingest.progress_interval, 10);

        std::env::remove_var("ANNUAIRE_MERGE_POLICY");
        std::env::remove_var("ANNUAIRE_PROGRESS_INTERVAL");
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_defaults() {
        std::env::remove_var("ANNUAIRE_MERGE_POLICY");
        std::env::remove_var("ANNUAIRE_PROGRESS_INTERVAL");

        let config = Config::from_env().unwrap();
        assert_eq!(config.ingest.merge_policy, MergePolicy::Overwrite);
        assert_eq!(config.ingest.progress_interval, 50);
        assert_eq!(config.ingest.max_write_attempts, 3);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let restored: Config = toml::from_str(&toml).unwrap();
        assert_eq!(restored.ingest.merge_policy, MergePolicy::Overwrite);
        assert_eq!(restored.ingest.progress_interval, 50);
    }
}
