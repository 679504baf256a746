//! Run configuration
//!
//! Layers, lowest precedence first: built-in defaults, an optional YAML file,
//! `DOSSIER_*` environment variables. The CLI applies its flags on top.

use crate::merge::ConfidencePolicy;
use crate::resolve::DEFAULT_CONFIDENCE;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_DATA_DIR: &str = "DOSSIER_DATA_DIR";
pub const ENV_DB: &str = "DOSSIER_DB";
pub const ENV_BATCH_SIZE: &str = "DOSSIER_BATCH_SIZE";
pub const ENV_PARSE_WORKERS: &str = "DOSSIER_PARSE_WORKERS";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelatorConfig {
    /// Root holding `targets/<name>/<tool>/...`
    pub data_dir: PathBuf,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Files per batch
    pub batch_size: usize,
    /// Concurrent parse tasks within a batch
    pub parse_workers: usize,
    /// Confidence for records that carry none
    pub default_confidence: f64,
    pub confidence_policy: ConfidencePolicy,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/opt/osint/data"),
            db_path: default_db_path(),
            batch_size: 1000,
            parse_workers: 4,
            default_confidence: DEFAULT_CONFIDENCE,
            confidence_policy: ConfidencePolicy::default(),
        }
    }
}

/// `<platform data dir>/dossier/dossier.db`
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"))
        .join("dossier")
        .join("dossier.db")
}

impl CorrelatorConfig {
    /// Defaults overlaid with the YAML file (if any) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_yaml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML; missing keys keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `DOSSIER_*` overrides read through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(db) = lookup(ENV_DB) {
            self.db_path = PathBuf::from(db);
        }
        if let Some(n) = lookup(ENV_BATCH_SIZE) {
            self.batch_size = parse_count(ENV_BATCH_SIZE, &n)?;
        }
        if let Some(n) = lookup(ENV_PARSE_WORKERS) {
            self.parse_workers = parse_count(ENV_PARSE_WORKERS, &n)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".to_string()));
        }
        if self.parse_workers == 0 {
            return Err(ConfigError::Invalid("parse_workers must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(ConfigError::Invalid(format!(
                "default_confidence must be within [0, 1], got {}",
                self.default_confidence
            )));
        }
        Ok(())
    }

    /// Directory holding one target's tool outputs
    pub fn target_dir(&self, target: &str) -> PathBuf {
        self.data_dir.join("targets").join(target)
    }
}

fn parse_count(key: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} must be a positive integer, got '{}'", key, raw)))
}
