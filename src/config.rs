use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Filesystem layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Training hyperparameters
    #[serde(default)]
    pub training: TrainingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from embedded defaults, file and environment
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: ENGAGEMENT_)
            .add_source(
                config::Environment::with_prefix("ENGAGEMENT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

/// Paths of the files the trainers and predictor read and write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Local gzip-compressed NDJSON event log (batch trainer input)
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Persisted model
    #[serde(default = "default_model_file")]
    pub model_file: PathBuf,

    /// Previous-data cache used by the incremental trainer
    #[serde(default = "default_previous_data_file")]
    pub previous_data_file: PathBuf,

    /// JSON ledger of processed remote files
    #[serde(default = "default_ledger_file")]
    pub ledger_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            model_file: default_model_file(),
            previous_data_file: default_previous_data_file(),
            ledger_file: default_ledger_file(),
        }
    }
}

/// Random forest training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of trees per fit
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    /// Maximum tree depth, unlimited when absent
    pub max_depth: Option<u16>,

    /// Minimum samples per leaf
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    /// Held-out fraction for the train/test split
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Seed for shuffling and bootstrap resampling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: None,
            min_samples_leaf: default_min_samples_leaf(),
            test_size: default_test_size(),
            seed: default_seed(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Credentials and location of the S3-compatible log bucket.
///
/// Supplied exclusively through the environment; the retrain binary loads a
/// `.env` file first when one is present.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: String,
    pub bucket: String,
    pub prefix: String,
}

impl ObjectStoreConfig {
    /// Read the `R2_*` environment variables, failing on any missing one
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            access_key: required_env("R2_ACCESS_KEY")?,
            secret_key: required_env("R2_SECRET_KEY")?,
            endpoint: required_env("R2_ENDPOINT")?,
            bucket: required_env("R2_BUCKET")?,
            prefix: required_env("R2_PREFIX")?,
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| AppError::Configuration(format!("missing environment variable {}", name)))
}

// Default value functions
fn default_data_file() -> PathBuf {
    PathBuf::from("data/sample.json.gz")
}

fn default_model_file() -> PathBuf {
    PathBuf::from("models/model.bin")
}

fn default_previous_data_file() -> PathBuf {
    PathBuf::from("models/previous_data.bin")
}

fn default_ledger_file() -> PathBuf {
    PathBuf::from("metadata/training_metadata.json")
}

fn default_n_estimators() -> usize {
    100
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_test_size() -> f64 {
    0.3
}

fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_string()
}
