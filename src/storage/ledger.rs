use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Initial ledger version
const INITIAL_VERSION: &str = "1.0";

/// Version increment per completed training run
const VERSION_STEP: f64 = 0.1;

/// One remote log file already folded into the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFile {
    /// Object key in the bucket
    pub key: String,

    /// When the file was ingested, ISO 8601
    pub processed_date: String,
}

/// JSON ledger coordinating repeated incremental training runs.
///
/// Read at the start of each run and overwritten at the end. Nothing guards
/// against two runs executing concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingLedger {
    /// Remote files already folded into the model
    pub processed_files: Vec<ProcessedFile>,

    /// Decimal version string, bumped on every completed run
    pub model_version: String,

    /// When the model was last trained, ISO 8601
    pub last_training: Option<String>,
}

impl Default for TrainingLedger {
    fn default() -> Self {
        Self {
            processed_files: Vec::new(),
            model_version: INITIAL_VERSION.to_string(),
            last_training: None,
        }
    }
}

impl TrainingLedger {
    /// Load the ledger, or start a fresh one when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            AppError::Serialization(format!("ledger {}: {}", path.display(), e))
        })
    }

    /// Overwrite the ledger file, creating its parent directory
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Keys of every file already folded into the model
    pub fn processed_keys(&self) -> HashSet<String> {
        self.processed_files
            .iter()
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Record a file as ingested in this run
    pub fn mark_processed(&mut self, key: &str) {
        self.processed_files.push(ProcessedFile {
            key: key.to_string(),
            processed_date: Utc::now().to_rfc3339(),
        });
    }

    /// Stamp a completed training run and bump the version by 0.1
    pub fn record_training(&mut self) -> Result<()> {
        let version: f64 = self.model_version.parse().map_err(|_| {
            AppError::Validation(format!(
                "model_version '{}' is not a decimal string",
                self.model_version
            ))
        })?;

        self.model_version = format!("{:.1}", version + VERSION_STEP);
        self.last_training = Some(Utc::now().to_rfc3339());
        Ok(())
    }
}
