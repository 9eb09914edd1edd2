/// Integration tests for the incremental trainer
///
/// These tests drive `pipeline::incremental::run` against an in-memory log
/// store and verify:
/// - Ledger bookkeeping (keys, version bumps, timestamps)
/// - Corrupted objects are skipped without poisoning the run
/// - An unchanged remote file set leaves the ledger untouched
/// - The previous-data merge and warm-start branches
mod common;

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tempfile::TempDir;

use engagement_ml::config::{Config, ObservabilityConfig, PathsConfig};
use engagement_ml::error::{AppError, Result};
use engagement_ml::ml::EngagementClassifier;
use engagement_ml::pipeline::incremental;
use engagement_ml::storage::{LogStore, TrainingLedger};

use common::{create_test_events, gzip_events, small_training_config};

struct InMemoryLogStore {
    objects: HashMap<String, Vec<u8>>,
}

impl InMemoryLogStore {
    fn new() -> Self {
        Self {
            objects: HashMap::new(),
        }
    }

    fn put(&mut self, key: &str, bytes: Vec<u8>) {
        self.objects.insert(key.to_string(), bytes);
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn list_log_objects(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.objects.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn fetch_object(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("object {}", key)))
    }
}

fn test_config(dir: &Path) -> Config {
    Config {
        paths: PathsConfig {
            data_file: dir.join("data").join("sample.json.gz"),
            model_file: dir.join("models").join("model.bin"),
            previous_data_file: dir.join("models").join("previous_data.bin"),
            ledger_file: dir.join("metadata").join("training_metadata.json"),
        },
        training: small_training_config(),
        observability: ObservabilityConfig::default(),
    }
}

fn store_with_valid_files() -> InMemoryLogStore {
    let mut store = InMemoryLogStore::new();
    store.put("logs/day1.json.gz", gzip_events(&create_test_events(20)));
    store.put("logs/day2.json.gz", gzip_events(&create_test_events(20)));
    store
}

#[tokio::test]
async fn test_first_run_trains_and_writes_ledger() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let store = store_with_valid_files();

    incremental::run(&config, &store).await.unwrap();

    assert!(config.paths.model_file.exists());
    assert!(config.paths.previous_data_file.exists());

    let ledger = TrainingLedger::load_or_default(&config.paths.ledger_file).unwrap();
    assert_eq!(ledger.processed_files.len(), 2);
    assert_eq!(ledger.model_version, "1.1");
    assert!(ledger.last_training.is_some());

    let model = EngagementClassifier::load(&config.paths.model_file).unwrap();
    assert_eq!(model.n_trees(), 10);
}

#[tokio::test]
async fn test_corrupted_file_is_skipped_and_not_recorded() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let mut store = store_with_valid_files();
    // Neither gzip nor UTF-8 decodable
    store.put("logs/broken.json.gz", vec![0xff, 0xfe, 0x9c, 0x00]);

    incremental::run(&config, &store).await.unwrap();

    let ledger = TrainingLedger::load_or_default(&config.paths.ledger_file).unwrap();
    let keys = ledger.processed_keys();

    assert_eq!(keys.len(), 2);
    assert!(keys.contains("logs/day1.json.gz"));
    assert!(keys.contains("logs/day2.json.gz"));
    assert!(!keys.contains("logs/broken.json.gz"));
    assert!(config.paths.model_file.exists());
}

#[tokio::test]
async fn test_unchanged_remote_set_leaves_ledger_untouched() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let store = store_with_valid_files();

    incremental::run(&config, &store).await.unwrap();
    let before = std::fs::read_to_string(&config.paths.ledger_file).unwrap();

    incremental::run(&config, &store).await.unwrap();
    let after = std::fs::read_to_string(&config.paths.ledger_file).unwrap();

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_second_run_merges_previous_data_cache() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let mut store = store_with_valid_files();

    incremental::run(&config, &store).await.unwrap();

    store.put("logs/day3.json.gz", gzip_events(&create_test_events(20)));
    incremental::run(&config, &store).await.unwrap();

    let ledger = TrainingLedger::load_or_default(&config.paths.ledger_file).unwrap();
    assert_eq!(ledger.processed_files.len(), 3);
    assert_eq!(ledger.model_version, "1.2");

    // The combined retrain rebuilds the forest from scratch
    let model = EngagementClassifier::load(&config.paths.model_file).unwrap();
    assert_eq!(model.n_trees(), 10);
}

#[tokio::test]
async fn test_missing_cache_takes_the_warm_start_path() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let mut store = store_with_valid_files();

    incremental::run(&config, &store).await.unwrap();

    // Drop the cache so the next run cannot merge and must grow the forest
    std::fs::remove_file(&config.paths.previous_data_file).unwrap();

    store.put("logs/day3.json.gz", gzip_events(&create_test_events(20)));
    incremental::run(&config, &store).await.unwrap();

    let model = EngagementClassifier::load(&config.paths.model_file).unwrap();
    assert_eq!(model.n_trees(), 20);

    // The cache is rebuilt from the newest slice only
    assert!(config.paths.previous_data_file.exists());
}
