use std::collections::HashSet;
use std::fs;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::ingest;
use crate::ml::{
    EngagementClassifier, FeatureExtractor, FeatureSchema, RandomForestParams, TrainingDataset,
};
use crate::models::AnalyticsEvent;
use crate::storage::{LogStore, TrainingLedger};

/// Keys present remotely but not yet recorded in the ledger
pub fn select_new_keys(all_keys: &[String], processed: &HashSet<String>) -> Vec<String> {
    all_keys
        .iter()
        .filter(|key| !processed.contains(*key))
        .cloned()
        .collect()
}

/// Run one incremental training pass against the remote bucket.
///
/// Per-file fetch/decode failures are logged and skipped; the file is not
/// marked processed and will be retried next run. Everything else is fatal,
/// and the ledger is only written after a successful fit — a crash between
/// training and the ledger write reprocesses those files next run.
pub async fn run(config: &Config, store: &dyn LogStore) -> Result<()> {
    let paths = &config.paths;
    if let Some(parent) = paths.model_file.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Some(parent) = paths.ledger_file.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut ledger = TrainingLedger::load_or_default(&paths.ledger_file)?;
    let processed = ledger.processed_keys();
    info!("found {} already processed files", processed.len());

    let all_keys = store.list_log_objects().await?;
    let new_keys = select_new_keys(&all_keys, &processed);
    info!("found {} new files to process", new_keys.len());

    if new_keys.is_empty() {
        info!("no new data to train on, exiting");
        return Ok(());
    }

    let mut events: Vec<AnalyticsEvent> = Vec::new();
    for key in &new_keys {
        match fetch_events(store, key).await {
            Ok(mut file_events) => {
                info!("processed file {} ({} records)", key, file_events.len());
                events.append(&mut file_events);
                ledger.mark_processed(key);
            }
            Err(e) => {
                warn!("skipping corrupted or unreadable file {}: {}", key, e);
                continue;
            }
        }
    }

    if events.is_empty() {
        info!("no usable data found in new files, exiting");
        return Ok(());
    }

    let mut extractor = FeatureExtractor::new(FeatureSchema::Engagement);
    let new_data = extractor.fit_transform(&events)?;

    let (mut model, train_slice) = if paths.model_file.exists() {
        info!("loading existing model for incremental update");
        let mut model = EngagementClassifier::load(&paths.model_file)?;

        if paths.previous_data_file.exists() {
            // Retrain from scratch on the cached previous slice plus the
            // new one.
            let previous = TrainingDataset::load(&paths.previous_data_file)?;
            let combined = previous.concat(&new_data)?;
            info!(
                "training on combined dataset with {} records",
                combined.n_samples()
            );
            (model, combined)
        } else {
            // No cache: keep the existing trees and grow the ensemble on
            // the new slice only.
            model.set_warm_start(true);
            info!(
                "training with warm start on {} new records",
                new_data.n_samples()
            );
            (model, new_data.clone())
        }
    } else {
        info!("creating new model");
        let model = EngagementClassifier::new(RandomForestParams::from(&config.training));
        info!("training new model on {} records", new_data.n_samples());
        (model, new_data.clone())
    };

    let (train, test) =
        train_slice.train_test_split(config.training.test_size, config.training.seed);
    model.fit(&train)?;

    if test.n_samples() > 0 {
        let metrics = model.evaluate(&test)?;
        info!("held-out accuracy: {:.2}%", metrics.accuracy * 100.0);
    }

    model.save(&paths.model_file)?;

    // The cache keeps only the newest slice; it does not accumulate across
    // more than one generation.
    new_data.save(&paths.previous_data_file)?;

    ledger.record_training()?;
    ledger.save(&paths.ledger_file)?;

    info!(
        "engagement model (v{}) trained and saved",
        ledger.model_version
    );
    info!("total files processed: {}", ledger.processed_files.len());

    Ok(())
}

async fn fetch_events(store: &dyn LogStore, key: &str) -> Result<Vec<AnalyticsEvent>> {
    let bytes = store.fetch_object(key).await?;
    let text = ingest::decode_log_bytes(&bytes)?;
    Ok(ingest::parse_events_lenient(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_new_keys_filters_processed() {
        let all = vec![
            "logs/a.json.gz".to_string(),
            "logs/b.json.gz".to_string(),
            "logs/c.json.gz".to_string(),
        ];
        let processed: HashSet<String> = ["logs/b.json.gz".to_string()].into_iter().collect();

        let new_keys = select_new_keys(&all, &processed);
        assert_eq!(new_keys, vec!["logs/a.json.gz", "logs/c.json.gz"]);
    }

    #[test]
    fn test_select_new_keys_unchanged_set_is_empty() {
        let all = vec!["logs/a.json.gz".to_string()];
        let processed: HashSet<String> = all.iter().cloned().collect();

        assert!(select_new_keys(&all, &processed).is_empty());
    }
}
