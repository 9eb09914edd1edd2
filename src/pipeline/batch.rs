use std::path::Path;

use tracing::info;

use crate::config::TrainingConfig;
use crate::error::Result;
use crate::ingest;
use crate::ml::{EngagementClassifier, FeatureExtractor, FeatureSchema, RandomForestParams};

/// Train a model from a local gzip-compressed event log and persist it.
///
/// Any malformed line, derivation failure or fit failure aborts the run; no
/// retry, no partial save.
pub fn run(data_file: &Path, model_file: &Path, training: &TrainingConfig) -> Result<()> {
    info!("loading events from {}", data_file.display());
    let events = ingest::read_gzip_events(data_file)?;
    info!("loaded {} events", events.len());

    let mut extractor = FeatureExtractor::new(FeatureSchema::Batch);
    let dataset = extractor.fit_transform(&events)?;

    let (train, test) = dataset.train_test_split(training.test_size, training.seed);
    info!(
        "training on {} records, holding out {}",
        train.n_samples(),
        test.n_samples()
    );

    let mut model = EngagementClassifier::new(RandomForestParams::from(training));
    model.fit(&train)?;

    if test.n_samples() > 0 {
        let metrics = model.evaluate(&test)?;
        info!(
            "held-out accuracy: {:.2}%, f1: {:.3}",
            metrics.accuracy * 100.0,
            metrics.f1_score
        );
    }

    model.save(model_file)?;
    info!("model trained and saved to {}", model_file.display());

    Ok(())
}
