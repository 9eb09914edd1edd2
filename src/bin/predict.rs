use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use ndarray::Array2;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engagement_ml::config::Config;
use engagement_ml::ml::{EngagementClassifier, ENGAGEMENT_COLUMNS};

/// Label value of the engaged class
const POSITIVE_CLASS: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "engagement-predict")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predict engagement for a fixed feature row", long_about = None)]
struct Args {
    /// Persisted model path
    #[arg(short, long)]
    model: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.observability.log_level);

    let model_file = args.model.unwrap_or_else(|| config.paths.model_file.clone());
    let model = EngagementClassifier::load(&model_file)
        .with_context(|| format!("failed to load model from {}", model_file.display()))?;

    // Match training feature names exactly
    let columns: Vec<String> = ENGAGEMENT_COLUMNS.iter().map(|c| c.to_string()).collect();
    let row = Array2::from_shape_vec((1, 5), vec![1.0, 1.0, 1.0, 390.0, 700.0])?;

    let label = model.predict(&columns, &row)?[0];
    let proba = model.predict_proba(&columns, &row)?;

    let Some(positive_idx) = model.classes().iter().position(|&c| c == POSITIVE_CLASS) else {
        bail!("model has no engaged class; classes are {:?}", model.classes());
    };

    println!("Predicted engagement label: {}", label);
    println!("Engagement probability: {:.4}", proba[[0, positive_idx]]);

    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("engagement_ml={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
