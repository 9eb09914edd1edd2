use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engagement_ml::config::Config;
use engagement_ml::pipeline::batch;

#[derive(Parser, Debug)]
#[command(name = "engagement-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the engagement model from a local event log", long_about = None)]
struct Args {
    /// Input gzip-compressed NDJSON event log
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Output model path
    #[arg(short, long)]
    model: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.observability.log_level);

    let data_file = args.data.unwrap_or_else(|| config.paths.data_file.clone());
    let model_file = args.model.unwrap_or_else(|| config.paths.model_file.clone());

    batch::run(&data_file, &model_file, &config.training)?;
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
