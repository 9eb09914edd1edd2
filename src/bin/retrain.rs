use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engagement_ml::config::{Config, ObjectStoreConfig};
use engagement_ml::pipeline::incremental;
use engagement_ml::storage::ObjectStore;

#[derive(Parser, Debug)]
#[command(name = "engagement-retrain")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Fetch new event logs from the remote bucket and retrain",
    long_about = None
)]
struct Args {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _args = Args::parse();

    // Credentials may live in a local .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.observability.log_level);

    let store_config =
        ObjectStoreConfig::from_env().context("object store credentials are incomplete")?;
    let store = ObjectStore::connect(&store_config);

    incremental::run(&config, &store).await?;
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
