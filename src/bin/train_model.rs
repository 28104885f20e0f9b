//! Train (or load) the price model and persist it to the model directory.
//!
//! # Usage
//! ```sh
//! cargo run --bin train_model -- --force --export-csv data/ml/price_training.csv
//! ```
//!
//! # Environment Variables
//! - `PRICE_MODEL_DIR` - Model directory (default: data/ml/price_model)
//! - `PRICE_MODEL_SEED` - Training seed (default: 42)

use anyhow::{Result, bail};
use clap::Parser;
use fixit_pricing::application::ml::training::{self, TrainingConfig};
use fixit_pricing::application::ml::{ModelBackend, PriceModel};
use fixit_pricing::config::Config;
use fixit_pricing::domain::pricing::{FeatureVector, expected_price};
use fixit_pricing::infrastructure::persistence::ModelStore;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model directory (overrides PRICE_MODEL_DIR)
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Training seed (overrides PRICE_MODEL_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Retrain even if a persisted model exists
    #[arg(long)]
    force: bool,

    /// Also write the synthesized training set to this CSV file
    #[arg(long)]
    export_csv: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let model_dir = args.model_dir.unwrap_or(config.model_dir);
    let training = TrainingConfig {
        seed: args.seed.unwrap_or(config.training_seed),
        ..TrainingConfig::default()
    };

    if let Some(path) = &args.export_csv {
        let samples = training::synthesize_training_set(&training);
        training::export_csv(&samples, path)?;
        info!("Exported {} training samples to {:?}", samples.len(), path);
    }

    let backend = ModelBackend::new(ModelStore::new(&model_dir), training)
        .with_force_retrain(args.force || config.force_retrain);
    if !backend.initialize() {
        bail!("Price model could not be trained");
    }

    if let Some(metadata) = backend.metadata() {
        info!(
            "Model v{} trained {} on {} samples",
            metadata.version,
            metadata.training_date.to_rfc3339(),
            metadata
                .sample_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
        if let Some(fit) = metadata.fit {
            info!(
                "Fit: RMSE={:.2} MAE={:.2} R²={:.4}",
                fit.rmse, fit.mae, fit.r2
            );
        }
    }

    println!("\n{:>10} {:>10} {:>12} {:>10}", "distance", "base_rate", "rule_price", "model");
    for (distance, base_rate) in [(10.0, 1000.0), (50.0, 1500.0), (100.0, 400.0), (150.0, 5000.0)] {
        let model_price = backend.infer(&FeatureVector::new(vec![distance, base_rate]))?;
        println!(
            "{:>10.1} {:>10.0} {:>12.0} {:>10.0}",
            distance,
            base_rate,
            expected_price(distance, base_rate),
            model_price
        );
    }

    info!("Model stored in {:?}", backend.store().model_dir());
    Ok(())
}
