//! Offline training: fits a predictor on a price history CSV and writes the
//! artifact pair the server loads at startup.
//!
//! Unset options fall back to the same environment configuration the server uses.

use anyhow::{Context, Result};
use clap::Parser;
use eurusd_forecaster::application::model_service::train_and_persist;
use eurusd_forecaster::config::ModelEnvConfig;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the price history CSV (time,eur_usd)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Path to the model configuration file; the model file is written next to it
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fixed epoch count. Derived from the row count when omitted.
    #[arg(long)]
    epochs: Option<usize>,

    #[arg(long)]
    batch_size: Option<usize>,

    /// Number of trailing prices per input window
    #[arg(long)]
    look_back: Option<usize>,

    /// Seed for weight init, dropout and shuffling
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let mut config = ModelEnvConfig::from_env().context("Failed to load model config")?;

    if let Some(input) = args.input {
        config.train_data_file = input;
    }
    if let Some(output) = args.output {
        config.model_file = output;
    }
    if let Some(epochs) = args.epochs {
        config.min_epochs = epochs;
        config.max_epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(look_back) = args.look_back {
        config.look_back = look_back;
    }
    if let Some(seed) = args.seed {
        config.network.seed = Some(seed);
    }
    config.validate()?;

    info!(
        "Training from {:?} (look_back={}, batch_size={})",
        config.train_data_file, config.look_back, config.batch_size
    );

    let (_, outcome) = train_and_persist(&config)
        .with_context(|| format!("Training from {:?} failed", config.train_data_file))?;

    info!(
        "Saved model to {:?}: {} rows, {} windows, {} epochs, final loss {:?}",
        config.model_file, outcome.rows, outcome.windows, outcome.epochs, outcome.final_loss
    );
    Ok(())
}
