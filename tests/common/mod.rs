#![allow(dead_code)]

use eurusd_forecaster::application::ml::NetworkConfig;
use eurusd_forecaster::config::ModelEnvConfig;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const LOOK_BACK: usize = 5;

/// Small seeded network so tests train in milliseconds
pub fn small_network() -> NetworkConfig {
    NetworkConfig::default()
        .with_lstm_units(vec![4, 4])
        .with_dense_units(vec![3])
        .with_seed(42)
}

pub fn model_config(dir: &Path) -> ModelEnvConfig {
    ModelEnvConfig {
        model_file: dir.join("models/forex_predictor.json"),
        train_data_file: dir.join("euro_dollar_minute_variation.csv"),
        look_back: LOOK_BACK,
        min_epochs: 1,
        max_epochs: 2,
        network: small_network(),
        ..ModelEnvConfig::default()
    }
}

pub fn wave(rows: usize) -> Vec<f64> {
    (0..rows)
        .map(|i| 1.0850 + (i as f64 * 0.2).sin() * 0.0015)
        .collect()
}

pub fn write_price_csv(path: &Path, prices: &[f64]) {
    let mut csv = String::from("time,eur_usd\n");
    for (i, price) in prices.iter().enumerate() {
        writeln!(csv, "{:02}:{:02},{}", (9 + i / 60) % 24, i % 60, price).unwrap();
    }
    fs::write(path, csv).unwrap();
}
