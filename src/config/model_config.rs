//! Model and training configuration parsing from environment variables.
//!
//! Covers artifact locations, windowing, the retrain epoch budget and the
//! network architecture.

use crate::application::ml::NetworkConfig;
use crate::domain::ml::ScalerFit;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Model environment configuration
#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    // Artifacts
    pub model_file: PathBuf,
    pub train_data_file: PathBuf,

    // Windowing
    pub look_back: usize,
    pub forecast_steps: usize,
    pub scaler_fit: ScalerFit,

    // Training budget
    pub batch_size: usize,
    pub min_training_rows: usize,
    pub min_epochs: usize,
    pub max_epochs: usize,

    pub network: NetworkConfig,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            model_file: PathBuf::from("models/forex_predictor.json"),
            train_data_file: PathBuf::from("euro_dollar_minute_variation.csv"),
            look_back: 30,
            forecast_steps: 1,
            scaler_fit: ScalerFit::FullSeries,
            batch_size: 8,
            min_training_rows: 60,
            min_epochs: 10,
            max_epochs: 50,
            network: NetworkConfig::default(),
        }
    }
}

impl ModelEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let network_defaults = NetworkConfig::default();

        let network = NetworkConfig {
            lstm_units: match lookup("LSTM_UNITS") {
                Some(raw) => parse_units(&raw).context("Failed to parse LSTM_UNITS")?,
                None => network_defaults.lstm_units,
            },
            dense_units: match lookup("DENSE_UNITS") {
                Some(raw) => parse_units(&raw).context("Failed to parse DENSE_UNITS")?,
                None => network_defaults.dense_units,
            },
            dropout: parse(&lookup, "DROPOUT", network_defaults.dropout)?,
            learning_rate: parse(&lookup, "LEARNING_RATE", network_defaults.learning_rate)?,
            gradient_clip: match lookup("GRADIENT_CLIP") {
                Some(raw) if raw.eq_ignore_ascii_case("none") => None,
                Some(raw) => Some(
                    raw.trim()
                        .parse::<f64>()
                        .context("Failed to parse GRADIENT_CLIP")?,
                ),
                None => network_defaults.gradient_clip,
            },
            seed: match lookup("MODEL_SEED") {
                Some(raw) => Some(raw.trim().parse::<u64>().context("Failed to parse MODEL_SEED")?),
                None => None,
            },
        };

        let config = Self {
            model_file: lookup("MODEL_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_file),
            train_data_file: lookup("TRAIN_DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.train_data_file),
            look_back: parse(&lookup, "LOOK_BACK", defaults.look_back)?,
            forecast_steps: parse(&lookup, "FORECAST_STEPS", defaults.forecast_steps)?,
            scaler_fit: parse(&lookup, "SCALER_FIT", defaults.scaler_fit)?,
            batch_size: parse(&lookup, "BATCH_SIZE", defaults.batch_size)?,
            min_training_rows: parse(&lookup, "MIN_TRAINING_ROWS", defaults.min_training_rows)?,
            min_epochs: parse(&lookup, "MIN_EPOCHS", defaults.min_epochs)?,
            max_epochs: parse(&lookup, "MAX_EPOCHS", defaults.max_epochs)?,
            network,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.look_back == 0 || self.forecast_steps == 0 {
            anyhow::bail!("LOOK_BACK and FORECAST_STEPS must be positive");
        }
        if self.batch_size == 0 {
            anyhow::bail!("BATCH_SIZE must be positive");
        }
        if self.min_epochs == 0 || self.min_epochs > self.max_epochs {
            anyhow::bail!(
                "Epoch bounds must satisfy 0 < MIN_EPOCHS <= MAX_EPOCHS, got {}..{}",
                self.min_epochs,
                self.max_epochs
            );
        }
        self.network
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid network config: {}", e))
    }

    /// Retrain epoch budget: one epoch per ten rows, clamped to the configured bounds.
    pub fn epochs_for(&self, rows: usize) -> usize {
        (rows / 10).clamp(self.min_epochs, self.max_epochs)
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", key, e)),
        None => Ok(default),
    }
}

fn parse_units(raw: &str) -> Result<Vec<usize>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().with_context(|| format!("Invalid layer size '{}'", s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<ModelEnvConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ModelEnvConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_model_config_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.look_back, 30);
        assert_eq!(config.forecast_steps, 1);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.min_training_rows, 60);
        assert_eq!(config.model_file, PathBuf::from("models/forex_predictor.json"));
        assert_eq!(config.scaler_fit, ScalerFit::FullSeries);
        assert_eq!(config.network.lstm_units, vec![50, 100]);
    }

    #[test]
    fn test_model_config_overrides() {
        let config = from_pairs(&[
            ("LOOK_BACK", "20"),
            ("SCALER_FIT", "inputs"),
            ("LSTM_UNITS", "16, 32"),
            ("DENSE_UNITS", ""),
            ("GRADIENT_CLIP", "none"),
            ("MODEL_SEED", "7"),
            ("TRAIN_DATA_FILE", "/data/eurusd.csv"),
        ])
        .unwrap();

        assert_eq!(config.look_back, 20);
        assert_eq!(config.scaler_fit, ScalerFit::InputsOnly);
        assert_eq!(config.network.lstm_units, vec![16, 32]);
        assert!(config.network.dense_units.is_empty());
        assert_eq!(config.network.gradient_clip, None);
        assert_eq!(config.network.seed, Some(7));
        assert_eq!(config.train_data_file, PathBuf::from("/data/eurusd.csv"));
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(from_pairs(&[("LOOK_BACK", "thirty")]).is_err());
        assert!(from_pairs(&[("LOOK_BACK", "0")]).is_err());
        assert!(from_pairs(&[("LSTM_UNITS", "50,x")]).is_err());
        assert!(from_pairs(&[("MIN_EPOCHS", "60")]).is_err());
        assert!(from_pairs(&[("DROPOUT", "1.5")]).is_err());
    }

    #[test]
    fn test_epochs_for_clamps_to_bounds() {
        let config = ModelEnvConfig::default();
        assert_eq!(config.epochs_for(60), 10);
        assert_eq!(config.epochs_for(99), 10);
        assert_eq!(config.epochs_for(250), 25);
        assert_eq!(config.epochs_for(500), 50);
        assert_eq!(config.epochs_for(100_000), 50);
    }
}
