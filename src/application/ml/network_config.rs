use crate::domain::errors::PredictorError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Architecture and optimiser settings for [`LstmNetwork`](super::lstm::LstmNetwork).
///
/// The default mirrors the production model: two stacked LSTM layers (50 then
/// 100 units) with 20% dropout after each, a 25-unit dense layer, and Adam at
/// a 0.001 learning rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Units per LSTM layer; all but the last feed full sequences upward
    pub lstm_units: Vec<usize>,
    /// Hidden dense layers between the last LSTM state and the output
    pub dense_units: Vec<usize>,
    /// Dropout rate applied to every LSTM layer output during training
    pub dropout: f64,
    pub learning_rate: f64,
    /// Global gradient-norm clip
    pub gradient_clip: Option<f64>,
    /// Fixed seed for weight init, dropout masks and shuffling
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            lstm_units: vec![50, 100],
            dense_units: vec![25],
            dropout: 0.2,
            learning_rate: 0.001,
            gradient_clip: Some(1.0),
            seed: None,
        }
    }
}

impl NetworkConfig {
    pub fn with_lstm_units(mut self, units: Vec<usize>) -> Self {
        self.lstm_units = units;
        self
    }

    pub fn with_dense_units(mut self, units: Vec<usize>) -> Self {
        self.dense_units = units;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_gradient_clip(mut self, clip: Option<f64>) -> Self {
        self.gradient_clip = clip;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), PredictorError> {
        if self.lstm_units.is_empty() {
            return Err(PredictorError::invalid_config(
                "at least one LSTM layer is required",
            ));
        }
        if self.lstm_units.iter().chain(&self.dense_units).any(|&u| u == 0) {
            return Err(PredictorError::invalid_config(
                "layer sizes must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(PredictorError::invalid_config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(PredictorError::invalid_config(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if let Some(clip) = self.gradient_clip {
            if clip.is_nan() || clip <= 0.0 {
                return Err(PredictorError::invalid_config(format!(
                    "gradient clip must be positive, got {}",
                    clip
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
