use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the forecasting model and its persistence
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Invalid predictor configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Predictor has not been trained")]
    NotTrained,

    #[error("Need at least {required} points for prediction, got {provided}")]
    NotEnoughData { required: usize, provided: usize },

    #[error("Not enough data to build training windows: need more than {required} points, got {provided}")]
    InsufficientData { required: usize, provided: usize },

    #[error("Invalid model input: {reason}")]
    InvalidInput { reason: String },

    #[error("Training failed: {reason}")]
    Training { reason: String },

    #[error("Failed to persist predictor at {path:?}: {reason}")]
    Persistence { path: PathBuf, reason: String },
}

impl PredictorError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        PredictorError::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PredictorError::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
