use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance of a trained predictor, persisted with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMeta {
    pub trained_rows: usize,
    pub epochs: usize,
    pub final_loss: Option<f64>,
    pub trained_at: DateTime<Utc>,
}

impl TrainingMeta {
    /// Filename-safe stamp of `trained_at`, unique per training run
    pub fn run_stamp(&self) -> String {
        self.trained_at.format("%Y%m%dT%H%M%S%9f").to_string()
    }
}
