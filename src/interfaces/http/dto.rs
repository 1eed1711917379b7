use crate::domain::market::PricePoint;
use crate::domain::ml::ScalerFit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/predict-next`. A missing `prices` key reads as empty.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub prices: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct PriceHistoryResponse {
    pub success: bool,
    pub data: Vec<PricePoint>,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: f64,
    /// Local wall-clock `HH:MM` one minute after the request
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct RetrainResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ModelStatusResponse {
    pub success: bool,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub look_back: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_steps: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaler_fit: Option<ScalerFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epochs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
