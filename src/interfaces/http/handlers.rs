use super::AppState;
use super::dto::{
    ModelStatusResponse, PredictRequest, PredictionResponse, PriceHistoryResponse,
    RetrainResponse,
};
use super::error::ApiError;
use crate::domain::ports::SequenceModel;
use crate::infrastructure::read_price_history;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, Local, TimeDelta, TimeZone};
use std::fmt::Display;
use tracing::{error, warn};

/// `GET /api/euro-dollar`
pub async fn euro_dollar(
    State(state): State<AppState>,
) -> Result<Json<PriceHistoryResponse>, ApiError> {
    let path = state.service.config().train_data_file.clone();
    let points = tokio::task::spawn_blocking(move || read_price_history(path))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            error!("Failed to read price history: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(Json(PriceHistoryResponse {
        success: true,
        data: points,
    }))
}

/// `POST /api/predict-next`
pub async fn predict_next(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let predictor = state
        .service
        .ensure_ready()
        .await
        .ok_or(ApiError::ModelUnavailable)?;

    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected prediction request: {}", rejection.body_text());
        ApiError::BadRequest(rejection.body_text())
    })?;

    if request.prices.len() < predictor.look_back() {
        return Err(ApiError::BadRequest(format!(
            "Not enough data points. At least {} required.",
            predictor.look_back()
        )));
    }

    let prediction = predictor
        .predict_next(&request.prices)
        .map_err(|e| {
            error!("Prediction failed: {}", e);
            ApiError::Internal(format!("Prediction failed: {}", e))
        })?
        .first()
        .copied()
        .ok_or_else(|| ApiError::Internal("Prediction failed: empty output".to_string()))?;

    Ok(Json(PredictionResponse {
        success: true,
        prediction,
        timestamp: next_minute_label(Local::now()),
    }))
}

/// `POST /api/retrain`
pub async fn retrain(State(state): State<AppState>) -> Result<Json<RetrainResponse>, ApiError> {
    let outcome = state.service.retrain().await.map_err(|e| {
        error!("Retrain failed: {}", e);
        ApiError::Internal(format!("Model training failed: {}", e))
    })?;

    Ok(Json(RetrainResponse {
        success: true,
        message: format!(
            "Model retrained successfully on {} rows ({} epochs).",
            outcome.rows, outcome.epochs
        ),
    }))
}

/// `GET /api/model-status`
pub async fn model_status(State(state): State<AppState>) -> Json<ModelStatusResponse> {
    let Some(predictor) = state.service.current().await else {
        return Json(ModelStatusResponse {
            success: true,
            ..ModelStatusResponse::default()
        });
    };

    let network = predictor.model();
    let units: Vec<String> = network
        .config()
        .lstm_units
        .iter()
        .map(|u| u.to_string())
        .collect();

    let training = predictor.training();
    Json(ModelStatusResponse {
        success: true,
        loaded: true,
        model: Some(format!("{} ({})", network.name(), units.join("-"))),
        look_back: Some(predictor.look_back()),
        forecast_steps: Some(predictor.forecast_steps()),
        scaler_fit: Some(predictor.scaler_fit()),
        trained_rows: training.map(|t| t.trained_rows),
        epochs: training.map(|t| t.epochs),
        final_loss: training.and_then(|t| t.final_loss),
        trained_at: training.map(|t| t.trained_at),
    })
}

/// `HH:MM` one minute after `now`, in `now`'s own timezone
pub fn next_minute_label<Tz>(now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    (now + TimeDelta::minutes(1)).format("%H:%M").to_string()
}
