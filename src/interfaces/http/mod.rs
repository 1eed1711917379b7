//! JSON HTTP API over the model service.

pub mod dto;
pub mod error;
pub mod handlers;

use crate::application::model_service::ModelService;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ModelService>,
}

impl AppState {
    pub fn new(service: Arc<ModelService>) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState, cors_enabled: bool) -> Router {
    let router = Router::new()
        .route("/api/euro-dollar", get(handlers::euro_dollar))
        .route("/api/predict-next", post(handlers::predict_next))
        .route("/api/retrain", post(handlers::retrain))
        .route("/api/model-status", get(handlers::model_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
