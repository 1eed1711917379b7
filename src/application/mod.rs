// Forecasting model: scaling, windowing, network, persistence
pub mod ml;

// Predictor lifecycle: load-or-train, retrain, snapshot swap
pub mod model_service;
