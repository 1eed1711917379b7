use crate::application::ml::{ForexPredictor, LstmNetwork};
use crate::config::ModelEnvConfig;
use crate::domain::errors::PredictorError;
use crate::domain::market::closing_prices;
use crate::infrastructure::{PriceDataError, read_price_history};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ModelServiceError {
    #[error("Not enough training data: {found} rows, at least {required} required")]
    InsufficientRows { required: usize, found: usize },

    #[error(transparent)]
    PriceData(#[from] PriceDataError),

    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error("Training task failed: {0}")]
    TaskFailed(String),
}

/// Summary of a completed training run
#[derive(Debug, Clone, PartialEq)]
pub struct RetrainOutcome {
    pub rows: usize,
    pub windows: usize,
    pub epochs: usize,
    pub final_loss: Option<f64>,
}

/// Owns the single live predictor and its lifecycle.
///
/// Readers take an `Arc` snapshot of the slot and predict without holding any
/// lock. Loading and training run as detached tasks serialised by
/// `training_lock`: each one trains, saves and swaps in its predictor before
/// releasing the lock, whether or not the caller is still waiting.
pub struct ModelService {
    inner: Arc<ServiceState>,
}

struct ServiceState {
    config: ModelEnvConfig,
    slot: RwLock<Option<Arc<ForexPredictor>>>,
    training_lock: Mutex<()>,
}

impl ModelService {
    pub fn new(config: ModelEnvConfig) -> Self {
        Self {
            inner: Arc::new(ServiceState {
                config,
                slot: RwLock::new(None),
                training_lock: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &ModelEnvConfig {
        &self.inner.config
    }

    /// Current predictor snapshot, if one is loaded
    pub async fn current(&self) -> Option<Arc<ForexPredictor>> {
        self.inner.slot.read().await.clone()
    }

    /// Loads the persisted predictor, or trains a new one when there is none
    /// (or it cannot be read). Returns whether a predictor is now available.
    pub async fn initialize(&self) -> bool {
        let state = self.inner.clone();
        match tokio::spawn(async move { state.initialize().await }).await {
            Ok(ready) => ready,
            Err(e) => {
                error!("Model initialization task failed: {}", e);
                false
            }
        }
    }

    /// Returns the live predictor, attempting initialization first if the slot is empty.
    pub async fn ensure_ready(&self) -> Option<Arc<ForexPredictor>> {
        if let Some(predictor) = self.current().await {
            return Some(predictor);
        }
        if !self.initialize().await {
            return None;
        }
        self.current().await
    }

    /// Retrains from the training data file and swaps the result in.
    ///
    /// On any failure the live predictor and the saved artifacts are left as
    /// they were. Dropping the returned future does not cancel the run.
    pub async fn retrain(&self) -> Result<RetrainOutcome, ModelServiceError> {
        let state = self.inner.clone();
        tokio::spawn(async move { state.retrain().await })
            .await
            .map_err(|e| ModelServiceError::TaskFailed(e.to_string()))?
    }

    /// Waits for an in-flight training run to finish.
    pub async fn shutdown(&self) {
        let _guard = self.inner.training_lock.lock().await;
        info!("Model service stopped");
    }
}

impl ServiceState {
    async fn initialize(&self) -> bool {
        let _guard = self.training_lock.lock().await;
        if self.slot.read().await.is_some() {
            return true;
        }

        let model_file = self.config.model_file.clone();
        if model_file.exists() {
            let path = model_file.clone();
            let loaded =
                tokio::task::spawn_blocking(move || ForexPredictor::<LstmNetwork>::load(path))
                    .await;
            match loaded {
                Ok(Ok(predictor)) => {
                    *self.slot.write().await = Some(Arc::new(predictor));
                    return true;
                }
                Ok(Err(e)) => warn!("Failed to load model from {:?}: {}", model_file, e),
                Err(e) => warn!("Model load task failed: {}", e),
            }
        } else {
            info!("No saved model at {:?}, training a new one", model_file);
        }

        match self.train_and_swap().await {
            Ok(outcome) => {
                info!(
                    "Initial training complete: {} rows, {} epochs",
                    outcome.rows, outcome.epochs
                );
                true
            }
            Err(e) => {
                error!("Error initializing model: {}", e);
                false
            }
        }
    }

    async fn retrain(&self) -> Result<RetrainOutcome, ModelServiceError> {
        let _guard = self.training_lock.lock().await;
        self.train_and_swap().await
    }

    /// Caller holds `training_lock`.
    async fn train_and_swap(&self) -> Result<RetrainOutcome, ModelServiceError> {
        let config = self.config.clone();
        let (predictor, outcome) =
            tokio::task::spawn_blocking(move || train_and_persist(&config))
                .await
                .map_err(|e| ModelServiceError::TaskFailed(e.to_string()))??;

        *self.slot.write().await = Some(Arc::new(predictor));
        Ok(outcome)
    }
}

/// Reads the training file, trains a fresh predictor and saves it.
///
/// Blocking; the saved artifacts only change if training and saving both succeed.
pub fn train_and_persist(
    config: &ModelEnvConfig,
) -> Result<(ForexPredictor, RetrainOutcome), ModelServiceError> {
    let points = read_price_history(&config.train_data_file)?;
    if points.len() < config.min_training_rows {
        return Err(ModelServiceError::InsufficientRows {
            required: config.min_training_rows,
            found: points.len(),
        });
    }

    let prices = closing_prices(&points);
    let epochs = config.epochs_for(prices.len());

    let mut predictor = ForexPredictor::with_network(
        config.look_back,
        config.forecast_steps,
        config.network.clone(),
    )?
    .with_scaler_fit(config.scaler_fit);

    let report = predictor.train(&prices, epochs, config.batch_size)?;
    predictor.save(&config.model_file)?;

    let outcome = RetrainOutcome {
        rows: prices.len(),
        windows: report.windows,
        epochs,
        final_loss: report.final_loss(),
    };
    info!(
        "Model trained on {} rows ({} windows, {} epochs, final loss {:?})",
        outcome.rows, outcome.windows, outcome.epochs, outcome.final_loss
    );
    Ok((predictor, outcome))
}
