use super::lstm::LstmNetwork;
use super::network_config::NetworkConfig;
use crate::domain::errors::PredictorError;
use crate::domain::ml::{MinMaxScaler, ScalerFit, TrainingMeta};
use crate::domain::ports::SequenceModel;
use crate::infrastructure::model_store::{self, PredictorManifest};
use chrono::Utc;
use ndarray::{Array1, Array2};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

/// Supervised windows cut from a scaled series.
///
/// Row `i` of `inputs` is `scaled[i..i + look_back]`; row `i` of `targets`
/// is the `forecast_steps` values that follow it.
#[derive(Debug, Clone)]
pub struct Windows {
    pub inputs: Array2<f64>,
    pub targets: Array2<f64>,
}

impl Windows {
    fn empty(look_back: usize, forecast_steps: usize) -> Self {
        Self {
            inputs: Array2::zeros((0, look_back)),
            targets: Array2::zeros((0, forecast_steps)),
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub windows: usize,
    pub epoch_losses: Vec<f64>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied()
    }
}

/// Next-minute EUR/USD forecaster.
///
/// Owns the windowing transform, the min-max scaler and the sequence model.
/// Scaler and model are always fit together by [`train`](Self::train) and
/// saved/loaded together as one artifact pair.
#[derive(Debug, Clone)]
pub struct ForexPredictor<M = LstmNetwork> {
    look_back: usize,
    forecast_steps: usize,
    scaler_fit: ScalerFit,
    scaler: MinMaxScaler,
    model: M,
    training: Option<TrainingMeta>,
}

impl ForexPredictor<LstmNetwork> {
    /// Fresh untrained predictor with the default network architecture
    pub fn new(look_back: usize, forecast_steps: usize) -> Result<Self, PredictorError> {
        Self::with_network(look_back, forecast_steps, NetworkConfig::default())
    }

    pub fn with_network(
        look_back: usize,
        forecast_steps: usize,
        network: NetworkConfig,
    ) -> Result<Self, PredictorError> {
        let model = LstmNetwork::new(network, look_back, forecast_steps)?;
        Self::with_model(look_back, forecast_steps, model)
    }
}

impl<M: SequenceModel> ForexPredictor<M> {
    pub fn with_model(
        look_back: usize,
        forecast_steps: usize,
        model: M,
    ) -> Result<Self, PredictorError> {
        if look_back == 0 || forecast_steps == 0 {
            return Err(PredictorError::invalid_config(format!(
                "look_back and forecast_steps must be positive, got {} and {}",
                look_back, forecast_steps
            )));
        }
        if model.window_len() != look_back || model.horizon() != forecast_steps {
            return Err(PredictorError::invalid_config(format!(
                "{} expects windows of {} -> {}, predictor uses {} -> {}",
                model.name(),
                model.window_len(),
                model.horizon(),
                look_back,
                forecast_steps
            )));
        }

        Ok(Self {
            look_back,
            forecast_steps,
            scaler_fit: ScalerFit::default(),
            scaler: MinMaxScaler::new(),
            model,
            training: None,
        })
    }

    pub fn with_scaler_fit(mut self, scaler_fit: ScalerFit) -> Self {
        self.scaler_fit = scaler_fit;
        self
    }

    pub fn look_back(&self) -> usize {
        self.look_back
    }

    pub fn forecast_steps(&self) -> usize {
        self.forecast_steps
    }

    pub fn scaler_fit(&self) -> ScalerFit {
        self.scaler_fit
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn training(&self) -> Option<&TrainingMeta> {
        self.training.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.training.is_some()
    }

    /// Fits the scaler and cuts `len - look_back - forecast_steps` windows.
    ///
    /// Too-short series yield no windows; the scaler is still refit.
    pub fn prepare_windows(&mut self, series: &[f64]) -> Windows {
        let fit_span = self
            .scaler_fit
            .fit_span(series.len(), self.look_back, self.forecast_steps);
        self.scaler.fit(&series[..fit_span]);

        let count = series
            .len()
            .saturating_sub(self.look_back + self.forecast_steps);
        if count == 0 || !self.scaler.is_fitted() {
            return Windows::empty(self.look_back, self.forecast_steps);
        }

        let scaled: Vec<f64> = series
            .iter()
            .map(|&v| self.scaler.transform(v).unwrap_or(0.0))
            .collect();

        let inputs = Array2::from_shape_fn((count, self.look_back), |(i, j)| scaled[i + j]);
        let targets = Array2::from_shape_fn((count, self.forecast_steps), |(i, j)| {
            scaled[i + self.look_back + j]
        });

        Windows { inputs, targets }
    }

    /// Fully refits scaler and model on `series`. Prior learned state is discarded.
    pub fn train(
        &mut self,
        series: &[f64],
        epochs: usize,
        batch_size: usize,
    ) -> Result<TrainingReport, PredictorError> {
        if epochs == 0 || batch_size == 0 {
            return Err(PredictorError::invalid_config(format!(
                "epochs and batch_size must be positive, got {} and {}",
                epochs, batch_size
            )));
        }

        self.training = None;
        let windows = self.prepare_windows(series);
        if windows.is_empty() {
            return Err(PredictorError::InsufficientData {
                required: self.look_back + self.forecast_steps,
                provided: series.len(),
            });
        }

        info!(
            "Training {} on {} windows (look_back={}, epochs={}, batch_size={}, scaler_fit={})",
            self.model.name(),
            windows.len(),
            self.look_back,
            epochs,
            batch_size,
            self.scaler_fit
        );

        self.model.reset();
        let epoch_losses = self
            .model
            .fit(&windows.inputs, &windows.targets, epochs, batch_size)?;

        let report = TrainingReport {
            windows: windows.len(),
            epoch_losses,
        };
        self.training = Some(TrainingMeta {
            trained_rows: series.len(),
            epochs,
            final_loss: report.final_loss(),
            trained_at: Utc::now(),
        });

        Ok(report)
    }

    /// Forecasts the `forecast_steps` values following the last `look_back`
    /// points, in price units. The scaler is not refit.
    pub fn predict_next(&self, last_n_points: &[f64]) -> Result<Vec<f64>, PredictorError> {
        if !self.is_trained() {
            return Err(PredictorError::NotTrained);
        }
        if last_n_points.len() < self.look_back {
            return Err(PredictorError::NotEnoughData {
                required: self.look_back,
                provided: last_n_points.len(),
            });
        }

        let recent = &last_n_points[last_n_points.len() - self.look_back..];
        let window = Array1::from_vec(self.scaler.transform_all(recent)?);
        let scaled = self.model.predict(window.view())?;

        scaled
            .iter()
            .map(|&v| self.scaler.inverse_transform(v))
            .collect()
    }
}

impl<M> ForexPredictor<M>
where
    M: SequenceModel + Serialize + DeserializeOwned,
{
    /// Writes the configuration artifact at `path` and the model artifact next to it.
    ///
    /// The model file is named after the training run, so the configuration
    /// artifact is the only file ever replaced in place.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PredictorError> {
        let path = path.as_ref();
        let training = self.training.clone().ok_or(PredictorError::NotTrained)?;
        let model_path = model_store::model_path_for(path, &training.run_stamp());

        let manifest = PredictorManifest {
            look_back: self.look_back,
            forecast_steps: self.forecast_steps,
            scaler_fit: self.scaler_fit,
            scaler: self.scaler.clone(),
            model_path: model_store::relative_model_path(&model_path),
            model_name: self.model.name().to_string(),
            training,
        };

        model_store::write_artifacts(path, &model_path, &manifest, &self.model)?;
        info!("Predictor saved to {:?} (model {:?})", path, model_path);
        Ok(())
    }

    /// Restores a predictor saved by [`save`](Self::save). Both artifacts must
    /// be present and consistent; anything else is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PredictorError> {
        let path = path.as_ref();
        let manifest = model_store::read_manifest(path)?;
        let model_path = model_store::resolve_model_path(path, &manifest.model_path);
        let model: M = model_store::read_model(&model_path)?;
        model
            .validate()
            .map_err(|e| PredictorError::persistence(&model_path, e))?;

        if !manifest.scaler.is_fitted() {
            return Err(PredictorError::persistence(path, "scaler is not fitted"));
        }

        let mut predictor = Self::with_model(manifest.look_back, manifest.forecast_steps, model)
            .map_err(|e| PredictorError::persistence(&model_path, e))?;
        predictor.scaler_fit = manifest.scaler_fit;
        predictor.scaler = manifest.scaler;
        predictor.training = Some(manifest.training);

        info!(
            "Predictor loaded from {:?} (look_back={}, forecast_steps={})",
            path, predictor.look_back, predictor.forecast_steps
        );
        Ok(predictor)
    }
}
