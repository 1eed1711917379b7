use crate::domain::errors::PredictorError;
use ndarray::{Array1, Array2, ArrayView1};

/// Interface for supervised sequence models.
///
/// Inputs are scaled windows of `window_len()` values; outputs are the next
/// `horizon()` scaled values.
pub trait SequenceModel: Send + Sync {
    /// Length of the input window the model was built for
    fn window_len(&self) -> usize;

    /// Number of values produced per window
    fn horizon(&self) -> usize;

    /// Discard learned parameters and start from a fresh initialisation
    fn reset(&mut self);

    /// Fit on `inputs` [samples, window_len] against `targets` [samples, horizon].
    ///
    /// Returns the mean training loss of every epoch.
    fn fit(
        &mut self,
        inputs: &Array2<f64>,
        targets: &Array2<f64>,
        epochs: usize,
        batch_size: usize,
    ) -> Result<Vec<f64>, PredictorError>;

    /// Internal consistency check, run after deserialisation
    fn validate(&self) -> Result<(), PredictorError> {
        Ok(())
    }

    /// Forecast from a single window
    fn predict(&self, window: ArrayView1<'_, f64>) -> Result<Array1<f64>, PredictorError>;

    /// Get model name/type
    fn name(&self) -> &str;
}
