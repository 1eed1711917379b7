use crate::domain::errors::PredictorError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct FittedRange {
    data_min: f64,
    data_max: f64,
}

/// Min-max transform onto the (0, 1) feature range.
///
/// A degenerate fit (every observed value equal) maps everything to 0.0 and
/// inverts everything back to the single observed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    range: Option<FittedRange>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit to the observed min/max. Non-finite values are ignored; an input
    /// with no finite values leaves the scaler unfitted.
    pub fn fit(&mut self, values: &[f64]) {
        let (data_min, data_max) = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        self.range = if data_min <= data_max {
            Some(FittedRange { data_min, data_max })
        } else {
            None
        };
    }

    pub fn is_fitted(&self) -> bool {
        self.range.is_some()
    }

    pub fn data_min(&self) -> Option<f64> {
        self.range.map(|r| r.data_min)
    }

    pub fn data_max(&self) -> Option<f64> {
        self.range.map(|r| r.data_max)
    }

    pub fn transform(&self, value: f64) -> Result<f64, PredictorError> {
        let range = self.range.ok_or(PredictorError::NotTrained)?;
        let span = range.data_max - range.data_min;
        if span == 0.0 {
            return Ok(0.0);
        }
        Ok((value - range.data_min) / span)
    }

    pub fn inverse_transform(&self, scaled: f64) -> Result<f64, PredictorError> {
        let range = self.range.ok_or(PredictorError::NotTrained)?;
        let span = range.data_max - range.data_min;
        if span == 0.0 {
            return Ok(range.data_min);
        }
        Ok(scaled * span + range.data_min)
    }

    pub fn transform_all(&self, values: &[f64]) -> Result<Vec<f64>, PredictorError> {
        values.iter().map(|&v| self.transform(v)).collect()
    }
}
