use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which part of a training series the min-max scaler is fit on.
///
/// `FullSeries` fits on every point, including values that only ever appear
/// as prediction targets. `InputsOnly` restricts the fit to the span covered
/// by input windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerFit {
    #[default]
    FullSeries,
    InputsOnly,
}

impl ScalerFit {
    /// Number of leading points of a series of length `len` the scaler sees.
    pub fn fit_span(self, len: usize, look_back: usize, forecast_steps: usize) -> usize {
        match self {
            ScalerFit::FullSeries => len,
            ScalerFit::InputsOnly => {
                let windows = len.saturating_sub(look_back + forecast_steps);
                if windows == 0 {
                    len
                } else {
                    windows - 1 + look_back
                }
            }
        }
    }
}

impl FromStr for ScalerFit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" | "full_series" => Ok(ScalerFit::FullSeries),
            "inputs" | "inputs_only" => Ok(ScalerFit::InputsOnly),
            _ => anyhow::bail!("Invalid SCALER_FIT: {}. Must be 'full' or 'inputs'", s),
        }
    }
}

impl fmt::Display for ScalerFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalerFit::FullSeries => write!(f, "full"),
            ScalerFit::InputsOnly => write!(f, "inputs"),
        }
    }
}
