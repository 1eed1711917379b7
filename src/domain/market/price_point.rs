use serde::{Deserialize, Serialize};

/// One minute of EUR/USD history.
///
/// `time` is kept verbatim from the source table; rows are assumed to be in
/// chronological order, one minute apart, but neither is validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: String,
    pub eur_usd: f64,
}

impl PricePoint {
    pub fn new(time: impl Into<String>, eur_usd: f64) -> Self {
        Self {
            time: time.into(),
            eur_usd,
        }
    }
}

/// Extracts the price column in insertion order.
pub fn closing_prices(points: &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.eur_usd).collect()
}
