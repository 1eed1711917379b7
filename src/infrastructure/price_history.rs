use crate::domain::market::PricePoint;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PriceDataError {
    #[error("Failed to open price history {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed price history {path:?} at row {row}: {source}")]
    Malformed {
        path: PathBuf,
        row: usize,
        #[source]
        source: csv::Error,
    },
}

/// Reads a `time,eur_usd` table (extra columns are ignored) in file order.
pub fn read_price_history(path: impl AsRef<Path>) -> Result<Vec<PricePoint>, PriceDataError> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| PriceDataError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let mut points = Vec::new();
    for (idx, record) in reader.deserialize::<PricePoint>().enumerate() {
        let point = record.map_err(|source| PriceDataError::Malformed {
            path: path.to_path_buf(),
            row: idx + 1,
            source,
        })?;
        points.push(point);
    }

    debug!("Read {} price points from {:?}", points.len(), path);
    Ok(points)
}
