// Scaler fitting policy
pub mod scaler_fit;

// Min-max value transform
pub mod scaler;

// Training provenance
pub mod training;

pub use scaler::MinMaxScaler;
pub use scaler_fit::ScalerFit;
pub use training::TrainingMeta;
