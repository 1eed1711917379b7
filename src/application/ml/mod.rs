pub mod forex_predictor;
pub mod lstm;
pub mod network_config;

pub use forex_predictor::{ForexPredictor, TrainingReport, Windows};
pub use lstm::LstmNetwork;
pub use network_config::NetworkConfig;
