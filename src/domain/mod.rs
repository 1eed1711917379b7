// Price series domain
pub mod market;

// Forecasting model domain
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
