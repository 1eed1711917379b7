//! Configuration module.
//!
//! Configuration is loaded from environment variables (optionally seeded from
//! a `.env` file by the binaries), organized by concern: HTTP server and model.

mod model_config;
mod server_config;

pub use model_config::ModelEnvConfig;
pub use server_config::ServerEnvConfig;

use anyhow::{Context, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerEnvConfig,
    pub model: ModelEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let server = ServerEnvConfig::from_env().context("Failed to load server config")?;
        let model = ModelEnvConfig::from_env().context("Failed to load model config")?;
        Ok(Self { server, model })
    }
}
