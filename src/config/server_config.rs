//! HTTP server configuration parsing from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;

/// HTTP server environment configuration
#[derive(Debug, Clone)]
pub struct ServerEnvConfig {
    pub bind_address: String,
    pub port: u16,
    pub cors_enabled: bool,
}

impl Default for ServerEnvConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
            cors_enabled: true,
        }
    }
}

impl ServerEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            bind_address: lookup("SERVER_BIND_ADDRESS")
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("SERVER_PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse::<u16>()
                .context("Failed to parse SERVER_PORT")?,
            cors_enabled: lookup("CORS_ENABLED")
                .unwrap_or_else(|| "true".to_string())
                .parse::<bool>()
                .context("Failed to parse CORS_ENABLED")?,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse::<SocketAddr>()
            .with_context(|| {
                format!(
                    "Invalid server address {}:{}",
                    self.bind_address, self.port
                )
            })
    }
}
